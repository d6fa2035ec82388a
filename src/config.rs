//! Run configuration and the command-line surface.
//!
//! One [`RunConfig`] value is built per process run and passed explicitly to
//! every component that needs it; there is no process-global configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::{config_error, io_error, Result};

/// Nesting order of the three index loops in the naive strategy.
///
/// A pure tuning parameter with no effect on the mathematical result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopOrder {
    #[default]
    Ijk,
    Ikj,
    Jki,
}

impl LoopOrder {
    pub fn name(&self) -> &'static str {
        match self {
            LoopOrder::Ijk => "ijk",
            LoopOrder::Ikj => "ikj",
            LoopOrder::Jki => "jki",
        }
    }
}

/// The multiplication strategy family.
///
/// All variants coexist and are selected explicitly at run time; they must be
/// numerically equivalent within the validation tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Strategy {
    /// Three nested loops in the configured order; the correctness reference
    /// and the only strategy with an exact flop count.
    #[default]
    Naive,
    /// Cache-blocked tiles with an unrolled inner reduction.
    Blocked,
    /// The blocked tile grid scheduled across a worker pool.
    Parallel,
    /// Blocked tiles with a 4-lane f64 vector inner reduction.
    Simd,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Naive => "naive",
            Strategy::Blocked => "blocked",
            Strategy::Parallel => "parallel",
            Strategy::Simd => "simd",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which hardware-counter backend to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum BackendChoice {
    /// Platform backend where available, the fake backend elsewhere.
    #[default]
    Auto,
    /// Linux perf_event backend; fails on other platforms.
    Perf,
    /// Fake backend: resolves every event, measures zeros.
    Null,
}

impl std::fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BackendChoice::Auto => "auto",
            BackendChoice::Perf => "perf",
            BackendChoice::Null => "null",
        })
    }
}

/// Configuration for one benchmark run.
#[derive(Parser, Debug, Clone)]
#[command(name = "matmark", version)]
#[command(about = "Benchmark dense square matrix multiplication strategies \
against hardware performance counters")]
pub struct RunConfig {
    /// Matrix dimension N for the N×N operands
    #[arg(short = 's', long = "size", value_name = "N", default_value_t = 1024)]
    pub size: usize,

    /// Multiplication strategy to measure
    #[arg(long, value_enum, default_value_t = Strategy::Naive)]
    pub strategy: Strategy,

    /// Use i-j-k loop nesting in the naive strategy (default)
    #[arg(long, group = "order")]
    pub ijk: bool,

    /// Use i-k-j loop nesting in the naive strategy
    #[arg(long, group = "order")]
    pub ikj: bool,

    /// Use j-k-i loop nesting in the naive strategy
    #[arg(long, group = "order")]
    pub jki: bool,

    /// Tile side for the blocked/parallel/simd strategies; must divide N
    #[arg(short = 'b', long = "block-size", value_name = "SIZE", default_value_t = 0)]
    pub block_size: usize,

    /// Read matrix A from a CSV file instead of generating random data
    #[arg(short = 'f', long = "input", value_name = "FILE.CSV")]
    pub in_file: Option<PathBuf>,

    /// Write the result matrix to a CSV file
    #[arg(short = 'o', long = "output", value_name = "FILE.CSV")]
    pub out_file: Option<PathBuf>,

    /// Compare the result against this reference CSV file
    #[arg(short = 't', long = "test", value_name = "FILE.CSV")]
    pub test_file: Option<PathBuf>,

    /// Append run metrics to this CSV file (created with headers if absent)
    #[arg(short = 'm', long = "metrics", value_name = "FILE.CSV")]
    pub metrics_file: Option<PathBuf>,

    /// Label for the metrics row
    #[arg(short = 'l', long, value_name = "LABEL", default_value = "no-label")]
    pub label: String,

    /// Use an identity matrix for operand B instead of an all-ones matrix
    #[arg(long)]
    pub identity: bool,

    /// Counter request: groups separated by '!', event names by ':';
    /// "default" selects the built-in cache-miss preset
    #[arg(short = 'p', long = "counters", value_name = "SPEC")]
    pub counters: Option<String>,

    /// Skip failing counter events instead of aborting the run
    #[arg(long = "counter-ignore")]
    pub counter_ignore: bool,

    /// Hardware-counter backend selection
    #[arg(long = "counter-backend", value_enum, default_value_t = BackendChoice::Auto)]
    pub counter_backend: BackendChoice,

    /// Report throughput in GFLOP/s instead of FLOP/s
    #[arg(long)]
    pub giga: bool,

    /// Validate that all columns of the result are equal
    #[arg(long = "test-equal-cols")]
    pub test_equal_cols: bool,

    /// Also multiply with the ones matrix on the left and validate that all
    /// rows of that result are equal
    #[arg(long = "test-equal-rows")]
    pub test_equal_rows: bool,

    /// Fewer output messages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// No output messages, only the metrics result
    #[arg(long)]
    pub silent: bool,

    /// Lots of output messages, including matrix dumps for small N
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Debug messages (includes verbose)
    #[arg(short = 'd', long)]
    pub debug: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            size: 1024,
            strategy: Strategy::Naive,
            ijk: false,
            ikj: false,
            jki: false,
            block_size: 0,
            in_file: None,
            out_file: None,
            test_file: None,
            metrics_file: None,
            label: "no-label".to_string(),
            identity: false,
            counters: None,
            counter_ignore: false,
            counter_backend: BackendChoice::Auto,
            giga: false,
            test_equal_cols: false,
            test_equal_rows: false,
            quiet: false,
            silent: false,
            verbose: false,
            debug: false,
        }
    }
}

impl RunConfig {
    /// The loop order selected by the `--ijk`/`--ikj`/`--jki` flags.
    pub fn loop_order(&self) -> LoopOrder {
        if self.ikj {
            LoopOrder::Ikj
        } else if self.jki {
            LoopOrder::Jki
        } else {
            LoopOrder::Ijk
        }
    }

    /// Folds the verbosity flags into each other: silent implies quiet,
    /// debug implies verbose and clears any accidental silent/quiet.
    pub fn normalize(&mut self) {
        if self.silent {
            self.quiet = true;
        }
        if self.debug {
            self.verbose = true;
            self.silent = false;
            self.quiet = false;
        }
    }

    /// Maps the verbosity flags to a log level filter.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.silent {
            log::LevelFilter::Off
        } else if self.debug {
            log::LevelFilter::Trace
        } else if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }

    /// Validates the parts of the configuration that must hold before any
    /// allocation or measurement work starts.
    pub fn validate(&self) -> Result<()> {
        if self.size < 2 {
            return Err(config_error(format!(
                "matrix size must be at least 2 (got {})",
                self.size
            )));
        }
        for (opt, path) in [("-f", &self.in_file), ("-t", &self.test_file)] {
            if let Some(path) = path {
                if !path.exists() {
                    return Err(io_error(
                        path.display().to_string(),
                        format!("the option '{}' expects the name of an existing file", opt),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_order_flags() {
        let mut config = RunConfig::default();
        assert_eq!(config.loop_order(), LoopOrder::Ijk);
        config.ikj = true;
        assert_eq!(config.loop_order(), LoopOrder::Ikj);
        config.ikj = false;
        config.jki = true;
        assert_eq!(config.loop_order(), LoopOrder::Jki);
    }

    #[test]
    fn test_normalize_silent_implies_quiet() {
        let mut config = RunConfig {
            silent: true,
            ..RunConfig::default()
        };
        config.normalize();
        assert!(config.quiet);
    }

    #[test]
    fn test_normalize_debug_overrides_silent() {
        let mut config = RunConfig {
            debug: true,
            silent: true,
            quiet: true,
            ..RunConfig::default()
        };
        config.normalize();
        assert!(config.verbose);
        assert!(!config.silent);
        assert!(!config.quiet);
    }

    #[test]
    fn test_validate_rejects_tiny_size() {
        let config = RunConfig {
            size: 1,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        let config = RunConfig {
            in_file: Some(PathBuf::from("/nonexistent/matrix.csv")),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        RunConfig::command().debug_assert();
    }
}
