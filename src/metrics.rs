//! The aggregate metrics record of one benchmark run, and its CSV and
//! terminal renderings.
//!
//! A [`RunMetrics`] is created once per run and progressively filled: the
//! flop count and elapsed time come from the first counter group only,
//! counter values accumulate group by group in the flat per-event slot
//! array, and the validation outcome lands after all groups complete.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use log::info;

use crate::config::{LoopOrder, RunConfig, Strategy};
use crate::counters::EventSlot;
use crate::error::{io_error, Result};

/// Floating-point operation count of one multiply call.
///
/// Only the naive strategy counts exactly; the optimized strategies
/// deliberately forgo counting so the timed region is not perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlopCount {
    /// Exact count from the reference strategy.
    Counted(u64),
    /// The strategy did not count; serialized as the sentinel `1`.
    NotMeasured,
}

impl FlopCount {
    /// The value written to the metrics CSV. The sentinel `1` for
    /// unmeasured runs is part of the file format.
    pub fn csv_value(&self) -> u64 {
        match self {
            FlopCount::Counted(flops) => *flops,
            FlopCount::NotMeasured => 1,
        }
    }
}

/// Derived operations-per-second figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throughput {
    /// Elapsed time was zero; serialized as `-1`.
    Infinite,
    /// The flop count was not measured, so no meaningful rate exists.
    NotMeasured,
    /// Operations per second (or billions thereof in giga mode).
    PerSecond(f64),
}

impl Throughput {
    fn csv_value(&self) -> String {
        match self {
            Throughput::Infinite => "-1".to_string(),
            Throughput::NotMeasured => format!("{:.6}", 0.0),
            Throughput::PerSecond(rate) => format!("{rate:.6}"),
        }
    }
}

/// Result of the validation step, recorded as data, never raised as an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestOutcome {
    #[default]
    Untested,
    Passed,
    Failed,
}

impl TestOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TestOutcome::Untested => "untested",
            TestOutcome::Passed => "passed",
            TestOutcome::Failed => "FAILED!",
        }
    }
}

/// How multiply work was scheduled across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingKind {
    Serial,
    WorkStealing,
}

impl SchedulingKind {
    fn as_int(&self) -> u32 {
        match self {
            SchedulingKind::Serial => 0,
            SchedulingKind::WorkStealing => 1,
        }
    }
}

/// Aggregate of one benchmark run.
#[derive(Debug, Clone)]
pub struct RunMetrics {
    pub label: String,
    pub size: usize,
    /// Wall-clock duration of the first counter group's multiply.
    pub elapsed_micros: u64,
    pub flops: FlopCount,
    pub throughput: Throughput,
    pub test_result: TestOutcome,
    pub loop_order: LoopOrder,
    pub block_size: usize,
    pub max_threads: usize,
    pub scheduling_kind: SchedulingKind,
    pub chunk_size: usize,
    pub giga: bool,
}

impl RunMetrics {
    pub fn new(config: &RunConfig) -> Self {
        let parallel = config.strategy == Strategy::Parallel;
        RunMetrics {
            label: config.label.clone(),
            size: config.size,
            elapsed_micros: 0,
            flops: FlopCount::Counted(0),
            throughput: Throughput::PerSecond(0.0),
            test_result: TestOutcome::Untested,
            loop_order: config.loop_order(),
            block_size: config.block_size,
            max_threads: if parallel {
                rayon::current_num_threads()
            } else {
                0
            },
            scheduling_kind: if parallel {
                SchedulingKind::WorkStealing
            } else {
                SchedulingKind::Serial
            },
            chunk_size: if parallel { config.block_size } else { 0 },
            giga: config.giga,
        }
    }

    /// Computes the properties derived from elapsed time and flop count.
    pub fn finalize(&mut self) {
        if self.elapsed_micros == 0 {
            self.throughput = Throughput::Infinite;
            return;
        }
        self.throughput = match self.flops {
            FlopCount::NotMeasured => Throughput::NotMeasured,
            FlopCount::Counted(flops) => {
                let rate = if self.giga {
                    flops as f64 / (1000.0 * self.elapsed_micros as f64)
                } else {
                    flops as f64 * 1_000_000.0 / self.elapsed_micros as f64
                };
                Throughput::PerSecond(rate)
            }
        };
    }

    pub fn total_seconds(&self) -> f64 {
        self.elapsed_micros as f64 / 1_000_000.0
    }
}

/// The metrics CSV header row. Written only when the file is created.
pub fn metrics_header(metrics: &RunMetrics, slots: &[EventSlot]) -> String {
    let rate_column = if metrics.giga {
        "gflops_per_second"
    } else {
        "flops_per_second"
    };
    let mut header = format!(
        "label,size,total_microseconds,flop_count,{rate_column},loop_order_name,\
block_size,max_threads,counter_scheduling_kind,counter_chunk_size,validation_result"
    );
    if slots.is_empty() {
        header.push_str(",no_counters");
    } else {
        for slot in slots {
            let _ = write!(header, ",{}", slot.display);
        }
    }
    header
}

/// One metrics CSV data row.
pub fn metrics_row(metrics: &RunMetrics, slots: &[EventSlot]) -> String {
    let mut row = format!(
        "{},{},{},{},{},{},{},{},{},{},{}",
        metrics.label,
        metrics.size,
        metrics.elapsed_micros,
        metrics.flops.csv_value(),
        metrics.throughput.csv_value(),
        metrics.loop_order.name(),
        metrics.block_size,
        metrics.max_threads,
        metrics.scheduling_kind.as_int(),
        metrics.chunk_size,
        metrics.test_result.label(),
    );
    if slots.is_empty() {
        row.push_str(",0");
    } else {
        for slot in slots {
            let _ = write!(row, ",{}", slot.value);
        }
    }
    row
}

/// Appends the metrics row to the metrics file, creating it with a header
/// row the first time.
pub fn write_metrics_file(path: &Path, metrics: &RunMetrics, slots: &[EventSlot]) -> Result<()> {
    let first_time = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            io_error(
                path.display().to_string(),
                format!("could not create or open the metrics file (does the dir exist?): {e}"),
            )
        })?;

    if first_time {
        info!("Creating metrics file and adding headers: {}", path.display());
        writeln!(file, "{}", metrics_header(metrics, slots))
            .map_err(|e| io_error(path.display().to_string(), format!("write failed: {e}")))?;
    }
    writeln!(file, "{}", metrics_row(metrics, slots))
        .map_err(|e| io_error(path.display().to_string(), format!("write failed: {e}")))
}

/// Prints the end-of-run report to stdout (suppressed by `--silent`).
pub fn print_report(metrics: &RunMetrics, slots: &[EventSlot]) {
    println!("{}", metrics_header(metrics, slots));
    println!("{}", metrics_row(metrics, slots));

    if !slots.is_empty() {
        println!();
        for slot in slots {
            match &slot.error {
                Some(error) => println!(
                    "counter [ {:>22} ] {:<40} = {} [WARN: SKIPPED! {}]",
                    slot.display, slot.description, slot.value, error
                ),
                None => println!(
                    "counter [ {:>22} ] {:<40} = {}",
                    slot.display, slot.description, slot.value
                ),
            }
        }
    }

    println!();
    println!(
        "Time to multiply : {} microseconds ({:.2} s)",
        metrics.elapsed_micros,
        metrics.total_seconds()
    );
    match metrics.flops {
        FlopCount::Counted(flops) => println!("FLOPs counted    : {flops}"),
        FlopCount::NotMeasured => println!("FLOPs counted    : not measured"),
    }
    let unit = if metrics.giga { "GFLOPs/second" } else { "FLOPs/second" };
    match metrics.throughput {
        Throughput::PerSecond(rate) => println!("{unit:<17}: {rate:.6}"),
        Throughput::Infinite => println!("{unit:<17}: infinite (zero elapsed time)"),
        Throughput::NotMeasured => println!("{unit:<17}: not meaningful (flops not measured)"),
    }
    println!();
    println!("(hide these messages with --silent)");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics() -> RunMetrics {
        let config = RunConfig {
            size: 4,
            ..RunConfig::default()
        };
        RunMetrics::new(&config)
    }

    #[test]
    fn test_finalize_counts_flops_per_second() {
        let mut metrics = sample_metrics();
        metrics.flops = FlopCount::Counted(2_000_000);
        metrics.elapsed_micros = 1_000_000;
        metrics.finalize();
        assert_eq!(metrics.throughput, Throughput::PerSecond(2_000_000.0));
    }

    #[test]
    fn test_finalize_giga_scaling() {
        let mut metrics = sample_metrics();
        metrics.giga = true;
        metrics.flops = FlopCount::Counted(4_000_000_000);
        metrics.elapsed_micros = 2_000_000;
        metrics.finalize();
        // 4e9 flops in 2 s = 2 GFLOP/s.
        assert_eq!(metrics.throughput, Throughput::PerSecond(2.0));
    }

    #[test]
    fn test_finalize_zero_elapsed_is_infinite() {
        let mut metrics = sample_metrics();
        metrics.flops = FlopCount::Counted(100);
        metrics.elapsed_micros = 0;
        metrics.finalize();
        assert_eq!(metrics.throughput, Throughput::Infinite);
    }

    #[test]
    fn test_finalize_unmeasured_flops() {
        let mut metrics = sample_metrics();
        metrics.flops = FlopCount::NotMeasured;
        metrics.elapsed_micros = 1234;
        metrics.finalize();
        assert_eq!(metrics.throughput, Throughput::NotMeasured);
        assert_eq!(metrics.flops.csv_value(), 1);
    }

    #[test]
    fn test_header_and_row_without_counters() {
        let mut metrics = sample_metrics();
        metrics.finalize();
        let header = metrics_header(&metrics, &[]);
        let row = metrics_row(&metrics, &[]);
        assert!(header.ends_with(",no_counters"));
        assert!(header.contains(",flops_per_second,"));
        assert!(row.starts_with("no-label,4,"));
        assert!(row.ends_with(",0"));
        assert_eq!(
            header.split(',').count(),
            row.split(',').count(),
            "header and row must have the same arity"
        );
    }

    #[test]
    fn test_header_with_counters_uses_display_names() {
        let metrics = sample_metrics();
        let mut slot = EventSlot::new("PAPI_L1_DCM");
        slot.display = "L1-dcache-load-misses".to_string();
        slot.value = 42;
        let header = metrics_header(&metrics, std::slice::from_ref(&slot));
        let row = metrics_row(&metrics, std::slice::from_ref(&slot));
        assert!(header.ends_with(",L1-dcache-load-misses"));
        assert!(row.ends_with(",42"));
    }

    #[test]
    fn test_giga_header_column() {
        let mut metrics = sample_metrics();
        metrics.giga = true;
        assert!(metrics_header(&metrics, &[]).contains(",gflops_per_second,"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(TestOutcome::Untested.label(), "untested");
        assert_eq!(TestOutcome::Passed.label(), "passed");
        assert_eq!(TestOutcome::Failed.label(), "FAILED!");
    }
}
