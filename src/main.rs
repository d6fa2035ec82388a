//! matmark binary: configure a run, drive the harness, report.

use std::process::ExitCode;

use clap::Parser;
use log::{debug, info, trace};

use matmark::config::{RunConfig, Strategy};
use matmark::counters::backend_for;
use matmark::csv;
use matmark::harness::CounterHarness;
use matmark::matrix::MatrixStore;
use matmark::metrics::{print_report, write_metrics_file};
use matmark::mult;
use matmark::validate;
use matmark::Result;

fn main() -> ExitCode {
    let mut config = RunConfig::parse();
    config.normalize();

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .format_timestamp(None)
        .format_target(false)
        .init();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ERROR: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RunConfig) -> Result<()> {
    config.validate()?;
    debug!("Config: {config:#?}");

    let n = config.size;
    debug!("Allocating 3 {n} x {n} double matrices for A, B and results");
    let mut store = MatrixStore::new(n);

    let a_desc;
    if let Some(path) = &config.in_file {
        info!("Reading matrix A from {}", path.display());
        a_desc = "from file";
        csv::read_matrix(path, &mut store.a)?;
        info!("Finished reading matrix A from {}", path.display());
    } else {
        info!("Generating random data for matrix A");
        a_desc = "random";
        store.a.fill_random();
    }

    let b_desc;
    if config.identity {
        info!("Using identity matrix for matrix B (so A . B = A . I = A)");
        b_desc = "identity";
        store.b.fill_identity();
    } else {
        info!("Using 1.0-filled matrix data for matrix B");
        b_desc = "all 1.0";
        store.b.fill_constant(1.0);
    }

    if config.strategy == Strategy::Parallel {
        info!(
            "Worker pool: {} threads on {} logical CPUs",
            rayon::current_num_threads(),
            num_cpus::get()
        );
    }

    let backend = backend_for(config.counter_backend)?;
    let mut harness = CounterHarness::new(config, backend);
    let (mut metrics, slots) = harness.run(&mut store)?;

    if n <= 16 {
        trace!("Matrix A ({a_desc}):\n{}", store.a.to_pretty_string());
        trace!("Matrix B ({b_desc}):\n{}", store.b.to_pretty_string());
        trace!("Result:\n{}", store.c.to_pretty_string());
    }

    if let Some(path) = &config.out_file {
        info!("Writing output to {}", path.display());
        csv::write_matrix(path, &store.c)?;
    }

    if let Some(path) = &config.test_file {
        info!("Comparing results against test file: {}", path.display());
        metrics.test_result = validate::compare_with_reference(path, &store.c)?;
    }

    if config.test_equal_cols {
        metrics.test_result = validate::equal_columns(&store.c);
    }

    if config.test_equal_rows {
        // Multiply again with the ones matrix on the left: C = B · A has
        // equal rows when B is all ones.
        store.zero_result();
        mult::multiply(
            config.strategy,
            config.loop_order(),
            config.block_size,
            &store.b,
            &store.a,
            &mut store.c,
        )?;
        metrics.test_result = validate::equal_rows(&store.c);
    }

    if let Some(path) = &config.metrics_file {
        info!("Reporting metrics to: {}", path.display());
        write_metrics_file(path, &metrics, &slots)?;
    }

    if !config.silent {
        print_report(&metrics, &slots);
    }

    info!("Matrix run completed");
    Ok(())
}
