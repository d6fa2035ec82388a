//! Benchmark harness for dense square matrix multiplication.
//!
//! The crate measures how loop interchange, cache blocking, thread-parallel
//! tile scheduling and explicit SIMD reduction affect floating-point
//! throughput, and correlates wall-clock time with hardware performance
//! counters multiplexed across counter groups.
//!
//! The pieces fit together as follows: [`matrix::MatrixStore`] owns the three
//! operand/result matrices of a run, [`mult`] holds the interchangeable
//! multiplication strategies, [`harness::CounterHarness`] drives one multiply
//! per counter group and aggregates a [`metrics::RunMetrics`], and
//! [`validate`] checks the result against structural invariants or a
//! reference file.

pub mod config;
pub mod counters;
pub mod csv;
pub mod error;
pub mod harness;
pub mod matrix;
pub mod metrics;
pub mod mult;
pub mod simd;
pub mod validate;

pub use crate::error::{Error, Result};

/// Absolute tolerance below which two result cells compare equal.
pub const FAILURE_THRESHOLD: f64 = 0.001;

/// Scratch buffer size used to evict every cache level between counter
/// groups. Sized above the largest L3 on the machines this tool targets.
pub const CACHE_SCRUB_BYTES: usize = 32 * 1024 * 1024;
