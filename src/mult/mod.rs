//! The multiplication strategy family.
//!
//! Four interchangeable strategies compute C = A · B and must agree within
//! the validation tolerance: the naive ordered loops (the correctness
//! reference and the only exact flop counter), the cache-blocked variant,
//! the thread-parallel blocked variant and the SIMD-blocked variant. All
//! variants coexist and are selected explicitly; none is picked by
//! conditional compilation.

pub mod blocked;
pub mod naive;
pub mod parallel;
pub mod simd;

use crate::config::{LoopOrder, Strategy};
use crate::error::{config_error, Result};
use crate::matrix::Matrix;
use crate::metrics::FlopCount;

/// Computes C = A · B with the selected strategy.
///
/// Precondition: `c` has been zeroed by the caller; every strategy
/// accumulates into it. Block-size violations are configuration errors
/// reported before any multiplication work begins.
pub fn multiply(
    strategy: Strategy,
    order: LoopOrder,
    block_size: usize,
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
) -> Result<FlopCount> {
    let n = a.n();
    if b.n() != n || c.n() != n {
        return Err(config_error(format!(
            "operand shapes differ: A is {n}x{n}, B is {bn}x{bn}, C is {cn}x{cn}",
            bn = b.n(),
            cn = c.n()
        )));
    }

    if strategy != Strategy::Naive {
        if block_size < 1 {
            return Err(config_error(format!(
                "block-size (-b) must be specified to use the {} strategy",
                strategy.name()
            )));
        }
        if n % block_size != 0 {
            return Err(config_error(format!(
                "matrix size ({n}) must be a whole multiple of block-size (-b {block_size}) \
to use the {} strategy",
                strategy.name()
            )));
        }
    }

    match strategy {
        Strategy::Naive => Ok(FlopCount::Counted(naive::multiply_naive(order, a, b, c))),
        Strategy::Blocked => {
            blocked::multiply_blocked(block_size, a, b, c);
            Ok(FlopCount::NotMeasured)
        }
        Strategy::Parallel => {
            parallel::multiply_parallel(block_size, a, b, c);
            Ok(FlopCount::NotMeasured)
        }
        Strategy::Simd => {
            simd::multiply_simd(block_size, a, b, c);
            Ok(FlopCount::NotMeasured)
        }
    }
}
