//! Thread-parallel blocked multiplication.
//!
//! The blocked tile grid becomes a set of tasks scheduled on rayon's
//! work-stealing pool. Each task owns one row band of C exclusively (its
//! inout tile range) and reads the matching row band of A plus all of B,
//! which stay immutable for the whole run. Contraction-dimension tiles that
//! accumulate into the same band run serially inside that band's task, so
//! no two concurrently scheduled tasks ever write the same memory and no
//! locks are needed — correctness rests on the disjoint `par_chunks_mut`
//! partition alone.

use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

use crate::matrix::Matrix;

/// Dot-multiplies two square matrices, one output band per worker task.
///
/// The result matrix must be zeroed by the caller.
pub fn multiply_parallel(block_size: usize, a: &Matrix, b: &Matrix, c: &mut Matrix) {
    let n = a.n();
    let a = a.as_slice();
    let b = b.as_slice();

    c.as_mut_slice()
        .par_chunks_mut(block_size * n)
        .enumerate()
        .for_each(|(band_index, c_band)| {
            let i0 = band_index * block_size;
            let band_rows = c_band.len() / n;

            for jj in (0..n).step_by(block_size) {
                for kk in (0..n).step_by(block_size) {
                    for bi in 0..band_rows {
                        let i = i0 + bi;
                        for j in jj..jj + block_size {
                            let mut acc = c_band[bi * n + j];
                            for k in kk..kk + block_size {
                                acc += a[i * n + k] * b[k * n + j];
                            }
                            c_band[bi * n + j] = acc;
                        }
                    }
                }
            }
        });
}
