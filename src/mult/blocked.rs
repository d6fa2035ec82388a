//! Cache-blocked multiplication.
//!
//! Partitions the i/j/k iteration cube into tiles of side `block_size` and,
//! within each tile, unrolls the contraction-dimension reduction in groups
//! of 8 to amortize loop overhead. Requires `N % block_size == 0`, checked
//! by the dispatcher before this function runs. Flops are not counted.

use crate::matrix::Matrix;

/// Dot-multiplies two square matrices tile by tile.
///
/// The result matrix must be zeroed by the caller.
pub fn multiply_blocked(block_size: usize, a: &Matrix, b: &Matrix, c: &mut Matrix) {
    let n = a.n();
    let a = a.as_slice();
    let b = b.as_slice();
    let c = c.as_mut_slice();

    for ii in (0..n).step_by(block_size) {
        for jj in (0..n).step_by(block_size) {
            for kk in (0..n).step_by(block_size) {
                for i in ii..ii + block_size {
                    for j in jj..jj + block_size {
                        let mut acc = c[i * n + j];
                        let mut k = kk;
                        while k + 8 <= kk + block_size {
                            acc += a[i * n + k] * b[k * n + j]
                                + a[i * n + k + 1] * b[(k + 1) * n + j]
                                + a[i * n + k + 2] * b[(k + 2) * n + j]
                                + a[i * n + k + 3] * b[(k + 3) * n + j]
                                + a[i * n + k + 4] * b[(k + 4) * n + j]
                                + a[i * n + k + 5] * b[(k + 5) * n + j]
                                + a[i * n + k + 6] * b[(k + 6) * n + j]
                                + a[i * n + k + 7] * b[(k + 7) * n + j];
                            k += 8;
                        }
                        // tiles narrower than the unroll width finish here
                        while k < kk + block_size {
                            acc += a[i * n + k] * b[k * n + j];
                            k += 1;
                        }
                        c[i * n + j] = acc;
                    }
                }
            }
        }
    }
}
