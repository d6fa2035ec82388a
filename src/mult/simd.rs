//! SIMD-blocked multiplication.
//!
//! Identical tiling to the cache-blocked strategy, but the innermost
//! reduction runs on 4-lane f64 vectors: a lane-wise multiply followed by a
//! horizontal lane-reduction into the scalar accumulator. B is transposed
//! once into an aligned scratch buffer so both operands stream
//! contiguously along the contraction dimension.
//!
//! AVX2 is detected at run time; targets without it take an identically
//! tiled scalar path, so the strategy is selectable everywhere.

use crate::matrix::{alloc_zeroed_f64_vec, Matrix};
use crate::simd::VEC_ALIGNMENT;

#[cfg(target_arch = "x86_64")]
use crate::simd::{avx2::f64x4::F64x4, LANE_COUNT};

/// Dot-multiplies two square matrices tile by tile with a vectorized inner
/// reduction.
///
/// The result matrix must be zeroed by the caller. Operand buffers are
/// vector-width aligned by construction ([`Matrix`] allocation).
pub fn multiply_simd(block_size: usize, a: &Matrix, b: &Matrix, c: &mut Matrix) {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 support was just verified.
            unsafe { multiply_simd_avx2(block_size, a, b, c) };
            return;
        }
    }
    multiply_simd_scalar(block_size, a, b, c);
}

/// Transposes `b` into a fresh vector-width-aligned buffer.
fn transpose_aligned(b: &Matrix) -> Vec<f64> {
    let n = b.n();
    let mut bt = alloc_zeroed_f64_vec(n * n, VEC_ALIGNMENT);
    let b = b.as_slice();
    for k in 0..n {
        for j in 0..n {
            bt[j * n + k] = b[k * n + j];
        }
    }
    bt
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn multiply_simd_avx2(block_size: usize, a: &Matrix, b: &Matrix, c: &mut Matrix) {
    let n = a.n();
    let bt = transpose_aligned(b);
    let a = a.as_slice();
    let c = c.as_mut_slice();

    for ii in (0..n).step_by(block_size) {
        for jj in (0..n).step_by(block_size) {
            for kk in (0..n).step_by(block_size) {
                for i in ii..ii + block_size {
                    let a_row = &a[i * n..(i + 1) * n];
                    for j in jj..jj + block_size {
                        let bt_row = &bt[j * n..(j + 1) * n];
                        let mut acc = c[i * n + j];
                        let mut k = kk;
                        while k + LANE_COUNT <= kk + block_size {
                            let av = F64x4::load(a_row.as_ptr().add(k));
                            let bv = F64x4::load(bt_row.as_ptr().add(k));
                            acc += av.mul(bv).horizontal_sum();
                            k += LANE_COUNT;
                        }
                        // tiles narrower than the vector width finish here
                        while k < kk + block_size {
                            acc += a_row[k] * bt_row[k];
                            k += 1;
                        }
                        c[i * n + j] = acc;
                    }
                }
            }
        }
    }
}

/// Identically tiled scalar path for targets without AVX2.
fn multiply_simd_scalar(block_size: usize, a: &Matrix, b: &Matrix, c: &mut Matrix) {
    let n = a.n();
    let bt = transpose_aligned(b);
    let a = a.as_slice();
    let c = c.as_mut_slice();

    for ii in (0..n).step_by(block_size) {
        for jj in (0..n).step_by(block_size) {
            for kk in (0..n).step_by(block_size) {
                for i in ii..ii + block_size {
                    let a_row = &a[i * n..(i + 1) * n];
                    for j in jj..jj + block_size {
                        let bt_row = &bt[j * n..(j + 1) * n];
                        let mut acc = c[i * n + j];
                        for k in kk..kk + block_size {
                            acc += a_row[k] * bt_row[k];
                        }
                        c[i * n + j] = acc;
                    }
                }
            }
        }
    }
}
