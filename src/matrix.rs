//! Dense square matrix storage for one benchmark run.
//!
//! Matrices are row-major `f64` buffers allocated on a 32-byte boundary so
//! the vectorized multiplication strategy can use aligned loads. Alignment is
//! a property of allocation, not of any multiply call: every `Matrix` is
//! created through [`alloc_zeroed_f64_vec`] and stays aligned for its whole
//! lifetime.

use std::alloc::{alloc_zeroed, handle_alloc_error, Layout};
use std::fmt::Write as _;

use rand::Rng;

use crate::simd::VEC_ALIGNMENT;

/// Allocates a `Vec<f64>` with the specified alignment, all elements zero.
///
/// # Panics
///
/// Panics if the layout is invalid (alignment not a power of two, or the
/// total byte size overflows). Allocation failure triggers the global
/// allocation error handler.
#[inline(always)]
pub fn alloc_zeroed_f64_vec(len: usize, align: usize) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }

    let size_bytes = match len.checked_mul(std::mem::size_of::<f64>()) {
        Some(s) => s,
        None => panic!("Total size calculation overflowed for Vec<f64> of len {len}"),
    };

    let layout = match Layout::from_size_align(size_bytes, align) {
        Ok(l) => l,
        Err(_) => panic!("Failed to create Layout with size {size_bytes} and alignment {align}"),
    };

    let ptr = unsafe { alloc_zeroed(layout) as *mut f64 };

    if ptr.is_null() {
        handle_alloc_error(layout);
    }

    // SAFETY:
    // 1. `ptr` is non-null (checked above).
    // 2. `ptr` was allocated for `layout` with the global allocator.
    // 3. Length and capacity both equal `len`, so the Vec never reallocates
    //    until grown, and `f64` is valid for the all-zero bit pattern.
    unsafe { Vec::from_raw_parts(ptr, len, len) }
}

/// A dense, row-major N×N matrix of double-precision values.
///
/// The backing buffer is exclusively owned and mutated in place by the fill
/// operations and by the multiplication strategies. A matrix used as the
/// accumulator target of a multiplication must be zeroed by the caller first.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    n: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates an N×N matrix with every cell set to zero.
    pub fn zeroed(n: usize) -> Self {
        Matrix {
            n,
            data: alloc_zeroed_f64_vec(n * n, VEC_ALIGNMENT),
        }
    }

    /// The dimension N of this N×N matrix.
    #[inline(always)]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Cell at row `i`, column `j`.
    #[inline(always)]
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.n + j] = value;
    }

    /// Row `i` as a contiguous slice.
    #[inline(always)]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Fills every cell with the provided value.
    pub fn fill_constant(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Resets the matrix to all zeros, required before it is used as a
    /// multiplication accumulator target.
    pub fn zero(&mut self) {
        self.fill_constant(0.0);
    }

    /// Fills the matrix as an identity matrix such that A · I = A.
    pub fn fill_identity(&mut self) {
        for i in 0..self.n {
            for j in 0..self.n {
                let value = if i == j { 1.0 } else { 0.0 };
                self.set(i, j, value);
            }
        }
    }

    /// Fills every cell with a random value in `[0, 1)`.
    pub fn fill_random(&mut self) {
        let mut rng = rand::rng();
        for cell in self.data.iter_mut() {
            *cell = rng.random::<f64>();
        }
    }

    /// Renders the matrix for trace output, with aligned 3-decimal cells.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        for i in 0..self.n {
            for j in 0..self.n {
                let _ = write!(out, "{:.3}  ", self.at(i, j));
            }
            out.push('\n');
        }
        out
    }
}

/// The three matrices of one benchmark run: operand A, operand B and the
/// result C. Allocated once per process run and reused across every counter
/// group; only C is re-zeroed between groups.
#[derive(Debug)]
pub struct MatrixStore {
    pub a: Matrix,
    pub b: Matrix,
    pub c: Matrix,
}

impl MatrixStore {
    pub fn new(n: usize) -> Self {
        MatrixStore {
            a: Matrix::zeroed(n),
            b: Matrix::zeroed(n),
            c: Matrix::zeroed(n),
        }
    }

    /// Zeroes the result matrix before it is used as an accumulator target.
    pub fn zero_result(&mut self) {
        self.c.zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_allocation_is_aligned() {
        let m = Matrix::zeroed(64);
        assert_eq!(m.as_slice().len(), 64 * 64);
        assert_eq!(m.as_slice().as_ptr() as usize % VEC_ALIGNMENT, 0);
        assert!(m.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_fill_constant_and_zero() {
        let mut m = Matrix::zeroed(8);
        m.fill_constant(1.0);
        assert!(m.as_slice().iter().all(|&x| x == 1.0));
        m.zero();
        assert!(m.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_fill_identity() {
        let mut m = Matrix::zeroed(5);
        m.fill_identity();
        for i in 0..5 {
            for j in 0..5 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_eq!(m.at(i, j), expected, "identity cell ({}, {})", i, j);
            }
        }
    }

    #[test]
    fn test_fill_random_range() {
        let mut m = Matrix::zeroed(16);
        m.fill_random();
        assert!(m.as_slice().iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn test_row_slices() {
        let mut m = Matrix::zeroed(3);
        m.set(1, 0, 4.0);
        m.set(1, 2, 6.0);
        assert_eq!(m.row(1), &[4.0, 0.0, 6.0]);
    }
}
