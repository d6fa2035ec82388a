//! AVX2 4-lane f64 SIMD vector implementation.
//!
//! `F64x4` wraps Intel's AVX2 `__m256d` intrinsic to perform vectorized
//! operations on 4 double-precision floating-point values simultaneously.
//! The surface is deliberately small: the multiplication kernel only needs
//! loads, a lane-wise multiply and a horizontal lane-reduction to a scalar.
//!
//! # Architecture Requirements
//!
//! - **CPU Support**: Intel Haswell (2013+) or AMD Excavator (2015+)
//! - **Runtime Detection**: Callers must verify AVX2 with
//!   `is_x86_feature_detected!("avx2")` before executing these operations.

use std::arch::x86_64::*;

use crate::simd::{LANE_COUNT, VEC_ALIGNMENT};

/// AVX2 SIMD vector containing 4 packed f64 values.
#[derive(Copy, Clone, Debug)]
pub struct F64x4 {
    /// AVX2 256-bit vector register containing 4 packed f64 values.
    pub elements: __m256d,
}

impl F64x4 {
    /// Checks if a pointer is aligned for 256-bit vector loads.
    #[inline(always)]
    pub fn is_aligned(ptr: *const f64) -> bool {
        (ptr as usize) % VEC_ALIGNMENT == 0
    }

    /// Loads exactly 4 elements from memory, choosing between aligned and
    /// unaligned load based on the pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least [`LANE_COUNT`] valid f64 values, and the
    /// CPU must support AVX2.
    #[inline]
    #[target_feature(enable = "avx2")]
    pub unsafe fn load(ptr: *const f64) -> Self {
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        match Self::is_aligned(ptr) {
            true => Self::load_aligned(ptr),
            false => Self::load_unaligned(ptr),
        }
    }

    /// Loads 4 elements from 32-byte aligned memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be 32-byte aligned and point to at least 4 valid f64
    /// values, and the CPU must support AVX2.
    #[inline]
    #[target_feature(enable = "avx2")]
    pub unsafe fn load_aligned(ptr: *const f64) -> Self {
        Self {
            elements: _mm256_load_pd(ptr),
        }
    }

    /// Loads 4 elements from unaligned memory.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least 4 valid f64 values, and the CPU must
    /// support AVX2.
    #[inline]
    #[target_feature(enable = "avx2")]
    pub unsafe fn load_unaligned(ptr: *const f64) -> Self {
        Self {
            elements: _mm256_loadu_pd(ptr),
        }
    }

    /// Broadcasts a single value into all 4 lanes.
    ///
    /// # Safety
    ///
    /// The CPU must support AVX2.
    #[inline]
    #[target_feature(enable = "avx2")]
    pub unsafe fn splat(value: f64) -> Self {
        Self {
            elements: _mm256_set1_pd(value),
        }
    }

    /// Lane-wise multiplication.
    ///
    /// # Safety
    ///
    /// The CPU must support AVX2.
    #[inline]
    #[target_feature(enable = "avx2")]
    pub unsafe fn mul(self, rhs: Self) -> Self {
        Self {
            elements: _mm256_mul_pd(self.elements, rhs.elements),
        }
    }

    /// Reduces the 4 lanes to a single scalar sum.
    ///
    /// The reduction narrows 256 → 128 bits, then folds the remaining pair.
    ///
    /// # Safety
    ///
    /// The CPU must support AVX2.
    #[inline]
    #[target_feature(enable = "avx2")]
    pub unsafe fn horizontal_sum(self) -> f64 {
        let lo = _mm256_castpd256_pd128(self.elements);
        let hi = _mm256_extractf128_pd::<1>(self.elements);
        let sum128 = _mm_add_pd(lo, hi);
        let high = _mm_unpackhi_pd(sum128, sum128);
        _mm_cvtsd_f64(_mm_add_sd(sum128, high))
    }

    /// Copies the lanes out into an array, lowest lane first.
    ///
    /// # Safety
    ///
    /// The CPU must support AVX2.
    #[inline]
    #[target_feature(enable = "avx2")]
    pub unsafe fn to_array(self) -> [f64; LANE_COUNT] {
        let mut out = [0.0; LANE_COUNT];
        _mm256_storeu_pd(out.as_mut_ptr(), self.elements);
        out
    }
}
