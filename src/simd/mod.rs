//! SIMD support for the vectorized multiplication strategy.

#[cfg(target_arch = "x86_64")]
pub mod avx2;

/// Byte alignment required of matrix allocations by the vectorized strategy.
///
/// 256-bit vector loads perform best on 32-byte boundaries; every matrix
/// buffer in this crate is allocated with this alignment.
pub const VEC_ALIGNMENT: usize = 32;

/// Number of f64 lanes in the widest efficient vector on the target machine.
pub const LANE_COUNT: usize = 4;
