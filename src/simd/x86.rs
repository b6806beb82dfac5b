//! AVX2 memory access helpers.
//!
//! # Safety
//!
//! This module uses `unsafe` for SIMD intrinsics which are inherently safe when:
//! - AVX2 support is detected at runtime before any caller dispatches here
//! - All pointers cover at least the number of lanes being accessed
//!
//! Loads and stores always use unaligned encodings; partial vectors at row
//! ends go through `vmaskmov` with a mask drawn from a static table, so a
//! tail never touches memory past the valid region.
#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]

use std::arch::x86_64::*;

use super::SimdBackend;

/// f32 lanes per 256-bit register.
pub(crate) const F32_LANES: usize = SimdBackend::Avx2.f32_lanes();

// Entry `n` enables the first `n` lanes (sign bit set).
const TAIL_MASKS: [[i32; F32_LANES]; F32_LANES + 1] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [-1, 0, 0, 0, 0, 0, 0, 0],
    [-1, -1, 0, 0, 0, 0, 0, 0],
    [-1, -1, -1, 0, 0, 0, 0, 0],
    [-1, -1, -1, -1, 0, 0, 0, 0],
    [-1, -1, -1, -1, -1, 0, 0, 0],
    [-1, -1, -1, -1, -1, -1, 0, 0],
    [-1, -1, -1, -1, -1, -1, -1, 0],
    [-1, -1, -1, -1, -1, -1, -1, -1],
];

/// Builds a lane mask covering the first `len` lanes.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn tail_mask(len: usize) -> __m256i {
    debug_assert!(len <= F32_LANES);
    _mm256_loadu_si256(TAIL_MASKS[len].as_ptr().cast::<__m256i>())
}

/// Loads 8 lanes from `ptr`.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn loadu(ptr: *const f32) -> __m256 {
    _mm256_loadu_ps(ptr)
}

/// Loads the lanes enabled in `mask`; disabled lanes read as zero.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn maskload(ptr: *const f32, mask: __m256i) -> __m256 {
    _mm256_maskload_ps(ptr, mask)
}

/// Stores 8 lanes to `ptr`.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn storeu(ptr: *mut f32, v: __m256) {
    _mm256_storeu_ps(ptr, v)
}

/// Stores only the lanes enabled in `mask`; other memory is untouched.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn maskstore(ptr: *mut f32, mask: __m256i, v: __m256) {
    _mm256_maskstore_ps(ptr, mask, v)
}
