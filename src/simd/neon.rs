//! NEON memory access helpers.
//!
//! # Safety
//!
//! This module uses `unsafe` for SIMD intrinsics which are inherently safe when:
//! - All pointers cover at least the number of lanes being accessed
//!
//! NEON has no masked load/store, so partial vectors at row ends go through
//! a bounded scalar copy into a stack buffer. NEON itself is mandatory on
//! AArch64 and needs no runtime check.
#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]

use std::arch::aarch64::*;

use super::SimdBackend;

/// f32 lanes per 128-bit register.
pub(crate) const F32_LANES: usize = SimdBackend::Neon.f32_lanes();

/// Loads 4 lanes from `ptr`.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn loadu(ptr: *const f32) -> float32x4_t {
    vld1q_f32(ptr)
}

/// Loads the first `len` lanes; the rest read as zero.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn load_tail(ptr: *const f32, len: usize) -> float32x4_t {
    debug_assert!(len <= F32_LANES);
    let mut lanes = [0.0f32; F32_LANES];
    for (i, lane) in lanes.iter_mut().enumerate().take(len) {
        *lane = *ptr.add(i);
    }
    vld1q_f32(lanes.as_ptr())
}

/// Stores 4 lanes to `ptr`.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn storeu(ptr: *mut f32, v: float32x4_t) {
    vst1q_f32(ptr, v)
}

/// Stores only the first `len` lanes; other memory is untouched.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn store_tail(ptr: *mut f32, len: usize, v: float32x4_t) {
    debug_assert!(len <= F32_LANES);
    let mut lanes = [0.0f32; F32_LANES];
    vst1q_f32(lanes.as_mut_ptr(), v);
    for (i, lane) in lanes.iter().enumerate().take(len) {
        *ptr.add(i) = *lane;
    }
}
