//! Row-major single-precision matrix multiply (NN variant).
//!
//! Computes `C = alpha * A * B + beta * C` for non-transposed row-major
//! operands, the only GEMM shape the convolution paths need. Leading
//! dimensions are given in elements, so callers can address sub-matrices of
//! larger buffers.
//!
//! When `beta == 0` the destination is written without ever being read, so
//! scratch memory does not need to be zeroed (or even initialized to
//! non-NaN values) beforehand.
#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]

use crate::simd::SimdBackend;

#[cfg(target_arch = "x86_64")]
use crate::simd::x86;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use crate::simd::neon;
#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

/// Multiplies `m x k` matrix `a` by `k x n` matrix `b` into `m x n` matrix `c`.
///
/// Extents and leading dimensions are caller contracts, checked by debug
/// assertions only; a slice genuinely too short for its extents still
/// panics on indexing.
#[allow(clippy::too_many_arguments)]
pub(crate) fn gemm_nn(
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    lda: usize,
    b: &[f32],
    ldb: usize,
    beta: f32,
    c: &mut [f32],
    ldc: usize,
) {
    if m == 0 || n == 0 {
        return;
    }
    debug_assert!(lda >= k, "lda {lda} must cover k {k}");
    debug_assert!(ldb >= n, "ldb {ldb} must cover n {n}");
    debug_assert!(ldc >= n, "ldc {ldc} must cover n {n}");
    debug_assert!(a.len() >= (m - 1) * lda + k, "matrix A too short");
    debug_assert!(k == 0 || b.len() >= (k - 1) * ldb + n, "matrix B too short");
    debug_assert!(c.len() >= (m - 1) * ldc + n, "matrix C too short");

    match SimdBackend::current() {
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx2 => {
            // SAFETY: AVX2+FMA presence verified by the capability probe;
            // slice extents checked above.
            unsafe { gemm_nn_avx2(m, n, k, alpha, a, lda, b, ldb, beta, c, ldc) }
        }
        #[cfg(target_arch = "aarch64")]
        SimdBackend::Neon => {
            // SAFETY: NEON is mandatory on AArch64; slice extents checked above.
            unsafe { gemm_nn_neon(m, n, k, alpha, a, lda, b, ldb, beta, c, ldc) }
        }
        _ => gemm_nn_scalar(m, n, k, alpha, a, lda, b, ldb, beta, c, ldc),
    }
}

#[allow(clippy::too_many_arguments)]
fn gemm_nn_scalar(
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    lda: usize,
    b: &[f32],
    ldb: usize,
    beta: f32,
    c: &mut [f32],
    ldc: usize,
) {
    for i in 0..m {
        let c_row = &mut c[i * ldc..i * ldc + n];
        if beta == 0.0 {
            c_row.fill(0.0);
        } else if beta != 1.0 {
            for v in c_row.iter_mut() {
                *v *= beta;
            }
        }
        for p in 0..k {
            let av = alpha * a[i * lda + p];
            let b_row = &b[p * ldb..p * ldb + n];
            for (cv, bv) in c_row.iter_mut().zip(b_row) {
                *cv += av * bv;
            }
        }
    }
}

/// AVX2 path: one C strip stays in a register across the whole k loop,
/// with `a[i][p]` broadcast and fused into B strips.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
#[allow(clippy::too_many_arguments)]
unsafe fn gemm_nn_avx2(
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    lda: usize,
    b: &[f32],
    ldb: usize,
    beta: f32,
    c: &mut [f32],
    ldc: usize,
) {
    let full = n - n % x86::F32_LANES;
    let tail = n - full;
    let mask = x86::tail_mask(tail);
    let b_ptr = b.as_ptr();
    for i in 0..m {
        let a_row = a.as_ptr().add(i * lda);
        let c_row = c.as_mut_ptr().add(i * ldc);
        let mut j = 0;
        while j < full {
            let mut acc = if beta == 0.0 {
                _mm256_setzero_ps()
            } else {
                _mm256_mul_ps(_mm256_set1_ps(beta), x86::loadu(c_row.add(j)))
            };
            for p in 0..k {
                let av = _mm256_set1_ps(alpha * *a_row.add(p));
                acc = _mm256_fmadd_ps(av, x86::loadu(b_ptr.add(p * ldb + j)), acc);
            }
            x86::storeu(c_row.add(j), acc);
            j += x86::F32_LANES;
        }
        if tail > 0 {
            let mut acc = if beta == 0.0 {
                _mm256_setzero_ps()
            } else {
                _mm256_mul_ps(_mm256_set1_ps(beta), x86::maskload(c_row.add(full), mask))
            };
            for p in 0..k {
                let av = _mm256_set1_ps(alpha * *a_row.add(p));
                acc = _mm256_fmadd_ps(av, x86::maskload(b_ptr.add(p * ldb + full), mask), acc);
            }
            x86::maskstore(c_row.add(full), mask, acc);
        }
    }
}

/// NEON path: same structure as AVX2 with four-lane strips and bounded
/// scalar tails.
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
#[allow(clippy::too_many_arguments)]
unsafe fn gemm_nn_neon(
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    lda: usize,
    b: &[f32],
    ldb: usize,
    beta: f32,
    c: &mut [f32],
    ldc: usize,
) {
    let full = n - n % neon::F32_LANES;
    let tail = n - full;
    let b_ptr = b.as_ptr();
    for i in 0..m {
        let a_row = a.as_ptr().add(i * lda);
        let c_row = c.as_mut_ptr().add(i * ldc);
        let mut j = 0;
        while j < full {
            let mut acc = if beta == 0.0 {
                vdupq_n_f32(0.0)
            } else {
                vmulq_n_f32(neon::loadu(c_row.add(j)), beta)
            };
            for p in 0..k {
                let av = vdupq_n_f32(alpha * *a_row.add(p));
                acc = vfmaq_f32(acc, av, neon::loadu(b_ptr.add(p * ldb + j)));
            }
            neon::storeu(c_row.add(j), acc);
            j += neon::F32_LANES;
        }
        if tail > 0 {
            let mut acc = if beta == 0.0 {
                vdupq_n_f32(0.0)
            } else {
                vmulq_n_f32(neon::load_tail(c_row.add(full), tail), beta)
            };
            for p in 0..k {
                let av = vdupq_n_f32(alpha * *a_row.add(p));
                acc = vfmaq_f32(acc, av, neon::load_tail(b_ptr.add(p * ldb + full), tail));
            }
            neon::store_tail(c_row.add(full), tail, acc);
        }
    }
}
