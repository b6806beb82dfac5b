//! Runtime CPU capability probe and vector access helpers.
//!
//! Compute kernels come in three tiers: AVX2+FMA (x86_64), NEON (AArch64)
//! and a portable scalar fallback. The probe runs once per process and the
//! result is cached, so a binary compiled for a generic target still picks
//! the widest instruction set the machine actually offers. Every kernel
//! entry point is a safe function that dispatches on the cached backend.

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

use std::sync::OnceLock;

/// Instruction-set tier used by the compute kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdBackend {
    /// Portable scalar fallback (no SIMD).
    Scalar,
    /// AVX2 + FMA (256-bit, x86_64).
    Avx2,
    /// ARM NEON (128-bit, AArch64).
    Neon,
}

impl SimdBackend {
    /// Detects the best available backend for the current machine.
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
                return Self::Avx2;
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            // NEON is mandatory on AArch64
            Self::Neon
        }

        #[cfg(not(target_arch = "aarch64"))]
        Self::Scalar
    }

    /// Backend used by this process, probed once and cached.
    #[must_use]
    pub fn current() -> Self {
        static CURRENT: OnceLock<SimdBackend> = OnceLock::new();
        *CURRENT.get_or_init(Self::detect)
    }

    /// Returns the register width in bits.
    #[must_use]
    pub const fn register_width_bits(&self) -> usize {
        match self {
            Self::Scalar => 32,
            Self::Neon => 128,
            Self::Avx2 => 256,
        }
    }

    /// Returns the number of f32 values processed per SIMD operation.
    #[must_use]
    pub const fn f32_lanes(&self) -> usize {
        self.register_width_bits() / 32
    }

    /// Returns a human-readable backend name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Avx2 => "avx2",
            Self::Neon => "neon",
        }
    }
}
