//! # Trueno-Conv
//!
//! Winograd minimal-filtering convolution engine for f32 CNN inference.
//!
//! Small-kernel, unit-stride convolutions dominate CNN inference time.
//! Minimal filtering moves them into a transformed domain where each
//! output block costs one small GEMM per slot instead of a full sliding
//! dot product, cutting multiplies by 2-4x for 3x3 kernels. This crate
//! implements the transform pipeline for 1x3, 1x5, 2x2 and 3x3 kernels
//! over both planar (NCHW) and interleaved (NHWC) tensors, with a direct
//! im2col/im2row path as reference and fallback.
//!
//! ## Features
//!
//! - **Seven kernel/block variants**: output blocks from 1x4 strips to 4x4
//!   tiles, selected automatically from the shape
//! - **Capability dispatch**: AVX2+FMA and NEON GEMM kernels behind a
//!   once-per-process probe, scalar everywhere else
//! - **Caller-owned scratch**: no allocation in `forward`; one buffer sized
//!   by `external_buffer_size()` serves the whole batch
//! - **Fused epilogue**: bias and activation applied in the output
//!   transform pass
//!
//! ## Quick Start
//!
//! ```rust
//! use trueno_conv::{Activation, ConvParam, Convolution, TensorFormat};
//!
//! let param = ConvParam {
//!     src_c: 32,
//!     src_h: 28,
//!     src_w: 28,
//!     dst_c: 32,
//!     kernel_y: 3,
//!     kernel_x: 3,
//!     pad_y: 1,
//!     pad_x: 1,
//!     pad_h: 1,
//!     pad_w: 1,
//!     format: TensorFormat::Nchw,
//!     ..ConvParam::default()
//! };
//!
//! let mut conv = Convolution::new(&param)?;
//! let weight = vec![0.01f32; param.weight_size()];
//! conv.set_params(&weight, None, Activation::Relu)?;
//!
//! let src = vec![0.0f32; param.src_image_size()];
//! let mut buf = vec![0.0f32; conv.external_buffer_size()];
//! let mut dst = vec![0.0f32; param.dst_image_size()];
//! conv.forward(&src, &mut buf, &mut dst)?;
//! # Ok::<(), trueno_conv::Error>(())
//! ```
//!
//! ## Academic References
//!
//! This library implements algorithms from peer-reviewed research:
//!
//! - Winograd, S. (1980). *Arithmetic Complexity of Computations*. SIAM.
//! - Lavin, A., & Gray, S. (2016). "Fast Algorithms for Convolutional
//!   Neural Networks." CVPR '16.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// unwrap() allowed in tests only; production code propagates errors
#![cfg_attr(test, allow(clippy::unwrap_used))]
// Allow common patterns in numerical kernel code
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Convolution descriptor, tensor layouts and the activation epilogue.
pub mod param;

/// Error and result types.
pub mod error;

// ============================================================================
// Engines
// ============================================================================

mod gemm;

/// Direct im2col/im2row convolution, the numerical reference path.
pub mod direct;

/// Minimal-filtering convolution engine.
pub mod winograd;

/// Top-level dispatcher over the engines.
pub mod conv;

// ============================================================================
// Acceleration
// ============================================================================

/// Backend capability probe for the SIMD paths.
pub mod simd;

// ============================================================================
// Re-exports
// ============================================================================

pub use conv::Convolution;
pub use direct::GemmConvolution;
pub use error::{Error, Result};
pub use param::{Activation, ConvParam, TensorFormat};
pub use simd::SimdBackend;
pub use winograd::{WinogradConvolution, WinogradVariant};

// ============================================================================
// Prelude
// ============================================================================

/// Convenience re-exports for common usage.
///
/// ```rust,ignore
/// use trueno_conv::prelude::*;
/// ```
pub mod prelude {
    pub use crate::conv::Convolution;
    pub use crate::direct::GemmConvolution;
    pub use crate::error::{Error, Result};
    pub use crate::param::{Activation, ConvParam, TensorFormat};
    pub use crate::winograd::{WinogradConvolution, WinogradVariant};
}
