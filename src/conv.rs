//! Top-level convolution entry point.
//!
//! [`Convolution::new`] inspects a descriptor once and commits to an engine:
//! the minimal-filtering path when its dispatch gates hold, otherwise the
//! direct im2col/im2row path, which accepts every valid geometry. Both
//! engines share the `set_params` / `external_buffer_size` / `forward`
//! surface, so callers never branch on the choice.

use crate::direct::GemmConvolution;
use crate::error::{Error, Result};
use crate::param::{Activation, ConvParam};
use crate::winograd::WinogradConvolution;

/// Convolution engine selected for one descriptor.
pub enum Convolution {
    /// Minimal-filtering transform pipeline.
    Winograd(WinogradConvolution),
    /// Direct lowering plus one GEMM per image.
    Gemm(GemmConvolution),
}

impl Convolution {
    /// Picks and constructs an engine for `param`.
    ///
    /// Candidates decline configurations they cannot run, so a shape that
    /// passes the minimal-filtering gates but trips a construction check
    /// still lands on the direct path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when no engine accepts the
    /// descriptor.
    pub fn new(param: &ConvParam) -> Result<Self> {
        if !param.valid() {
            return Err(Error::invalid("convolution geometry yields an empty destination"));
        }
        if WinogradConvolution::preferable(param) {
            if let Ok(conv) = WinogradConvolution::new(param) {
                return Ok(Self::Winograd(conv));
            }
        }
        Ok(Self::Gemm(GemmConvolution::new(param)?))
    }

    /// Returns the descriptor the engine was built for.
    #[must_use]
    pub fn param(&self) -> &ConvParam {
        match self {
            Self::Winograd(conv) => conv.param(),
            Self::Gemm(conv) => conv.param(),
        }
    }

    /// Name of the selected path, for logs and benchmarks.
    #[must_use]
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Winograd(_) => "winograd",
            Self::Gemm(_) => "gemm",
        }
    }

    /// Scratch elements one forward call needs.
    #[must_use]
    pub fn external_buffer_size(&self) -> usize {
        match self {
            Self::Winograd(conv) => conv.external_buffer_size(),
            Self::Gemm(conv) => conv.external_buffer_size(),
        }
    }

    /// Stores weights, bias and activation on the selected engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataLengthMismatch`] when a tensor length does not
    /// match the descriptor.
    pub fn set_params(&mut self, weight: &[f32], bias: Option<&[f32]>, activation: Activation) -> Result<()> {
        match self {
            Self::Winograd(conv) => conv.set_params(weight, bias, activation),
            Self::Gemm(conv) => conv.set_params(weight, bias, activation),
        }
    }

    /// Runs the convolution over a whole batch.
    ///
    /// # Errors
    ///
    /// Propagates the selected engine's guards: [`Error::WeightsNotSet`],
    /// [`Error::BufferTooSmall`] and [`Error::DataLengthMismatch`].
    pub fn forward(&self, src: &[f32], buf: &mut [f32], dst: &mut [f32]) -> Result<()> {
        match self {
            Self::Winograd(conv) => conv.forward(src, buf, dst),
            Self::Gemm(conv) => conv.forward(src, buf, dst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::TensorFormat;
    use approx::assert_relative_eq;

    fn pseudo_fill(data: &mut [f32], seed: &mut u32) {
        for v in data.iter_mut() {
            *seed ^= *seed << 13;
            *seed ^= *seed >> 17;
            *seed ^= *seed << 5;
            *v = (*seed as f32 / u32::MAX as f32) - 0.5;
        }
    }

    fn preferable_shape() -> ConvParam {
        ConvParam {
            src_c: 32,
            src_h: 14,
            src_w: 14,
            dst_c: 24,
            kernel_y: 3,
            kernel_x: 3,
            pad_y: 1,
            pad_x: 1,
            pad_h: 1,
            pad_w: 1,
            format: TensorFormat::Nchw,
            ..ConvParam::default()
        }
    }

    #[test]
    fn test_dispatch_picks_winograd() {
        let conv = Convolution::new(&preferable_shape()).unwrap();
        assert_eq!(conv.algorithm(), "winograd");
    }

    #[test]
    fn test_dispatch_falls_back_to_gemm() {
        let strided = ConvParam { stride_y: 2, stride_x: 2, ..preferable_shape() };
        assert_eq!(Convolution::new(&strided).unwrap().algorithm(), "gemm");

        let narrow = ConvParam { src_c: 8, ..preferable_shape() };
        assert_eq!(Convolution::new(&narrow).unwrap().algorithm(), "gemm");

        let pointwise = ConvParam {
            kernel_y: 1,
            kernel_x: 1,
            pad_y: 0,
            pad_x: 0,
            pad_h: 0,
            pad_w: 0,
            ..preferable_shape()
        };
        assert_eq!(Convolution::new(&pointwise).unwrap().algorithm(), "gemm");
    }

    #[test]
    fn test_dispatch_rejects_empty_geometry() {
        let p = ConvParam {
            src_h: 2,
            src_w: 2,
            kernel_y: 3,
            kernel_x: 3,
            src_c: 4,
            dst_c: 4,
            ..ConvParam::default()
        };
        assert!(Convolution::new(&p).is_err());
    }

    #[test]
    fn test_paths_agree_through_dispatcher() {
        let p = preferable_shape();
        let mut seed = 0x5151;
        let mut src = vec![0.0f32; p.src_image_size()];
        let mut weight = vec![0.0f32; p.weight_size()];
        let mut bias = vec![0.0f32; p.dst_c];
        pseudo_fill(&mut src, &mut seed);
        pseudo_fill(&mut weight, &mut seed);
        pseudo_fill(&mut bias, &mut seed);

        let mut fast = Convolution::new(&p).unwrap();
        assert_eq!(fast.algorithm(), "winograd");
        fast.set_params(&weight, Some(&bias), Activation::Relu).unwrap();
        let mut buf = vec![0.0f32; fast.external_buffer_size()];
        let mut got = vec![0.0f32; p.dst_image_size()];
        fast.forward(&src, &mut buf, &mut got).unwrap();

        let mut reference = GemmConvolution::new(&p).unwrap();
        reference.set_params(&weight, Some(&bias), Activation::Relu).unwrap();
        let mut ref_buf = vec![0.0f32; reference.external_buffer_size()];
        let mut want = vec![0.0f32; p.dst_image_size()];
        reference.forward(&src, &mut ref_buf, &mut want).unwrap();

        for (g, w) in got.iter().zip(&want) {
            assert_relative_eq!(*g, *w, epsilon = 1e-4, max_relative = 1e-4);
        }
    }
}
