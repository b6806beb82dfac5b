//! Direct convolution via explicit patch lowering and GEMM.
//!
//! This is the general path: any kernel, stride, dilation and padding. The
//! source image is lowered into a patch matrix (`im2col` for planar NCHW,
//! `im2row` for interleaved NHWC) with zero fill outside the image, then a
//! single GEMM against the untransformed weights produces the destination.
//! Pointwise 1x1 convolutions skip the lowering entirely and multiply the
//! source in place.
//!
//! The minimal-filtering engine validates against this path and the
//! dispatcher falls back to it whenever the fast path declines a shape.

use crate::error::{Error, Result};
use crate::gemm::gemm_nn;
use crate::param::{Activation, ConvParam};

/// Adds the per-channel bias and applies the activation over one image.
///
/// `count` is the channel extent and `size` the spatial extent; `trans`
/// selects between planar (`[count][size]`) and interleaved
/// (`[size][count]`) destination layouts.
pub(crate) fn bias_and_activation(
    bias: Option<&[f32]>,
    count: usize,
    size: usize,
    activation: Activation,
    trans: bool,
    dst: &mut [f32],
) {
    if bias.is_none() && activation == Activation::Identity {
        return;
    }
    if trans {
        for row in dst.chunks_exact_mut(count).take(size) {
            if let Some(bias) = bias {
                for (v, b) in row.iter_mut().zip(bias) {
                    *v = activation.apply(*v + b);
                }
            } else {
                for v in row.iter_mut() {
                    *v = activation.apply(*v);
                }
            }
        }
    } else {
        for (i, plane) in dst.chunks_exact_mut(size).take(count).enumerate() {
            let b = bias.map_or(0.0, |bias| bias[i]);
            for v in plane.iter_mut() {
                *v = activation.apply(*v + b);
            }
        }
    }
}

/// Lowers one NCHW image into a `[srcC * kernelH * kernelW][dstH * dstW]`
/// patch matrix with zero fill for out-of-image taps.
fn img_to_col(p: &ConvParam, src: &[f32], buf: &mut [f32]) {
    let dst_h = p.dst_h();
    let dst_w = p.dst_w();
    let mut idx = 0;
    for c in 0..p.src_c {
        let plane = &src[c * p.src_h * p.src_w..(c + 1) * p.src_h * p.src_w];
        for ky in 0..p.kernel_y {
            for kx in 0..p.kernel_x {
                for dy in 0..dst_h {
                    let sy = (dy * p.stride_y + ky * p.dilation_y) as isize - p.pad_y as isize;
                    if sy < 0 || sy >= p.src_h as isize {
                        buf[idx..idx + dst_w].fill(0.0);
                        idx += dst_w;
                        continue;
                    }
                    let row = &plane[sy as usize * p.src_w..(sy as usize + 1) * p.src_w];
                    for dx in 0..dst_w {
                        let sx = (dx * p.stride_x + kx * p.dilation_x) as isize - p.pad_x as isize;
                        buf[idx] = if sx < 0 || sx >= p.src_w as isize {
                            0.0
                        } else {
                            row[sx as usize]
                        };
                        idx += 1;
                    }
                }
            }
        }
    }
}

/// Lowers one NHWC image into a `[dstH * dstW][kernelH * kernelW * srcC]`
/// patch matrix with zero fill for out-of-image taps.
fn img_to_row(p: &ConvParam, src: &[f32], buf: &mut [f32]) {
    let dst_h = p.dst_h();
    let dst_w = p.dst_w();
    let mut idx = 0;
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            for ky in 0..p.kernel_y {
                let sy = (dy * p.stride_y + ky * p.dilation_y) as isize - p.pad_y as isize;
                for kx in 0..p.kernel_x {
                    let sx = (dx * p.stride_x + kx * p.dilation_x) as isize - p.pad_x as isize;
                    if sy < 0 || sy >= p.src_h as isize || sx < 0 || sx >= p.src_w as isize {
                        buf[idx..idx + p.src_c].fill(0.0);
                    } else {
                        let at = (sy as usize * p.src_w + sx as usize) * p.src_c;
                        buf[idx..idx + p.src_c].copy_from_slice(&src[at..at + p.src_c]);
                    }
                    idx += p.src_c;
                }
            }
        }
    }
}

/// Direct convolution engine.
///
/// Weights stay untransformed; every forward call lowers the image and runs
/// one GEMM per image. Supports any stride, dilation and padding, which makes
/// it the correctness reference for the minimal-filtering path.
pub struct GemmConvolution {
    param: ConvParam,
    weight: Vec<f32>,
    bias: Vec<f32>,
    activation: Activation,
    weights_set: bool,
    skip_lowering: bool,
    m: usize,
    n: usize,
    k: usize,
}

impl GemmConvolution {
    /// Creates an engine for `param`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when the geometry is empty or
    /// uses grouped convolution.
    pub fn new(param: &ConvParam) -> Result<Self> {
        if !param.valid() {
            return Err(Error::invalid("convolution geometry yields an empty destination"));
        }
        if param.group != 1 {
            return Err(Error::invalid("grouped convolution is not supported"));
        }
        let spatial = param.dst_h() * param.dst_w();
        let k = param.src_c * param.kernel_y * param.kernel_x;
        let (m, n) = if param.trans() {
            (spatial, param.dst_c)
        } else {
            (param.dst_c, spatial)
        };
        Ok(GemmConvolution {
            param: *param,
            weight: Vec::new(),
            bias: Vec::new(),
            activation: Activation::Identity,
            weights_set: false,
            skip_lowering: param.is_1x1(),
            m,
            n,
            k,
        })
    }

    /// Returns the descriptor this engine was built for.
    #[must_use]
    pub fn param(&self) -> &ConvParam {
        &self.param
    }

    /// Scratch elements one forward call needs.
    #[must_use]
    pub fn external_buffer_size(&self) -> usize {
        if self.skip_lowering {
            0
        } else {
            self.k * self.param.dst_h() * self.param.dst_w()
        }
    }

    /// Stores weights, optional bias and the activation epilogue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataLengthMismatch`] when a tensor length does not
    /// match the descriptor.
    pub fn set_params(&mut self, weight: &[f32], bias: Option<&[f32]>, activation: Activation) -> Result<()> {
        if weight.len() != self.param.weight_size() {
            return Err(Error::DataLengthMismatch {
                tensor: "weight",
                expected: self.param.weight_size(),
                actual: weight.len(),
            });
        }
        if let Some(bias) = bias {
            if bias.len() != self.param.dst_c {
                return Err(Error::DataLengthMismatch {
                    tensor: "bias",
                    expected: self.param.dst_c,
                    actual: bias.len(),
                });
            }
            self.bias = bias.to_vec();
        } else {
            self.bias.clear();
        }
        self.weight = weight.to_vec();
        self.activation = activation;
        self.weights_set = true;
        Ok(())
    }

    /// Runs the convolution over a whole batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WeightsNotSet`] before [`set_params`],
    /// [`Error::BufferTooSmall`] when `buf` is under
    /// [`external_buffer_size`], and [`Error::DataLengthMismatch`] when
    /// `src` or `dst` do not match the batch extents.
    ///
    /// [`set_params`]: GemmConvolution::set_params
    /// [`external_buffer_size`]: GemmConvolution::external_buffer_size
    pub fn forward(&self, src: &[f32], buf: &mut [f32], dst: &mut [f32]) -> Result<()> {
        if !self.weights_set {
            return Err(Error::WeightsNotSet);
        }
        let size_s = self.param.src_image_size();
        let size_d = self.param.dst_image_size();
        if src.len() != self.param.batch * size_s {
            return Err(Error::DataLengthMismatch {
                tensor: "src",
                expected: self.param.batch * size_s,
                actual: src.len(),
            });
        }
        if dst.len() != self.param.batch * size_d {
            return Err(Error::DataLengthMismatch {
                tensor: "dst",
                expected: self.param.batch * size_d,
                actual: dst.len(),
            });
        }
        let required = self.external_buffer_size();
        if buf.len() < required {
            return Err(Error::BufferTooSmall { required, provided: buf.len() });
        }
        for b in 0..self.param.batch {
            let src_img = &src[b * size_s..(b + 1) * size_s];
            let dst_img = &mut dst[b * size_d..(b + 1) * size_d];
            self.forward_image(src_img, buf, dst_img);
        }
        Ok(())
    }

    fn forward_image(&self, src: &[f32], buf: &mut [f32], dst: &mut [f32]) {
        let p = &self.param;
        if p.trans() {
            if self.skip_lowering {
                gemm_nn(self.m, self.n, self.k, 1.0, src, self.k, &self.weight, self.n, 0.0, dst, self.n);
            } else {
                img_to_row(p, src, buf);
                gemm_nn(self.m, self.n, self.k, 1.0, buf, self.k, &self.weight, self.n, 0.0, dst, self.n);
            }
        } else if self.skip_lowering {
            gemm_nn(self.m, self.n, self.k, 1.0, &self.weight, self.k, src, self.n, 0.0, dst, self.n);
        } else {
            img_to_col(p, src, buf);
            gemm_nn(self.m, self.n, self.k, 1.0, &self.weight, self.k, buf, self.n, 0.0, dst, self.n);
        }
        let bias = if self.bias.is_empty() { None } else { Some(self.bias.as_slice()) };
        bias_and_activation(bias, p.dst_c, p.dst_h() * p.dst_w(), self.activation, p.trans(), dst);
    }
}
