//! Minimal-filtering convolution engine.
//!
//! Unit-stride convolutions with small kernels can trade most of their
//! multiplies for additions: the weights are transformed once into a
//! slot-major domain, each source image is transformed tile by tile into the
//! same domain, one small GEMM per slot multiplies them, and an inverse
//! transform assembles the destination. Seven kernel/block pairings are
//! implemented, from `1x3` strips up to the classic `3x3` kernel with a
//! `4x4` output block.
//!
//! [`WinogradConvolution::new`] picks a block size from the shape the same
//! way [`preferable`] gates dispatch: both lean towards larger blocks only
//! when the image gives them enough tiles to pay off. Interleaved (NHWC)
//! batches are additionally merged so several images share one GEMM per
//! slot.
//!
//! [`preferable`]: WinogradConvolution::preferable

mod driver;
mod kernel1x3;
mod kernel1x5;
mod kernel2x2;
mod kernel3x3;

use crate::direct::bias_and_activation;
use crate::error::{Error, Result};
use crate::gemm::gemm_nn;
use crate::param::{Activation, ConvParam};

/// Cap on GEMM rows collected across merged images.
const MERGE_LIMIT: usize = 128;

/// Kernel and output-block pairing implemented by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinogradVariant {
    /// 1x3 kernel, 1x4 output block, 6 slots.
    Kernel1x3Block1x4,
    /// 1x5 kernel, 1x4 output block, 8 slots.
    Kernel1x5Block1x4,
    /// 2x2 kernel, 2x2 output block, 9 slots.
    Kernel2x2Block2x2,
    /// 2x2 kernel, 4x4 output block, 25 slots.
    Kernel2x2Block4x4,
    /// 3x3 kernel, 2x2 output block, 16 slots.
    Kernel3x3Block2x2,
    /// 3x3 kernel, 3x3 output block, 25 slots.
    Kernel3x3Block3x3,
    /// 3x3 kernel, 4x4 output block, 36 slots.
    Kernel3x3Block4x4,
}

impl WinogradVariant {
    /// Kernel extents `(height, width)` this variant covers.
    #[must_use]
    pub const fn kernel(&self) -> (usize, usize) {
        match self {
            Self::Kernel1x3Block1x4 => (1, 3),
            Self::Kernel1x5Block1x4 => (1, 5),
            Self::Kernel2x2Block2x2 | Self::Kernel2x2Block4x4 => (2, 2),
            Self::Kernel3x3Block2x2 | Self::Kernel3x3Block3x3 | Self::Kernel3x3Block4x4 => (3, 3),
        }
    }

    /// Output block extents `(height, width)`.
    #[must_use]
    pub const fn block(&self) -> (usize, usize) {
        match self {
            Self::Kernel1x3Block1x4 | Self::Kernel1x5Block1x4 => (1, 4),
            Self::Kernel2x2Block2x2 | Self::Kernel3x3Block2x2 => (2, 2),
            Self::Kernel3x3Block3x3 => (3, 3),
            Self::Kernel2x2Block4x4 | Self::Kernel3x3Block4x4 => (4, 4),
        }
    }

    /// Slots in the transformed domain:
    /// `(blockH + kernelH - 1) * (blockW + kernelW - 1)`.
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        let (kh, kw) = self.kernel();
        let (bh, bw) = self.block();
        (bh + kh - 1) * (bw + kw - 1)
    }

    /// Padding combinations this variant accepts.
    fn supports_padding(&self, p: &ConvParam) -> bool {
        match self {
            Self::Kernel1x3Block1x4 => {
                p.pad_y == 0 && p.pad_h == 0 && p.pad_x == p.pad_w && p.pad_x <= 1
            }
            Self::Kernel1x5Block1x4 => {
                p.pad_y == 0 && p.pad_h == 0 && p.pad_x == p.pad_w && (p.pad_x == 0 || p.pad_x == 2)
            }
            Self::Kernel2x2Block2x2 | Self::Kernel2x2Block4x4 => {
                p.pad_y == p.pad_x && p.pad_h == p.pad_w && p.pad_y + p.pad_h <= 1
            }
            Self::Kernel3x3Block2x2 | Self::Kernel3x3Block3x3 => p.is_pad(0) || p.is_pad(1),
            Self::Kernel3x3Block4x4 => {
                p.pad_y <= 1 && p.pad_x <= 1 && p.pad_y + p.pad_h <= 2 && p.pad_x + p.pad_w <= 2
            }
        }
    }

    /// Picks a block size for the kernel shape, or `None` for kernels the
    /// engine does not cover.
    ///
    /// Larger blocks only pay off when the image yields enough tiles, so
    /// small images fall back to the 2x2 block and planar tensors always
    /// use it for square kernels.
    #[must_use]
    pub fn select(p: &ConvParam) -> Option<Self> {
        let area = p.src_h * p.src_w * p.batch;
        match (p.kernel_y, p.kernel_x) {
            (1, 3) => Some(Self::Kernel1x3Block1x4),
            (1, 5) => Some(Self::Kernel1x5Block1x4),
            (2, 2) => {
                if p.trans() && p.src_h >= 8 && p.src_w >= 8 && area >= 144 {
                    Some(Self::Kernel2x2Block4x4)
                } else {
                    Some(Self::Kernel2x2Block2x2)
                }
            }
            (3, 3) => {
                if p.trans() && p.src_h >= 8 && p.src_w >= 8 && area >= 144 {
                    Some(Self::Kernel3x3Block4x4)
                } else if p.trans()
                    && p.src_h >= 6
                    && p.src_w >= 6
                    && area >= 81
                    && p.dst_h() % 3 == 0
                    && p.dst_w() % 3 == 0
                {
                    Some(Self::Kernel3x3Block3x3)
                } else {
                    Some(Self::Kernel3x3Block2x2)
                }
            }
            _ => None,
        }
    }

    fn set_filter(&self, src: &[f32], size: usize, dst: &mut [f32], trans: bool) {
        match self {
            Self::Kernel1x3Block1x4 => kernel1x3::set_filter(src, size, dst, trans),
            Self::Kernel1x5Block1x4 => kernel1x5::set_filter(src, size, dst, trans),
            Self::Kernel2x2Block2x2 => kernel2x2::set_filter_block2x2(src, size, dst, trans),
            Self::Kernel2x2Block4x4 => kernel2x2::set_filter_block4x4(src, size, dst, trans),
            Self::Kernel3x3Block2x2 => kernel3x3::set_filter_block2x2(src, size, dst, trans),
            Self::Kernel3x3Block3x3 => kernel3x3::set_filter_block3x3(src, size, dst, trans),
            Self::Kernel3x3Block4x4 => kernel3x3::set_filter_block4x4(src, size, dst, trans),
        }
    }

    fn set_input(&self, p: &ConvParam, src: &[f32], dst: &mut [f32], dst_stride: usize) {
        match self {
            Self::Kernel1x3Block1x4 => kernel1x3::set_input(p, src, dst, dst_stride),
            Self::Kernel1x5Block1x4 => kernel1x5::set_input(p, src, dst, dst_stride),
            Self::Kernel2x2Block2x2 => kernel2x2::set_input_block2x2(p, src, dst, dst_stride),
            Self::Kernel2x2Block4x4 => kernel2x2::set_input_block4x4(p, src, dst, dst_stride),
            Self::Kernel3x3Block2x2 => kernel3x3::set_input_block2x2(p, src, dst, dst_stride),
            Self::Kernel3x3Block3x3 => kernel3x3::set_input_block3x3(p, src, dst, dst_stride),
            Self::Kernel3x3Block4x4 => kernel3x3::set_input_block4x4(p, src, dst, dst_stride),
        }
    }

    fn set_output(&self, p: &ConvParam, src: &[f32], src_stride: usize, dst: &mut [f32]) {
        match self {
            Self::Kernel1x3Block1x4 => kernel1x3::set_output(p, src, src_stride, dst),
            Self::Kernel1x5Block1x4 => kernel1x5::set_output(p, src, src_stride, dst),
            Self::Kernel2x2Block2x2 => kernel2x2::set_output_block2x2(p, src, src_stride, dst),
            Self::Kernel2x2Block4x4 => kernel2x2::set_output_block4x4(p, src, src_stride, dst),
            Self::Kernel3x3Block2x2 => kernel3x3::set_output_block2x2(p, src, src_stride, dst),
            Self::Kernel3x3Block3x3 => kernel3x3::set_output_block3x3(p, src, src_stride, dst),
            Self::Kernel3x3Block4x4 => kernel3x3::set_output_block4x4(p, src, src_stride, dst),
        }
    }
}

/// Minimal-filtering convolution engine for one fixed descriptor.
///
/// Weights are transformed once in [`set_params`]; every [`forward`] call
/// then runs input transform, one GEMM per slot and the inverse transform
/// inside a caller-provided scratch buffer sized by
/// [`external_buffer_size`].
///
/// [`set_params`]: WinogradConvolution::set_params
/// [`forward`]: WinogradConvolution::forward
/// [`external_buffer_size`]: WinogradConvolution::external_buffer_size
pub struct WinogradConvolution {
    param: ConvParam,
    variant: WinogradVariant,
    count: usize,
    tile_h: usize,
    tile_w: usize,
    stride_s: usize,
    stride_d: usize,
    stride_w: usize,
    merge: usize,
    filter: Vec<f32>,
    bias: Vec<f32>,
    activation: Activation,
    weights_set: bool,
}

impl WinogradConvolution {
    /// Creates an engine with an automatically selected block size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when the kernel shape has no
    /// variant or the geometry fails [`WinogradConvolution::with_variant`]'s
    /// checks.
    pub fn new(param: &ConvParam) -> Result<Self> {
        let variant = WinogradVariant::select(param).ok_or_else(|| {
            Error::invalid(format!(
                "no minimal-filtering variant for a {}x{} kernel",
                param.kernel_y, param.kernel_x
            ))
        })?;
        Self::with_variant(param, variant)
    }

    /// Creates an engine with an explicit variant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when the geometry is empty,
    /// grouped, strided, dilated, the kernel does not match the variant, or
    /// the padding combination is outside the variant's envelope.
    pub fn with_variant(param: &ConvParam, variant: WinogradVariant) -> Result<Self> {
        if !param.valid() {
            return Err(Error::invalid("convolution geometry yields an empty destination"));
        }
        if param.group != 1 {
            return Err(Error::invalid("grouped convolution is not supported"));
        }
        if !param.is_stride(1) {
            return Err(Error::invalid("minimal filtering requires unit stride"));
        }
        if !param.is_dilation(1) {
            return Err(Error::invalid("minimal filtering requires unit dilation"));
        }
        let (kh, kw) = variant.kernel();
        if !param.is_kernel(kh, kw) {
            return Err(Error::invalid(format!(
                "variant expects a {kh}x{kw} kernel, descriptor has {}x{}",
                param.kernel_y, param.kernel_x
            )));
        }
        if !variant.supports_padding(param) {
            return Err(Error::invalid(format!(
                "padding {}/{}/{}/{} is outside the variant's envelope",
                param.pad_y, param.pad_x, param.pad_h, param.pad_w
            )));
        }

        let (bh, bw) = variant.block();
        let (tile_h, tile_w) = driver::tile_grid(param.dst_h(), param.dst_w(), bh, bw);
        let tiles = tile_h * tile_w;
        let mut merge = 1;
        if param.trans() && param.batch > 1 {
            for m in 2..=param.batch {
                if param.batch % m == 0 && tiles * m <= MERGE_LIMIT {
                    merge = m;
                }
            }
        }
        Ok(WinogradConvolution {
            param: *param,
            variant,
            count: variant.slot_count(),
            tile_h,
            tile_w,
            stride_s: param.src_c * tiles,
            stride_d: param.dst_c * tiles,
            stride_w: param.src_c * param.dst_c,
            merge,
            filter: Vec::new(),
            bias: Vec::new(),
            activation: Activation::Identity,
            weights_set: false,
        })
    }

    /// Whether the engine is expected to beat the direct path for `p`.
    ///
    /// Unit stride and dilation, a single group and more than 16 source
    /// channels are required across the board; each kernel shape then adds
    /// its own padding and extent gates. Everything accepted here is also
    /// accepted by [`WinogradConvolution::new`].
    #[must_use]
    pub fn preferable(p: &ConvParam) -> bool {
        if !p.is_dilation(1) || !p.is_stride(1) || p.group != 1 || p.src_c <= 16 {
            return false;
        }
        let area = p.src_h * p.src_w * p.batch;
        let shape_ok = match (p.kernel_y, p.kernel_x) {
            (1, 3) => {
                (p.is_pad(0) || (p.pad_x == 1 && p.pad_w == 1 && p.pad_y == 0 && p.pad_h == 0))
                    && p.src_c > 32
                    && p.trans()
                    && p.src_w >= 8
                    && area >= 36
            }
            (1, 5) => {
                (p.is_pad(0) || (p.pad_x == 2 && p.pad_w == 2 && p.pad_y == 0 && p.pad_h == 0))
                    && p.trans()
                    && p.src_w >= 8
                    && area >= 36
            }
            (2, 2) => {
                (p.is_pad(0) || (p.pad_y + p.pad_h == 1 && p.pad_x + p.pad_w == 1))
                    && p.trans()
                    && p.src_h >= 4
                    && p.src_w >= 4
                    && area >= 36
            }
            (3, 3) => {
                (p.is_pad(0) || p.is_pad(1))
                    && if p.trans() {
                        p.src_h >= 4 && p.src_w >= 4 && area >= 36
                    } else {
                        p.src_h >= 6 && p.src_w >= 6
                    }
            }
            _ => false,
        };
        shape_ok && WinogradVariant::select(p).is_some_and(|v| v.supports_padding(p))
    }

    /// Returns the descriptor this engine was built for.
    #[must_use]
    pub fn param(&self) -> &ConvParam {
        &self.param
    }

    /// Returns the kernel/block variant in use.
    #[must_use]
    pub fn variant(&self) -> WinogradVariant {
        self.variant
    }

    /// Scratch elements one forward call needs.
    #[must_use]
    pub fn external_buffer_size(&self) -> usize {
        (self.stride_s + self.stride_d) * self.count * self.merge
    }

    /// Transforms and stores weights, with optional bias and activation.
    ///
    /// Retransforming the same weights produces bit-identical state.
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
        self.filter.clear();
        self.filter.resize(self.stride_w * self.count, 0.0);
        self.variant.set_filter(weight, self.stride_w, &mut self.filter, self.param.trans());
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
    /// [`set_params`]: WinogradConvolution::set_params
    /// [`external_buffer_size`]: WinogradConvolution::external_buffer_size
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
        let (buf_s, buf_d) = buf.split_at_mut(self.stride_s * self.count * self.merge);
        if self.param.trans() && self.merge > 1 {
            self.forward_merged(src, buf_s, buf_d, dst);
        } else {
            for b in 0..self.param.batch {
                self.forward_single(
                    &src[b * size_s..(b + 1) * size_s],
                    buf_s,
                    buf_d,
                    &mut dst[b * size_d..(b + 1) * size_d],
                );
            }
        }
        Ok(())
    }

    fn forward_single(&self, src: &[f32], buf_s: &mut [f32], buf_d: &mut [f32], dst: &mut [f32]) {
        let p = &self.param;
        let tiles = self.tile_h * self.tile_w;
        self.variant.set_input(p, src, buf_s, self.stride_s);
        for i in 0..self.count {
            let a = i * self.stride_s;
            let c = i * self.stride_d;
            let w = i * self.stride_w;
            if p.trans() {
                gemm_nn(
                    tiles, p.dst_c, p.src_c, 1.0,
                    &buf_s[a..], p.src_c,
                    &self.filter[w..], p.dst_c,
                    0.0,
                    &mut buf_d[c..], p.dst_c,
                );
            } else {
                gemm_nn(
                    p.dst_c, tiles, p.src_c, 1.0,
                    &self.filter[w..], p.src_c,
                    &buf_s[a..], tiles,
                    0.0,
                    &mut buf_d[c..], tiles,
                );
            }
        }
        self.variant.set_output(p, buf_d, self.stride_d, dst);
        let bias = if self.bias.is_empty() { None } else { Some(self.bias.as_slice()) };
        bias_and_activation(bias, p.dst_c, p.dst_h() * p.dst_w(), self.activation, p.trans(), dst);
    }

    /// Interleaved batch path: `merge` images are transformed side by side
    /// so each slot runs one GEMM of `tiles * merge` rows.
    fn forward_merged(&self, src: &[f32], buf_s: &mut [f32], buf_d: &mut [f32], dst: &mut [f32]) {
        let p = &self.param;
        let merge = self.merge;
        let tiles = self.tile_h * self.tile_w;
        let size_s = p.src_image_size();
        let size_d = p.dst_image_size();
        let bias = if self.bias.is_empty() { None } else { Some(self.bias.as_slice()) };
        for b in (0..p.batch).step_by(merge) {
            for m in 0..merge {
                let img = &src[(b + m) * size_s..(b + m + 1) * size_s];
                self.variant.set_input(p, img, &mut buf_s[m * self.stride_s..], self.stride_s * merge);
            }
            for i in 0..self.count {
                gemm_nn(
                    tiles * merge, p.dst_c, p.src_c, 1.0,
                    &buf_s[i * self.stride_s * merge..], p.src_c,
                    &self.filter[i * self.stride_w..], p.dst_c,
                    0.0,
                    &mut buf_d[i * self.stride_d * merge..], p.dst_c,
                );
            }
            for m in 0..merge {
                let out = &mut dst[(b + m) * size_d..(b + m + 1) * size_d];
                self.variant.set_output(p, &buf_d[m * self.stride_d..], self.stride_d * merge, out);
                bias_and_activation(bias, p.dst_c, p.dst_h() * p.dst_w(), self.activation, p.trans(), out);
            }
        }
    }
}
