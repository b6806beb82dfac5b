//! Convolution parameter descriptor and geometry laws.
//!
//! [`ConvParam`] captures the full shape of a 2-D convolution: tensor
//! extents, kernel, stride, dilation, the four-sided padding descriptor and
//! the memory layout. Destination extents are never stored; they derive
//! exactly from
//!
//! ```text
//! dst = (src + padBegin + padEnd - (dilation * (kernel - 1) + 1)) / stride + 1
//! ```
//!
//! so an off-by-one between a caller's expectation and the engine's output is
//! impossible by construction.
//!
//! The fused [`Activation`] epilogue applied after the optional bias also
//! lives here, next to the descriptor it belongs with.

/// Memory layout of feature maps and filter weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorFormat {
    /// Planar, channel-major: `[channels][height][width]`; weights
    /// `[dstC][srcC][kernelH][kernelW]`.
    Nchw,
    /// Interleaved, spatial-major: `[height][width][channels]`; weights
    /// `[kernelH][kernelW][srcC][dstC]`.
    Nhwc,
}

/// Full descriptor of one convolution.
///
/// All fields are public plain data; [`ConvParam::default`] gives batch,
/// stride, dilation and group of 1 with everything else zeroed, so tests and
/// callers can use struct-update syntax for the handful of fields they care
/// about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvParam {
    /// Number of images processed per forward call.
    pub batch: usize,
    /// Source channels.
    pub src_c: usize,
    /// Source height.
    pub src_h: usize,
    /// Source width.
    pub src_w: usize,
    /// Destination channels.
    pub dst_c: usize,
    /// Kernel height.
    pub kernel_y: usize,
    /// Kernel width.
    pub kernel_x: usize,
    /// Vertical stride.
    pub stride_y: usize,
    /// Horizontal stride.
    pub stride_x: usize,
    /// Vertical dilation.
    pub dilation_y: usize,
    /// Horizontal dilation.
    pub dilation_x: usize,
    /// Padding rows above the image.
    pub pad_y: usize,
    /// Padding columns left of the image.
    pub pad_x: usize,
    /// Padding rows below the image.
    pub pad_h: usize,
    /// Padding columns right of the image.
    pub pad_w: usize,
    /// Number of convolution groups.
    pub group: usize,
    /// Memory layout of all tensors in this convolution.
    pub format: TensorFormat,
}

impl Default for ConvParam {
    fn default() -> Self {
        ConvParam {
            batch: 1,
            src_c: 0,
            src_h: 0,
            src_w: 0,
            dst_c: 0,
            kernel_y: 0,
            kernel_x: 0,
            stride_y: 1,
            stride_x: 1,
            dilation_y: 1,
            dilation_x: 1,
            pad_y: 0,
            pad_x: 0,
            pad_h: 0,
            pad_w: 0,
            group: 1,
            format: TensorFormat::Nchw,
        }
    }
}

fn out_size(src: usize, pad_b: usize, pad_e: usize, kernel: usize, dilation: usize, stride: usize) -> usize {
    if kernel == 0 || dilation == 0 || stride == 0 {
        return 0;
    }
    let kernel_ext = dilation * (kernel - 1) + 1;
    let padded = src + pad_b + pad_e;
    if padded < kernel_ext {
        0
    } else {
        (padded - kernel_ext) / stride + 1
    }
}

impl ConvParam {
    /// Destination height derived from the geometry law.
    #[must_use]
    pub fn dst_h(&self) -> usize {
        out_size(self.src_h, self.pad_y, self.pad_h, self.kernel_y, self.dilation_y, self.stride_y)
    }

    /// Destination width derived from the geometry law.
    #[must_use]
    pub fn dst_w(&self) -> usize {
        out_size(self.src_w, self.pad_x, self.pad_w, self.kernel_x, self.dilation_x, self.stride_x)
    }

    /// Whether tensors are interleaved (NHWC).
    #[must_use]
    pub fn trans(&self) -> bool {
        self.format == TensorFormat::Nhwc
    }

    /// Whether the geometry describes a non-empty convolution.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.batch > 0
            && self.src_c > 0
            && self.dst_c > 0
            && self.group > 0
            && self.src_c % self.group == 0
            && self.dst_c % self.group == 0
            && self.dst_h() > 0
            && self.dst_w() > 0
    }

    /// True when the kernel extents equal (`y`, `x`).
    #[must_use]
    pub fn is_kernel(&self, y: usize, x: usize) -> bool {
        self.kernel_y == y && self.kernel_x == x
    }

    /// True when both strides equal `v`.
    #[must_use]
    pub fn is_stride(&self, v: usize) -> bool {
        self.stride_y == v && self.stride_x == v
    }

    /// True when both dilations equal `v`.
    #[must_use]
    pub fn is_dilation(&self, v: usize) -> bool {
        self.dilation_y == v && self.dilation_x == v
    }

    /// True when all four padding offsets equal `v`.
    #[must_use]
    pub fn is_pad(&self, v: usize) -> bool {
        self.pad_y == v && self.pad_x == v && self.pad_h == v && self.pad_w == v
    }

    /// True for a pointwise convolution (1x1 kernel, unit stride, no padding).
    #[must_use]
    pub fn is_1x1(&self) -> bool {
        self.is_kernel(1, 1) && self.is_dilation(1) && self.is_stride(1) && self.is_pad(0)
    }

    /// Elements in one source image.
    #[must_use]
    pub fn src_image_size(&self) -> usize {
        self.src_c * self.src_h * self.src_w
    }

    /// Elements in one destination image.
    #[must_use]
    pub fn dst_image_size(&self) -> usize {
        self.dst_c * self.dst_h() * self.dst_w()
    }

    /// Elements in the weight tensor.
    #[must_use]
    pub fn weight_size(&self) -> usize {
        self.kernel_y * self.kernel_x * self.src_c * self.dst_c / self.group
    }
}

/// Elementwise activation fused into the convolution epilogue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// Pass-through.
    Identity,
    /// `max(v, 0)`.
    Relu,
    /// `v` for positive inputs, `slope * v` for negative ones.
    LeakyRelu {
        /// Multiplier applied to negative inputs.
        slope: f32,
    },
    /// Clamps every value into `[lo, hi]`.
    RestrictRange {
        /// Lower bound.
        lo: f32,
        /// Upper bound.
        hi: f32,
    },
}

impl Activation {
    /// Applies the activation to one value.
    #[inline]
    #[must_use]
    pub fn apply(self, v: f32) -> f32 {
        match self {
            Activation::Identity => v,
            Activation::Relu => v.max(0.0),
            Activation::LeakyRelu { slope } => v.max(0.0) + slope * v.min(0.0),
            Activation::RestrictRange { lo, hi } => v.max(lo).min(hi),
        }
    }
}
