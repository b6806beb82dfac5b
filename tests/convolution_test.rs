//! Dispatcher And Contract Tests
//!
//! The top-level entry point must route preferable shapes to the
//! minimal-filtering engine, everything else to the direct path, and both
//! engines must enforce the same caller contracts: weights before forward,
//! scratch at least `external_buffer_size()`, slice lengths matching the
//! declared geometry.
//!
//! Run: cargo test --test convolution_test

#![allow(clippy::unwrap_used)]

use trueno_conv::{Activation, ConvParam, Convolution, Error, TensorFormat};

fn pseudo_fill(data: &mut [f32], seed: &mut u32) {
    for v in data.iter_mut() {
        *seed ^= *seed << 13;
        *seed ^= *seed >> 17;
        *seed ^= *seed << 5;
        *v = (*seed as f32 / u32::MAX as f32) - 0.5;
    }
}

fn resnet_shape() -> ConvParam {
    ConvParam {
        src_c: 64,
        src_h: 28,
        src_w: 28,
        dst_c: 64,
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

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_preferable_shapes_route_to_winograd() {
    let conv = Convolution::new(&resnet_shape()).unwrap();
    assert_eq!(conv.algorithm(), "winograd");

    let nhwc = ConvParam { format: TensorFormat::Nhwc, ..resnet_shape() };
    assert_eq!(Convolution::new(&nhwc).unwrap().algorithm(), "winograd");
}

#[test]
fn test_unsupported_shapes_route_to_gemm() {
    let strided = ConvParam { stride_y: 2, stride_x: 2, ..resnet_shape() };
    assert_eq!(Convolution::new(&strided).unwrap().algorithm(), "gemm");

    let dilated = ConvParam { dilation_y: 2, dilation_x: 2, ..resnet_shape() };
    assert_eq!(Convolution::new(&dilated).unwrap().algorithm(), "gemm");

    let shallow = ConvParam { src_c: 8, ..resnet_shape() };
    assert_eq!(Convolution::new(&shallow).unwrap().algorithm(), "gemm");

    let pointwise = ConvParam {
        kernel_y: 1,
        kernel_x: 1,
        pad_y: 0,
        pad_x: 0,
        pad_h: 0,
        pad_w: 0,
        ..resnet_shape()
    };
    assert_eq!(Convolution::new(&pointwise).unwrap().algorithm(), "gemm");

    // Asymmetric 3x3 padding is outside the dispatch gates even though the
    // 4x4 block could realize it when asked explicitly.
    let lopsided = ConvParam { pad_h: 0, ..resnet_shape() };
    assert_eq!(Convolution::new(&lopsided).unwrap().algorithm(), "gemm");
}

#[test]
fn test_rejected_geometries() {
    // Kernel larger than the padded source yields an empty destination.
    let empty = ConvParam {
        src_c: 4,
        src_h: 2,
        src_w: 2,
        dst_c: 4,
        kernel_y: 3,
        kernel_x: 3,
        ..ConvParam::default()
    };
    assert!(matches!(Convolution::new(&empty), Err(Error::InvalidConfiguration { .. })));

    let grouped = ConvParam { group: 2, ..resnet_shape() };
    assert!(matches!(Convolution::new(&grouped), Err(Error::InvalidConfiguration { .. })));

    let zero_channel = ConvParam { src_c: 0, ..resnet_shape() };
    assert!(Convolution::new(&zero_channel).is_err());
}

// ============================================================================
// Caller contracts
// ============================================================================

#[test]
fn test_forward_requires_weights() {
    let p = resnet_shape();
    let conv = Convolution::new(&p).unwrap();
    let src = vec![0.0f32; p.src_image_size()];
    let mut buf = vec![0.0f32; conv.external_buffer_size()];
    let mut dst = vec![0.0f32; p.dst_image_size()];
    assert!(matches!(conv.forward(&src, &mut buf, &mut dst), Err(Error::WeightsNotSet)));
}

#[test]
fn test_forward_checks_scratch_size() {
    let p = resnet_shape();
    let mut conv = Convolution::new(&p).unwrap();
    let weight = vec![0.0f32; p.weight_size()];
    conv.set_params(&weight, None, Activation::Identity).unwrap();

    let src = vec![0.0f32; p.src_image_size()];
    let mut dst = vec![0.0f32; p.dst_image_size()];
    let required = conv.external_buffer_size();
    let mut short = vec![0.0f32; required - 1];
    match conv.forward(&src, &mut short, &mut dst) {
        Err(Error::BufferTooSmall { required: r, provided }) => {
            assert_eq!(r, required);
            assert_eq!(provided, required - 1);
        }
        other => panic!("expected BufferTooSmall, got {other:?}"),
    }
}

#[test]
fn test_forward_checks_tensor_lengths() {
    let p = resnet_shape();
    let mut conv = Convolution::new(&p).unwrap();
    let weight = vec![0.0f32; p.weight_size()];
    conv.set_params(&weight, None, Activation::Identity).unwrap();

    let src = vec![0.0f32; p.src_image_size()];
    let mut buf = vec![0.0f32; conv.external_buffer_size()];
    let mut dst = vec![0.0f32; p.dst_image_size()];
    assert!(matches!(
        conv.forward(&src[..src.len() - 1], &mut buf, &mut dst),
        Err(Error::DataLengthMismatch { tensor: "src", .. })
    ));
    assert!(matches!(
        conv.forward(&src, &mut buf, &mut dst[..p.dst_image_size() - 1]),
        Err(Error::DataLengthMismatch { tensor: "dst", .. })
    ));
}

#[test]
fn test_set_params_checks_weight_length() {
    let p = resnet_shape();
    let mut conv = Convolution::new(&p).unwrap();
    let weight = vec![0.0f32; p.weight_size() - 1];
    assert!(matches!(
        conv.set_params(&weight, None, Activation::Identity),
        Err(Error::DataLengthMismatch { tensor: "weight", .. })
    ));

    let weight = vec![0.0f32; p.weight_size()];
    let bias = vec![0.0f32; p.dst_c + 1];
    assert!(matches!(
        conv.set_params(&weight, Some(&bias), Activation::Identity),
        Err(Error::DataLengthMismatch { tensor: "bias", .. })
    ));
}

// ============================================================================
// Geometry law
// ============================================================================

/// Destination extents follow
/// `(src + padBegin + padEnd - (dilation * (kernel - 1) + 1)) / stride + 1`
/// exactly, over representative CNN stage shapes.
#[test]
fn test_destination_extent_law() {
    // (srcHW, kernel, stride, dilation, pads, expected dstHW)
    let cases = [
        ((224, 224), 7, 2, 1, (3, 3, 3, 3), (112, 112)),
        ((56, 56), 3, 1, 1, (1, 1, 1, 1), (56, 56)),
        ((56, 48), 3, 1, 1, (1, 1, 0, 1), (55, 48)),
        ((14, 14), 3, 1, 2, (2, 2, 2, 2), (14, 14)),
        ((8, 8), 2, 1, 1, (0, 0, 0, 0), (7, 7)),
        ((10, 10), 1, 1, 1, (0, 0, 0, 0), (10, 10)),
    ];
    for ((src_h, src_w), k, stride, dilation, (py, px, ph, pw), (dst_h, dst_w)) in cases {
        let p = ConvParam {
            src_c: 4,
            src_h,
            src_w,
            dst_c: 4,
            kernel_y: k,
            kernel_x: k,
            stride_y: stride,
            stride_x: stride,
            dilation_y: dilation,
            dilation_x: dilation,
            pad_y: py,
            pad_x: px,
            pad_h: ph,
            pad_w: pw,
            ..ConvParam::default()
        };
        assert_eq!(p.dst_h(), dst_h, "height law broke for {src_h}x{src_w} k{k}");
        assert_eq!(p.dst_w(), dst_w, "width law broke for {src_h}x{src_w} k{k}");
    }
}

// ============================================================================
// End-to-end through the dispatcher
// ============================================================================

#[test]
fn test_dispatched_forward_runs_both_paths() {
    let mut seed = 0xc0ffee;
    for p in [
        resnet_shape(),
        ConvParam { stride_y: 2, stride_x: 2, ..resnet_shape() },
    ] {
        let mut conv = Convolution::new(&p).unwrap();
        let mut weight = vec![0.0f32; p.weight_size()];
        let mut src = vec![0.0f32; p.src_image_size()];
        pseudo_fill(&mut weight, &mut seed);
        pseudo_fill(&mut src, &mut seed);
        conv.set_params(&weight, None, Activation::Relu).unwrap();

        let mut buf = vec![0.0f32; conv.external_buffer_size()];
        let mut dst = vec![0.0f32; p.dst_image_size()];
        conv.forward(&src, &mut buf, &mut dst).unwrap();

        assert!(dst.iter().all(|v| v.is_finite()), "{} path produced non-finite output", conv.algorithm());
        assert!(dst.iter().all(|v| *v >= 0.0), "ReLU output must be non-negative");
        assert!(dst.iter().any(|v| *v > 0.0), "output is all zeros, forward did nothing");
    }
}
