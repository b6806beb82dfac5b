#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
//! Benchmark comparing the minimal-filtering path against direct lowering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trueno_conv::{Activation, ConvParam, Convolution, GemmConvolution, TensorFormat, WinogradConvolution};

fn fill(data: &mut [f32], seed: &mut u32) {
    for v in data.iter_mut() {
        *seed ^= *seed << 13;
        *seed ^= *seed >> 17;
        *seed ^= *seed << 5;
        *v = (*seed as f32 / u32::MAX as f32) - 0.5;
    }
}

fn stage(src_c: usize, src_h: usize, src_w: usize) -> ConvParam {
    ConvParam {
        src_c,
        src_h,
        src_w,
        dst_c: src_c,
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

fn paths_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("convolution_paths");

    for p in [stage(32, 56, 48), stage(64, 28, 28)] {
        let mut seed = 0xfeed;
        let mut weight = vec![0.0f32; p.weight_size()];
        let mut src = vec![0.0f32; p.src_image_size()];
        fill(&mut weight, &mut seed);
        fill(&mut src, &mut seed);
        let id = format!("{}x{}x{}", p.src_h, p.src_w, p.src_c);

        let mut fast = WinogradConvolution::new(&p).unwrap();
        fast.set_params(&weight, None, Activation::Identity).unwrap();
        let mut buf = vec![0.0f32; fast.external_buffer_size()];
        let mut dst = vec![0.0f32; p.dst_image_size()];
        group.bench_with_input(BenchmarkId::new("winograd", &id), &p, |b, _| {
            b.iter(|| {
                fast.forward(black_box(&src), &mut buf, &mut dst).unwrap();
            });
        });

        let mut direct = GemmConvolution::new(&p).unwrap();
        direct.set_params(&weight, None, Activation::Identity).unwrap();
        let mut buf = vec![0.0f32; direct.external_buffer_size()];
        let mut dst = vec![0.0f32; p.dst_image_size()];
        group.bench_with_input(BenchmarkId::new("gemm", &id), &p, |b, _| {
            b.iter(|| {
                direct.forward(black_box(&src), &mut buf, &mut dst).unwrap();
            });
        });
    }

    group.finish();
}

fn dispatcher_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatched_forward");

    // Pointwise and strided shapes take the direct path; the 3x3 stage
    // takes the minimal-filtering path.
    let shapes = [
        ("3x3_unit", stage(32, 28, 28)),
        ("3x3_strided", ConvParam { stride_y: 2, stride_x: 2, ..stage(32, 28, 28) }),
        (
            "1x1_pointwise",
            ConvParam {
                kernel_y: 1,
                kernel_x: 1,
                pad_y: 0,
                pad_x: 0,
                pad_h: 0,
                pad_w: 0,
                ..stage(32, 28, 28)
            },
        ),
    ];
    for (name, p) in shapes {
        let mut seed = 0xdead;
        let mut weight = vec![0.0f32; p.weight_size()];
        let mut src = vec![0.0f32; p.src_image_size()];
        fill(&mut weight, &mut seed);
        fill(&mut src, &mut seed);

        let mut conv = Convolution::new(&p).unwrap();
        conv.set_params(&weight, None, Activation::Relu).unwrap();
        let mut buf = vec![0.0f32; conv.external_buffer_size()];
        let mut dst = vec![0.0f32; p.dst_image_size()];

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{name}_{}", conv.algorithm())),
            &p,
            |b, _| {
                b.iter(|| {
                    conv.forward(black_box(&src), &mut buf, &mut dst).unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, paths_benchmark, dispatcher_benchmark);
criterion_main!(benches);
