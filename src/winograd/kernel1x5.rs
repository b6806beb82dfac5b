//! Transforms for the 1x5 kernel with a 1x4 output block.
//!
//! One-dimensional variant over an eight-wide strip; eight transformed
//! slots per tile.

use super::driver;
use crate::param::ConvParam;

const R36: f32 = 1.0 / 36.0;
const R48: f32 = 1.0 / 48.0;
const R120: f32 = 1.0 / 120.0;
const R720: f32 = 1.0 / 720.0;

fn filter(g: &[f32; 5]) -> [f32; 8] {
    let a0 = g[0] + g[2] + g[4];
    let a1 = g[1] + g[3];
    let b0 = g[0] + 4.0 * (g[2] + 4.0 * g[4]);
    let b1 = 2.0 * (g[1] + 4.0 * g[3]);
    let c0 = g[0] + 9.0 * (g[2] + 9.0 * g[4]);
    let c1 = 3.0 * (g[1] + 9.0 * g[3]);
    [
        R36 * g[0],
        R48 * (a0 + a1),
        R48 * (a0 - a1),
        -R120 * (b0 + b1),
        -R120 * (b0 - b1),
        R720 * (c0 + c1),
        R720 * (c0 - c1),
        g[4],
    ]
}

fn input(d: &[[f32; 8]; 1]) -> [f32; 8] {
    let s = &d[0];
    [
        36.0 * s[0] - 49.0 * s[2] + 14.0 * s[4] - s[6],
        36.0 * (s[2] + s[1]) - 13.0 * (s[4] + s[3]) + s[6] + s[5],
        36.0 * (s[2] - s[1]) - 13.0 * (s[4] - s[3]) + s[6] - s[5],
        9.0 * (s[2] + 2.0 * s[1]) - 10.0 * (s[4] + 2.0 * s[3]) + s[6] + 2.0 * s[5],
        9.0 * (s[2] - 2.0 * s[1]) - 10.0 * (s[4] - 2.0 * s[3]) + s[6] - 2.0 * s[5],
        4.0 * (s[2] + 3.0 * s[1]) - 5.0 * (s[4] + 3.0 * s[3]) + s[6] + 3.0 * s[5],
        4.0 * (s[2] - 3.0 * s[1]) - 5.0 * (s[4] - 3.0 * s[3]) + s[6] - 3.0 * s[5],
        -36.0 * s[1] + 49.0 * s[3] - 14.0 * s[5] + s[7],
    ]
}

fn output(m: &[f32; 8]) -> [[f32; 4]; 1] {
    [[
        m[0] + m[1] + m[2] + m[3] + m[4] + m[5] + m[6],
        m[1] - m[2] + 2.0 * (m[3] - m[4]) + 3.0 * (m[5] - m[6]),
        m[1] + m[2] + 4.0 * (m[3] + m[4]) + 9.0 * (m[5] + m[6]),
        m[1] - m[2] + 8.0 * (m[3] - m[4]) + 27.0 * (m[5] - m[6]) + m[7],
    ]]
}

pub(super) fn set_filter(src: &[f32], size: usize, dst: &mut [f32], trans: bool) {
    driver::set_filter::<5, 8>(src, size, dst, trans, filter);
}

pub(super) fn set_input(p: &ConvParam, src: &[f32], dst: &mut [f32], dst_stride: usize) {
    driver::set_input::<1, 8, 8>(p, 1, 4, src, dst, dst_stride, input);
}

pub(super) fn set_output(p: &ConvParam, src: &[f32], src_stride: usize, dst: &mut [f32]) {
    driver::set_output::<1, 4, 8>(p, src, src_stride, dst, output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn conv1d(d: &[f32; 8], g: &[f32; 5]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (i, o) in out.iter_mut().enumerate() {
            for (k, gv) in g.iter().enumerate() {
                *o += d[i + k] * gv;
            }
        }
        out
    }

    #[test]
    fn test_pipeline_matches_direct_convolution() {
        let d = [[0.3, -0.8, 1.4, 0.2, -1.1, 0.9, 0.6, -0.5]];
        let g = [0.25, -0.5, 1.0, 0.75, -0.125];
        let f = filter(&g);
        let v = input(&d);
        let mut m = [0.0f32; 8];
        for (slot, (fv, vv)) in f.iter().zip(&v).enumerate() {
            m[slot] = fv * vv;
        }
        let got = output(&m)[0];
        let want = conv1d(&d[0], &g);
        for (a, b) in got.iter().zip(&want) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_delta_kernel_shifts_window() {
        let d = [[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]];
        let g = [0.0, 0.0, 1.0, 0.0, 0.0];
        let f = filter(&g);
        let v = input(&d);
        let mut m = [0.0f32; 8];
        for (slot, (fv, vv)) in f.iter().zip(&v).enumerate() {
            m[slot] = fv * vv;
        }
        let got = output(&m)[0];
        for (a, b) in got.iter().zip(&[3.0f32, 4.0, 5.0, 6.0]) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4);
        }
    }
}
