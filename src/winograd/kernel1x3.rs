//! Transforms for the 1x3 kernel with a 1x4 output block.
//!
//! One-dimensional variant: rows never overlap vertically, so the patch is a
//! single six-wide strip and the transformed domain has six slots.

use super::driver;
use crate::param::ConvParam;

const R4: f32 = 1.0 / 4.0;
const R6: f32 = 1.0 / 6.0;
const R12: f32 = 1.0 / 12.0;
const R24: f32 = 1.0 / 24.0;

fn filter(g: &[f32; 3]) -> [f32; 6] {
    [
        R4 * g[0],
        -R6 * (g[0] + g[1] + g[2]),
        -R6 * (g[0] - g[1] + g[2]),
        R24 * g[0] + R12 * g[1] + R6 * g[2],
        R24 * g[0] - R12 * g[1] + R6 * g[2],
        g[2],
    ]
}

fn input(d: &[[f32; 6]; 1]) -> [f32; 6] {
    let s = &d[0];
    [
        4.0 * s[0] - 5.0 * s[2] + s[4],
        -4.0 * s[1] - 4.0 * s[2] + s[3] + s[4],
        4.0 * s[1] - 4.0 * s[2] - s[3] + s[4],
        -2.0 * s[1] - s[2] + 2.0 * s[3] + s[4],
        2.0 * s[1] - s[2] - 2.0 * s[3] + s[4],
        4.0 * s[1] - 5.0 * s[3] + s[5],
    ]
}

fn output(m: &[f32; 6]) -> [[f32; 4]; 1] {
    [[
        m[0] + m[1] + m[2] + m[3] + m[4],
        m[1] - m[2] + 2.0 * m[3] - 2.0 * m[4],
        m[1] + m[2] + 4.0 * m[3] + 4.0 * m[4],
        m[1] - m[2] + 8.0 * m[3] - 8.0 * m[4] + m[5],
    ]]
}

pub(super) fn set_filter(src: &[f32], size: usize, dst: &mut [f32], trans: bool) {
    driver::set_filter::<3, 6>(src, size, dst, trans, filter);
}

pub(super) fn set_input(p: &ConvParam, src: &[f32], dst: &mut [f32], dst_stride: usize) {
    driver::set_input::<1, 6, 6>(p, 1, 4, src, dst, dst_stride, input);
}

pub(super) fn set_output(p: &ConvParam, src: &[f32], src_stride: usize, dst: &mut [f32]) {
    driver::set_output::<1, 4, 6>(p, src, src_stride, dst, output);
}
