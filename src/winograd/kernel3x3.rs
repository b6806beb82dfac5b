//! Transforms for the 3x3 kernel with 2x2, 3x3 and 4x4 output blocks.
//!
//! The workhorse of the engine. All three variants separate into
//! one-dimensional row operations applied down the patch columns first, then
//! across the intermediate rows; only the row operations differ.

use super::driver;
use crate::param::ConvParam;

const R2: f32 = 1.0 / 2.0;
const R4: f32 = 1.0 / 4.0;
const R6: f32 = 1.0 / 6.0;
const R12: f32 = 1.0 / 12.0;
const R24: f32 = 1.0 / 24.0;

// ============================================================================
// 2x2 output block (4x4 transformed domain)
// ============================================================================

fn filter_row4(g: &[f32; 3]) -> [f32; 4] {
    [
        g[0],
        R2 * (g[0] + g[1] + g[2]),
        R2 * (g[0] - g[1] + g[2]),
        g[2],
    ]
}

fn input_row4(s: &[f32; 4]) -> [f32; 4] {
    [s[0] - s[2], s[1] + s[2], s[2] - s[1], s[1] - s[3]]
}

fn output_row4(m: &[f32; 4]) -> [f32; 2] {
    [m[0] + m[1] + m[2], m[1] - m[2] - m[3]]
}

fn filter_block2x2(g: &[f32; 9]) -> [f32; 16] {
    let mut tmp = [[0.0f32; 3]; 4];
    for j in 0..3 {
        let t = filter_row4(&[g[j], g[3 + j], g[6 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [0.0f32; 16];
    for (i, row) in tmp.iter().enumerate() {
        out[i * 4..(i + 1) * 4].copy_from_slice(&filter_row4(row));
    }
    out
}

fn input_block2x2(d: &[[f32; 4]; 4]) -> [f32; 16] {
    let mut tmp = [[0.0f32; 4]; 4];
    for j in 0..4 {
        let t = input_row4(&[d[0][j], d[1][j], d[2][j], d[3][j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [0.0f32; 16];
    for (i, row) in tmp.iter().enumerate() {
        out[i * 4..(i + 1) * 4].copy_from_slice(&input_row4(row));
    }
    out
}

fn output_block2x2(m: &[f32; 16]) -> [[f32; 2]; 2] {
    let mut tmp = [[0.0f32; 4]; 2];
    for j in 0..4 {
        let t = output_row4(&[m[j], m[4 + j], m[8 + j], m[12 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    [output_row4(&tmp[0]), output_row4(&tmp[1])]
}

pub(super) fn set_filter_block2x2(src: &[f32], size: usize, dst: &mut [f32], trans: bool) {
    driver::set_filter::<9, 16>(src, size, dst, trans, filter_block2x2);
}

pub(super) fn set_input_block2x2(p: &ConvParam, src: &[f32], dst: &mut [f32], dst_stride: usize) {
    driver::set_input::<4, 4, 16>(p, 2, 2, src, dst, dst_stride, input_block2x2);
}

pub(super) fn set_output_block2x2(p: &ConvParam, src: &[f32], src_stride: usize, dst: &mut [f32]) {
    driver::set_output::<2, 2, 16>(p, src, src_stride, dst, output_block2x2);
}

// ============================================================================
// 3x3 output block (5x5 transformed domain)
// ============================================================================

fn filter_row5(g: &[f32; 3]) -> [f32; 5] {
    [
        R2 * g[0],
        -R2 * (g[0] + g[1] + g[2]),
        R6 * (g[1] - g[0] - g[2]),
        R6 * (g[0] + 2.0 * g[1] + 4.0 * g[2]),
        g[2],
    ]
}

fn input_row5(s: &[f32; 5]) -> [f32; 5] {
    [
        2.0 * s[0] - s[1] - 2.0 * s[2] + s[3],
        s[3] - 2.0 * s[1] - s[2],
        2.0 * s[1] - 3.0 * s[2] + s[3],
        s[3] - s[1],
        2.0 * s[1] - s[2] - 2.0 * s[3] + s[4],
    ]
}

fn output_row5(m: &[f32; 5]) -> [f32; 3] {
    [
        m[0] + m[1] + m[2] + m[3],
        m[1] - m[2] + 2.0 * m[3],
        m[1] + m[2] + 4.0 * m[3] + m[4],
    ]
}

fn filter_block3x3(g: &[f32; 9]) -> [f32; 25] {
    let mut tmp = [[0.0f32; 3]; 5];
    for j in 0..3 {
        let t = filter_row5(&[g[j], g[3 + j], g[6 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [0.0f32; 25];
    for (i, row) in tmp.iter().enumerate() {
        out[i * 5..(i + 1) * 5].copy_from_slice(&filter_row5(row));
    }
    out
}

fn input_block3x3(d: &[[f32; 5]; 5]) -> [f32; 25] {
    let mut tmp = [[0.0f32; 5]; 5];
    for j in 0..5 {
        let t = input_row5(&[d[0][j], d[1][j], d[2][j], d[3][j], d[4][j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [0.0f32; 25];
    for (i, row) in tmp.iter().enumerate() {
        out[i * 5..(i + 1) * 5].copy_from_slice(&input_row5(row));
    }
    out
}

fn output_block3x3(m: &[f32; 25]) -> [[f32; 3]; 3] {
    let mut tmp = [[0.0f32; 5]; 3];
    for j in 0..5 {
        let t = output_row5(&[m[j], m[5 + j], m[10 + j], m[15 + j], m[20 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    [output_row5(&tmp[0]), output_row5(&tmp[1]), output_row5(&tmp[2])]
}

pub(super) fn set_filter_block3x3(src: &[f32], size: usize, dst: &mut [f32], trans: bool) {
    driver::set_filter::<9, 25>(src, size, dst, trans, filter_block3x3);
}

pub(super) fn set_input_block3x3(p: &ConvParam, src: &[f32], dst: &mut [f32], dst_stride: usize) {
    driver::set_input::<5, 5, 25>(p, 3, 3, src, dst, dst_stride, input_block3x3);
}

pub(super) fn set_output_block3x3(p: &ConvParam, src: &[f32], src_stride: usize, dst: &mut [f32]) {
    driver::set_output::<3, 3, 25>(p, src, src_stride, dst, output_block3x3);
}

// ============================================================================
// 4x4 output block (6x6 transformed domain)
// ============================================================================

fn filter_row6(g: &[f32; 3]) -> [f32; 6] {
    [
        R4 * g[0],
        -R6 * (g[0] + g[1] + g[2]),
        -R6 * (g[0] - g[1] + g[2]),
        R24 * g[0] + R12 * g[1] + R6 * g[2],
        R24 * g[0] - R12 * g[1] + R6 * g[2],
        g[2],
    ]
}

fn input_row6(s: &[f32; 6]) -> [f32; 6] {
    [
        4.0 * s[0] - 5.0 * s[2] + s[4],
        -4.0 * s[1] - 4.0 * s[2] + s[3] + s[4],
        4.0 * s[1] - 4.0 * s[2] - s[3] + s[4],
        -2.0 * s[1] - s[2] + 2.0 * s[3] + s[4],
        2.0 * s[1] - s[2] - 2.0 * s[3] + s[4],
        4.0 * s[1] - 5.0 * s[3] + s[5],
    ]
}

fn output_row6(m: &[f32; 6]) -> [f32; 4] {
    [
        m[0] + m[1] + m[2] + m[3] + m[4],
        m[1] - m[2] + 2.0 * m[3] - 2.0 * m[4],
        m[1] + m[2] + 4.0 * m[3] + 4.0 * m[4],
        m[1] - m[2] + 8.0 * m[3] - 8.0 * m[4] + m[5],
    ]
}

fn filter_block4x4(g: &[f32; 9]) -> [f32; 36] {
    let mut tmp = [[0.0f32; 3]; 6];
    for j in 0..3 {
        let t = filter_row6(&[g[j], g[3 + j], g[6 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [0.0f32; 36];
    for (i, row) in tmp.iter().enumerate() {
        out[i * 6..(i + 1) * 6].copy_from_slice(&filter_row6(row));
    }
    out
}

fn input_block4x4(d: &[[f32; 6]; 6]) -> [f32; 36] {
    let mut tmp = [[0.0f32; 6]; 6];
    for j in 0..6 {
        let t = input_row6(&[d[0][j], d[1][j], d[2][j], d[3][j], d[4][j], d[5][j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [0.0f32; 36];
    for (i, row) in tmp.iter().enumerate() {
        out[i * 6..(i + 1) * 6].copy_from_slice(&input_row6(row));
    }
    out
}

fn output_block4x4(m: &[f32; 36]) -> [[f32; 4]; 4] {
    let mut tmp = [[0.0f32; 6]; 4];
    for j in 0..6 {
        let t = output_row6(&[m[j], m[6 + j], m[12 + j], m[18 + j], m[24 + j], m[30 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [[0.0f32; 4]; 4];
    for (i, row) in tmp.iter().enumerate() {
        out[i] = output_row6(row);
    }
    out
}

pub(super) fn set_filter_block4x4(src: &[f32], size: usize, dst: &mut [f32], trans: bool) {
    driver::set_filter::<9, 36>(src, size, dst, trans, filter_block4x4);
}

pub(super) fn set_input_block4x4(p: &ConvParam, src: &[f32], dst: &mut [f32], dst_stride: usize) {
    driver::set_input::<6, 6, 36>(p, 4, 4, src, dst, dst_stride, input_block4x4);
}

pub(super) fn set_output_block4x4(p: &ConvParam, src: &[f32], src_stride: usize, dst: &mut [f32]) {
    driver::set_output::<4, 4, 36>(p, src, src_stride, dst, output_block4x4);
}
