//! Transforms for the 2x2 kernel with 2x2 and 4x4 output blocks.
//!
//! Both variants separate into one-dimensional row operations applied first
//! down the patch columns and then across the intermediate rows.

use super::driver;
use crate::param::ConvParam;

// ============================================================================
// 2x2 output block (3x3 transformed domain)
// ============================================================================

fn filter_row3(g: &[f32; 2]) -> [f32; 3] {
    [g[0], g[0] + g[1], g[1]]
}

fn input_row3(s: &[f32; 3]) -> [f32; 3] {
    [s[0] - s[1], s[1], s[2] - s[1]]
}

fn output_row3(m: &[f32; 3]) -> [f32; 2] {
    [m[0] + m[1], m[1] + m[2]]
}

fn filter_block2x2(g: &[f32; 4]) -> [f32; 9] {
    let mut tmp = [[0.0f32; 2]; 3];
    for j in 0..2 {
        let t = filter_row3(&[g[j], g[2 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [0.0f32; 9];
    for (i, row) in tmp.iter().enumerate() {
        out[i * 3..(i + 1) * 3].copy_from_slice(&filter_row3(row));
    }
    out
}

fn input_block2x2(d: &[[f32; 3]; 3]) -> [f32; 9] {
    let mut tmp = [[0.0f32; 3]; 3];
    for j in 0..3 {
        let t = input_row3(&[d[0][j], d[1][j], d[2][j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [0.0f32; 9];
    for (i, row) in tmp.iter().enumerate() {
        out[i * 3..(i + 1) * 3].copy_from_slice(&input_row3(row));
    }
    out
}

fn output_block2x2(m: &[f32; 9]) -> [[f32; 2]; 2] {
    let mut tmp = [[0.0f32; 3]; 2];
    for j in 0..3 {
        let t = output_row3(&[m[j], m[3 + j], m[6 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    [output_row3(&tmp[0]), output_row3(&tmp[1])]
}

pub(super) fn set_filter_block2x2(src: &[f32], size: usize, dst: &mut [f32], trans: bool) {
    driver::set_filter::<4, 9>(src, size, dst, trans, filter_block2x2);
}

pub(super) fn set_input_block2x2(p: &ConvParam, src: &[f32], dst: &mut [f32], dst_stride: usize) {
    driver::set_input::<3, 3, 9>(p, 2, 2, src, dst, dst_stride, input_block2x2);
}

pub(super) fn set_output_block2x2(p: &ConvParam, src: &[f32], src_stride: usize, dst: &mut [f32]) {
    driver::set_output::<2, 2, 9>(p, src, src_stride, dst, output_block2x2);
}

// ============================================================================
// 4x4 output block (5x5 transformed domain)
// ============================================================================

const R2: f32 = 1.0 / 2.0;
const R3: f32 = 1.0 / 3.0;
const R6: f32 = 1.0 / 6.0;

fn filter_row5(g: &[f32; 2]) -> [f32; 5] {
    [
        R2 * g[0],
        -R2 * (g[0] + g[1]),
        R6 * (g[1] - g[0]),
        R6 * g[0] + R3 * g[1],
        g[1],
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

fn output_row5(m: &[f32; 5]) -> [f32; 4] {
    [
        m[0] + m[1] + m[2] + m[3],
        m[1] - m[2] + 2.0 * m[3],
        m[1] + m[2] + 4.0 * m[3],
        m[1] - m[2] + 8.0 * m[3] + m[4],
    ]
}

fn filter_block4x4(g: &[f32; 4]) -> [f32; 25] {
    let mut tmp = [[0.0f32; 2]; 5];
    for j in 0..2 {
        let t = filter_row5(&[g[j], g[2 + j]]);
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

fn input_block4x4(d: &[[f32; 5]; 5]) -> [f32; 25] {
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

fn output_block4x4(m: &[f32; 25]) -> [[f32; 4]; 4] {
    let mut tmp = [[0.0f32; 5]; 4];
    for j in 0..5 {
        let t = output_row5(&[m[j], m[5 + j], m[10 + j], m[15 + j], m[20 + j]]);
        for (i, row) in tmp.iter_mut().enumerate() {
            row[j] = t[i];
        }
    }
    let mut out = [[0.0f32; 4]; 4];
    for (i, row) in tmp.iter().enumerate() {
        out[i] = output_row5(row);
    }
    out
}

pub(super) fn set_filter_block4x4(src: &[f32], size: usize, dst: &mut [f32], trans: bool) {
    driver::set_filter::<4, 25>(src, size, dst, trans, filter_block4x4);
}

pub(super) fn set_input_block4x4(p: &ConvParam, src: &[f32], dst: &mut [f32], dst_stride: usize) {
    driver::set_input::<5, 5, 25>(p, 4, 4, src, dst, dst_stride, input_block4x4);
}

pub(super) fn set_output_block4x4(p: &ConvParam, src: &[f32], src_stride: usize, dst: &mut [f32]) {
    driver::set_output::<4, 4, 25>(p, src, src_stride, dst, output_block4x4);
}
