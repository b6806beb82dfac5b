//! Shared walk logic for the three minimal-filtering stages.
//!
//! Every kernel variant reduces to three pure transforms over fixed-size
//! arrays: weight tap vector to slot vector, source patch to slot vector,
//! and slot vector back to an output block. The drivers here own everything
//! around those transforms: the tile walk over the destination grid, the
//! zero-filled gather at image borders (which is also how padding is
//! realized), and the scatter into the slot-major scratch layout
//! `[slot][channel-tile]` shared by all variants and both tensor formats.

use crate::param::ConvParam;

/// Tile grid covering a `dst_h x dst_w` destination with the given block.
pub(super) fn tile_grid(dst_h: usize, dst_w: usize, block_h: usize, block_w: usize) -> (usize, usize) {
    (dst_h.div_ceil(block_h), dst_w.div_ceil(block_w))
}

/// Transforms every source/destination channel pair of the weight tensor.
///
/// `size` is `srcC * dstC`. Planar weights keep each tap window contiguous;
/// interleaved weights hold tap `k` of pair `i` at `src[k * size + i]`. Both
/// land in the same slot-major destination `dst[k * size + i]`.
pub(super) fn set_filter<const TAPS: usize, const COUNT: usize>(
    src: &[f32],
    size: usize,
    dst: &mut [f32],
    trans: bool,
    transform: fn(&[f32; TAPS]) -> [f32; COUNT],
) {
    let mut taps = [0.0f32; TAPS];
    for i in 0..size {
        if trans {
            for (k, t) in taps.iter_mut().enumerate() {
                *t = src[k * size + i];
            }
        } else {
            taps.copy_from_slice(&src[i * TAPS..(i + 1) * TAPS]);
        }
        for (k, v) in transform(&taps).iter().enumerate() {
            dst[k * size + i] = *v;
        }
    }
}

fn gather_planar<const PH: usize, const PW: usize>(
    plane: &[f32],
    src_h: usize,
    src_w: usize,
    sy0: isize,
    sx0: isize,
    patch: &mut [[f32; PW]; PH],
) {
    let interior_x = sx0 >= 0 && sx0 + PW as isize <= src_w as isize;
    for (r, row) in patch.iter_mut().enumerate() {
        let sy = sy0 + r as isize;
        if sy < 0 || sy >= src_h as isize {
            row.fill(0.0);
            continue;
        }
        let base = sy as usize * src_w;
        if interior_x {
            let at = base + sx0 as usize;
            row.copy_from_slice(&plane[at..at + PW]);
        } else {
            for (cc, v) in row.iter_mut().enumerate() {
                let sx = sx0 + cc as isize;
                *v = if sx < 0 || sx >= src_w as isize {
                    0.0
                } else {
                    plane[base + sx as usize]
                };
            }
        }
    }
}

fn gather_interleaved<const PH: usize, const PW: usize>(
    src: &[f32],
    p: &ConvParam,
    channel: usize,
    sy0: isize,
    sx0: isize,
    patch: &mut [[f32; PW]; PH],
) {
    for (r, row) in patch.iter_mut().enumerate() {
        let sy = sy0 + r as isize;
        if sy < 0 || sy >= p.src_h as isize {
            row.fill(0.0);
            continue;
        }
        let base = sy as usize * p.src_w;
        for (cc, v) in row.iter_mut().enumerate() {
            let sx = sx0 + cc as isize;
            *v = if sx < 0 || sx >= p.src_w as isize {
                0.0
            } else {
                src[(base + sx as usize) * p.src_c + channel]
            };
        }
    }
}

/// Transforms one source image into the slot-major scratch buffer.
///
/// Patch origins walk the destination tile grid offset by the begin padding;
/// out-of-image rows and columns read as zero, which covers both explicit
/// padding and the ragged last row/column of the grid in one mechanism.
pub(super) fn set_input<const PH: usize, const PW: usize, const COUNT: usize>(
    p: &ConvParam,
    block_h: usize,
    block_w: usize,
    src: &[f32],
    dst: &mut [f32],
    dst_stride: usize,
    transform: fn(&[[f32; PW]; PH]) -> [f32; COUNT],
) {
    let (tile_h, tile_w) = tile_grid(p.dst_h(), p.dst_w(), block_h, block_w);
    let n_tiles = tile_h * tile_w;
    let mut patch = [[0.0f32; PW]; PH];
    if p.trans() {
        for tr in 0..tile_h {
            let sy0 = (tr * block_h) as isize - p.pad_y as isize;
            for tc in 0..tile_w {
                let sx0 = (tc * block_w) as isize - p.pad_x as isize;
                let t = tr * tile_w + tc;
                for c in 0..p.src_c {
                    gather_interleaved(src, p, c, sy0, sx0, &mut patch);
                    for (k, v) in transform(&patch).iter().enumerate() {
                        dst[k * dst_stride + t * p.src_c + c] = *v;
                    }
                }
            }
        }
    } else {
        let plane_size = p.src_h * p.src_w;
        for c in 0..p.src_c {
            let plane = &src[c * plane_size..(c + 1) * plane_size];
            for tr in 0..tile_h {
                let sy0 = (tr * block_h) as isize - p.pad_y as isize;
                for tc in 0..tile_w {
                    let sx0 = (tc * block_w) as isize - p.pad_x as isize;
                    let t = tr * tile_w + tc;
                    gather_planar(plane, p.src_h, p.src_w, sy0, sx0, &mut patch);
                    for (k, v) in transform(&patch).iter().enumerate() {
                        dst[k * dst_stride + c * n_tiles + t] = *v;
                    }
                }
            }
        }
    }
}

/// Transforms the slot-major product buffer back into the destination image.
///
/// Blocks on the ragged right and bottom edges are clipped to the image.
pub(super) fn set_output<const BH: usize, const BW: usize, const COUNT: usize>(
    p: &ConvParam,
    src: &[f32],
    src_stride: usize,
    dst: &mut [f32],
    transform: fn(&[f32; COUNT]) -> [[f32; BW]; BH],
) {
    let dst_h = p.dst_h();
    let dst_w = p.dst_w();
    let (tile_h, tile_w) = tile_grid(dst_h, dst_w, BH, BW);
    let n_tiles = tile_h * tile_w;
    let mut slots = [0.0f32; COUNT];
    if p.trans() {
        for tr in 0..tile_h {
            for tc in 0..tile_w {
                let t = tr * tile_w + tc;
                let (y0, x0) = (tr * BH, tc * BW);
                let rows = BH.min(dst_h - y0);
                let cols = BW.min(dst_w - x0);
                for d in 0..p.dst_c {
                    for (k, v) in slots.iter_mut().enumerate() {
                        *v = src[k * src_stride + t * p.dst_c + d];
                    }
                    let block = transform(&slots);
                    for (r, row) in block.iter().enumerate().take(rows) {
                        let base = ((y0 + r) * dst_w + x0) * p.dst_c + d;
                        for (cc, v) in row.iter().enumerate().take(cols) {
                            dst[base + cc * p.dst_c] = *v;
                        }
                    }
                }
            }
        }
    } else {
        let plane_size = dst_h * dst_w;
        for d in 0..p.dst_c {
            let plane = &mut dst[d * plane_size..(d + 1) * plane_size];
            for tr in 0..tile_h {
                for tc in 0..tile_w {
                    let t = tr * tile_w + tc;
                    let (y0, x0) = (tr * BH, tc * BW);
                    let rows = BH.min(dst_h - y0);
                    let cols = BW.min(dst_w - x0);
                    for (k, v) in slots.iter_mut().enumerate() {
                        *v = src[k * src_stride + d * n_tiles + t];
                    }
                    let block = transform(&slots);
                    for (r, row) in block.iter().enumerate().take(rows) {
                        let base = (y0 + r) * dst_w + x0;
                        plane[base..base + cols].copy_from_slice(&row[..cols]);
                    }
                }
            }
        }
    }
}
