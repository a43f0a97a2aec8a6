use crate::api::frame::*;
use crate::def::*;

pub fn sad(
    src: &[pel],
    src_stride: usize,
    pred: &[pel],
    pred_stride: usize,
    w: usize,
    h: usize,
) -> u32 {
    let mut acc = 0u32;
    for j in 0..h {
        let s = &src[j * src_stride..j * src_stride + w];
        let p = &pred[j * pred_stride..j * pred_stride + w];
        for i in 0..w {
            acc += (s[i] as i32 - p[i] as i32).abs() as u32;
        }
    }
    acc
}

/* SAD of the source block at (x, y) against the reference displaced by a
 * full-pel vector, border-clamped */
pub(crate) fn sad_plane_fullpel(
    src: &Plane,
    refp: &Plane,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    mv_fullpel: Mv,
) -> u32 {
    let rx = x as isize + mv_fullpel.col as isize;
    let ry = y as isize + mv_fullpel.row as isize;
    let mut acc = 0u32;
    for j in 0..h {
        for i in 0..w {
            let s = src.pel_at(x + i, y + j) as i32;
            let r = refp.pel_clamped(rx + i as isize, ry + j as isize) as i32;
            acc += (s - r).abs() as u32;
        }
    }
    acc
}

/* whole-block sse and sum of the residual */
pub(crate) fn block_sse_sum(
    src: &[pel],
    src_stride: usize,
    pred: &[pel],
    pred_stride: usize,
    w: usize,
    h: usize,
) -> (i64, i64) {
    let mut sse = 0i64;
    let mut sum = 0i64;
    for j in 0..h {
        let s = &src[j * src_stride..j * src_stride + w];
        let p = &pred[j * pred_stride..j * pred_stride + w];
        for i in 0..w {
            let d = s[i] as i64 - p[i] as i64;
            sse += d * d;
            sum += d;
        }
    }
    (sse, sum)
}

#[inline]
pub(crate) fn variance_from_sse_sum(sse: i64, sum: i64, area_log2: usize) -> i64 {
    (sse - ((sum * sum) >> area_log2)).max(0)
}

/* residual sse and sum on the 8x8 grid covering a w x h block, row-major;
 * grids feed the per-tx-tile skip decisions */
pub(crate) fn sse_sum_8x8_grid(
    src: &[pel],
    src_stride: usize,
    pred: &[pel],
    pred_stride: usize,
    w: usize,
    h: usize,
    sse8: &mut [i64],
    sum8: &mut [i64],
) {
    let gw = w >> 3;
    for gy in 0..(h >> 3) {
        for gx in 0..gw {
            let (sse, sum) = block_sse_sum(
                &src[gy * 8 * src_stride + gx * 8..],
                src_stride,
                &pred[gy * 8 * pred_stride + gx * 8..],
                pred_stride,
                8,
                8,
            );
            sse8[gy * gw + gx] = sse;
            sum8[gy * gw + gx] = sum;
        }
    }
}

/* sum of absolute quantized coefficients */
pub(crate) fn satd_lp(qcoeff: &[i16], n: usize) -> i32 {
    let mut acc = 0i32;
    for c in &qcoeff[..n] {
        acc += (*c as i32).abs();
    }
    acc
}
