use crate::api::frame::*;
use crate::def::*;

/*****************************************************************************
 * 1/8-pel separable interpolation, 4-tap, two switchable banks.
 * Phase 0 is the identity in both banks so integer motion never filters.
 *****************************************************************************/

const MC_SHIFT: u32 = 6;
const MC_TAPS: usize = 4;

#[rustfmt::skip]
static TBL_MC_COEFF_REGULAR: [[i32; MC_TAPS]; 8] = [
    [  0, 64,  0,  0 ],
    [ -2, 58, 10, -2 ],
    [ -4, 52, 20, -4 ],
    [ -6, 46, 30, -6 ],
    [ -8, 40, 40, -8 ],
    [ -6, 30, 46, -6 ],
    [ -4, 20, 52, -4 ],
    [ -2, 10, 58, -2 ],
];

#[rustfmt::skip]
static TBL_MC_COEFF_SMOOTH: [[i32; MC_TAPS]; 8] = [
    [  0, 64,  0,  0 ],
    [  7, 43, 13,  1 ],
    [  6, 38, 18,  2 ],
    [  5, 33, 23,  3 ],
    [  4, 28, 28,  4 ],
    [  3, 23, 33,  5 ],
    [  2, 18, 38,  6 ],
    [  1, 13, 43,  7 ],
];

#[inline]
fn coeffs(filter: InterpFilter, phase: usize) -> &'static [i32; MC_TAPS] {
    match filter {
        InterpFilter::EIGHTTAP_REGULAR => &TBL_MC_COEFF_REGULAR[phase],
        InterpFilter::EIGHTTAP_SMOOTH => &TBL_MC_COEFF_SMOOTH[phase],
    }
}

#[inline]
fn clip_pel(v: i32) -> pel {
    v.max(0).min((1 << BIT_DEPTH) - 1) as pel
}

/// Motion-compensated prediction of a w x h luma block at plane position
/// (x, y) with a 1/8-pel motion vector. Off-frame taps read the replicated
/// border.
pub fn mc_block(
    refp: &Plane,
    x: usize,
    y: usize,
    mv: Mv,
    w: usize,
    h: usize,
    filter: InterpFilter,
    dst: &mut [pel],
    dst_stride: usize,
) {
    mc_block_sub(refp, x, y, mv, 3, w, h, filter, dst, dst_stride)
}

/// Chroma variant: the luma vector addresses a half-resolution plane, so the
/// fractional precision doubles to 1/16 and the phase is formed from the low
/// four bits folded to the 8-phase tables.
pub(crate) fn mc_block_chroma(
    refp: &Plane,
    x: usize,
    y: usize,
    mv: Mv,
    w: usize,
    h: usize,
    filter: InterpFilter,
    dst: &mut [pel],
    dst_stride: usize,
) {
    mc_block_sub(refp, x, y, mv, 4, w, h, filter, dst, dst_stride)
}

fn mc_block_sub(
    refp: &Plane,
    x: usize,
    y: usize,
    mv: Mv,
    frac_bits: u32,
    w: usize,
    h: usize,
    filter: InterpFilter,
    dst: &mut [pel],
    dst_stride: usize,
) {
    let frac_mask = (1 << frac_bits) - 1;
    let bx = x as isize + (mv.col as isize >> frac_bits);
    let by = y as isize + (mv.row as isize >> frac_bits);
    /* fold to the 8-phase tables */
    let fx = (((mv.col as i32 & frac_mask) << 3) >> frac_bits) as usize;
    let fy = (((mv.row as i32 & frac_mask) << 3) >> frac_bits) as usize;

    if fx == 0 && fy == 0 {
        refp.read_block(bx, by, w, h, dst, dst_stride);
        return;
    }

    if fy == 0 {
        let c = coeffs(filter, fx);
        for j in 0..h {
            for i in 0..w {
                let mut v = 1 << (MC_SHIFT - 1);
                for (t, ct) in c.iter().enumerate() {
                    v += ct * refp.pel_clamped(bx + i as isize + t as isize - 1, by + j as isize)
                        as i32;
                }
                dst[j * dst_stride + i] = clip_pel(v >> MC_SHIFT);
            }
        }
        return;
    }

    if fx == 0 {
        let c = coeffs(filter, fy);
        for j in 0..h {
            for i in 0..w {
                let mut v = 1 << (MC_SHIFT - 1);
                for (t, ct) in c.iter().enumerate() {
                    v += ct * refp.pel_clamped(bx + i as isize, by + j as isize + t as isize - 1)
                        as i32;
                }
                dst[j * dst_stride + i] = clip_pel(v >> MC_SHIFT);
            }
        }
        return;
    }

    /* two-pass: horizontal into a 16-bit intermediate, then vertical */
    let ch = coeffs(filter, fx);
    let cv = coeffs(filter, fy);
    let tmp_h = h + MC_TAPS - 1;
    let mut tmp = vec![0i32; w * tmp_h];

    for j in 0..tmp_h {
        let sy = by + j as isize - 1;
        for i in 0..w {
            let mut v = 0;
            for (t, ct) in ch.iter().enumerate() {
                v += ct * refp.pel_clamped(bx + i as isize + t as isize - 1, sy) as i32;
            }
            tmp[j * w + i] = v;
        }
    }

    for j in 0..h {
        for i in 0..w {
            let mut v = 1 << (2 * MC_SHIFT - 1);
            for (t, ct) in cv.iter().enumerate() {
                v += ct * tmp[(j + t) * w + i];
            }
            dst[j * dst_stride + i] = clip_pel(v >> (2 * MC_SHIFT));
        }
    }
}
