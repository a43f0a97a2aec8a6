use crate::api::frame::*;
use crate::def::*;

/* neutral pel when a neighbor row/column is unavailable */
const BASE_PEL: pel = (1 << (BIT_DEPTH - 1)) as pel;

/// Gather the reconstruction neighborhood of a w x h block at (x, y):
/// one row above and one column left, replicated from the plane borders.
/// Returns (above_available, left_available).
pub(crate) fn ipred_edges(
    plane: &Plane,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    above: &mut [pel],
    left: &mut [pel],
) -> (bool, bool) {
    let avail_up = y > 0;
    let avail_le = x > 0;

    if avail_up {
        for i in 0..w {
            above[i] = plane.pel_clamped((x + i) as isize, y as isize - 1);
        }
    } else {
        for v in above[..w].iter_mut() {
            *v = BASE_PEL;
        }
    }

    if avail_le {
        for i in 0..h {
            left[i] = plane.pel_clamped(x as isize - 1, (y + i) as isize);
        }
    } else {
        for v in left[..h].iter_mut() {
            *v = BASE_PEL;
        }
    }

    (avail_up, avail_le)
}

pub(crate) fn intra_pred(
    mode: PredictionMode,
    above: &[pel],
    left: &[pel],
    avail_up: bool,
    avail_le: bool,
    dst: &mut [pel],
    w: usize,
    h: usize,
) {
    match mode {
        PredictionMode::V_PRED => ipred_vert(above, dst, w, h),
        PredictionMode::H_PRED => ipred_hor(left, dst, w, h),
        PredictionMode::DC_PRED => ipred_dc(above, left, avail_up, avail_le, dst, w, h),
        PredictionMode::SMOOTH_PRED => ipred_smooth(above, left, dst, w, h),
        _ => unreachable!("not an intra prediction mode: {:?}", mode),
    }
}

fn ipred_vert(above: &[pel], dst: &mut [pel], w: usize, h: usize) {
    for i in 0..h {
        dst[i * w..(i + 1) * w].copy_from_slice(&above[0..w]);
    }
}

fn ipred_hor(left: &[pel], dst: &mut [pel], w: usize, h: usize) {
    for i in 0..h {
        for v in dst[i * w..(i + 1) * w].iter_mut() {
            *v = left[i];
        }
    }
}

fn ipred_dc(
    above: &[pel],
    left: &[pel],
    avail_up: bool,
    avail_le: bool,
    dst: &mut [pel],
    w: usize,
    h: usize,
) {
    let dc = match (avail_up, avail_le) {
        (true, true) => {
            let mut sum = 0u32;
            for i in 0..h {
                sum += left[i] as u32;
            }
            for j in 0..w {
                sum += above[j] as u32;
            }
            ((sum + ((w + h) as u32 >> 1)) / (w + h) as u32) as pel
        }
        (true, false) => {
            let mut sum = 0u32;
            for j in 0..w {
                sum += above[j] as u32;
            }
            ((sum + (w as u32 >> 1)) >> crate::tbl::TBL_LOG2[w] as u32) as pel
        }
        (false, true) => {
            let mut sum = 0u32;
            for i in 0..h {
                sum += left[i] as u32;
            }
            ((sum + (h as u32 >> 1)) >> crate::tbl::TBL_LOG2[h] as u32) as pel
        }
        (false, false) => BASE_PEL,
    };

    for v in dst[..w * h].iter_mut() {
        *v = dc;
    }
}

/* quadratic-ish falloff from 256 at the edge to 64 at the far side */
#[inline]
fn sm_weight(d: usize, i: usize) -> u32 {
    if d == 1 {
        160
    } else {
        64 + (192 * (d - 1 - i) as u32) / (d - 1) as u32
    }
}

fn ipred_smooth(above: &[pel], left: &[pel], dst: &mut [pel], w: usize, h: usize) {
    let below = left[h - 1] as u32;
    let right = above[w - 1] as u32;

    for r in 0..h {
        let wv = sm_weight(h, r);
        for c in 0..w {
            let wh = sm_weight(w, c);
            let v = wv * above[c] as u32
                + (256 - wv) * below
                + wh * left[r] as u32
                + (256 - wh) * right;
            dst[r * w + c] = ((v + 256) >> 9) as pel;
        }
    }
}
