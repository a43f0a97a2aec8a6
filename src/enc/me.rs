use crate::api::frame::*;
use crate::def::*;
use crate::enc::sad::*;
use crate::mc::*;

/* full-pel search range, in pels */
const MAX_FULL_PEL: i16 = 1023;

/*****************************************************************************
 * mv signaling cost, closed-form bit-length model
 *****************************************************************************/
static MV_JOINT_COST: [i32; 4] = [38, 480, 492, 634];

#[inline]
fn mv_joint(d: Mv) -> usize {
    ((d.row != 0) as usize) << 1 | (d.col != 0) as usize
}

#[inline]
fn mv_comp_cost(d: i32) -> i32 {
    if d == 0 {
        return 118;
    }
    let bits = 32 - (d.abs() as u32).leading_zeros() as i32;
    246 + 512 * bits
}

/* raw signaling cost of mv against its predictor */
pub(crate) fn mv_cost(mv: Mv, ref_mv: Mv) -> i32 {
    let d = Mv::new(mv.row - ref_mv.row, mv.col - ref_mv.col);
    MV_JOINT_COST[mv_joint(d)] + mv_comp_cost(d.row as i32) + mv_comp_cost(d.col as i32)
}

/* cost weighted into rate units the rd loop adds directly */
#[inline]
pub(crate) fn mv_rate(mv: Mv, ref_mv: Mv) -> i32 {
    ((mv_cost(mv, ref_mv) as i64 * MV_COST_WEIGHT) >> 7) as i32
}

#[inline]
fn clamp_fullpel(v: i32) -> i16 {
    v.max(-(MAX_FULL_PEL as i32)).min(MAX_FULL_PEL as i32) as i16
}

/* search objective: sad plus a small mv-rate tie-break */
#[inline]
fn fullpel_err(
    src: &Plane,
    refp: &Plane,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    fmv: Mv,
    ref_mv: Mv,
) -> u32 {
    let sad = sad_plane_fullpel(src, refp, x, y, w, h, fmv);
    let mv8 = Mv::new(fmv.row << 3, fmv.col << 3);
    sad + (mv_rate(mv8, ref_mv) as u32 >> 4)
}

/// Step-halving diamond search at full-pel resolution. `start` is a full-pel
/// vector; `ref_mv` (1/8-pel) prices candidate vectors. Returns the best
/// full-pel vector and its raw SAD.
pub(crate) fn full_pixel_diamond(
    src: &Plane,
    refp: &Plane,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    start: Mv,
    ref_mv: Mv,
    step_param: u8,
) -> (Mv, u32) {
    static DIAMOND: [(i16, i16); 8] = [
        (-1, 0),
        (1, 0),
        (0, -1),
        (0, 1),
        (-1, -1),
        (-1, 1),
        (1, -1),
        (1, 1),
    ];

    let mut best = Mv::new(
        clamp_fullpel(start.row as i32),
        clamp_fullpel(start.col as i32),
    );
    let mut best_err = fullpel_err(src, refp, x, y, w, h, best, ref_mv);
    let mut step = (16u32 >> step_param.min(4)).max(1) as i16;

    loop {
        let mut improved = false;
        for (dr, dc) in DIAMOND.iter() {
            let cand = Mv::new(
                clamp_fullpel(best.row as i32 + (dr * step) as i32),
                clamp_fullpel(best.col as i32 + (dc * step) as i32),
            );
            let err = fullpel_err(src, refp, x, y, w, h, cand, ref_mv);
            if err < best_err {
                best_err = err;
                best = cand;
                improved = true;
            }
        }
        if !improved {
            if step == 1 {
                break;
            }
            step >>= 1;
        }
    }

    let sad = sad_plane_fullpel(src, refp, x, y, w, h, best);
    (best, sad)
}

/// Three rounds of sub-pel refinement (1/2, 1/4, 1/8) around a full-pel
/// winner. `mv` enters as the full-pel vector scaled to 1/8 units and leaves
/// refined. Returns the final interpolated SAD.
pub(crate) fn subpel_refine(
    src: &Plane,
    refp: &Plane,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    mv: &mut Mv,
    ref_mv: Mv,
    filter: InterpFilter,
) -> u32 {
    let mut pred = vec![0 as pel; w * h];
    let src_blk: Vec<pel> = (0..h)
        .flat_map(|j| src.row(y + j)[x..x + w].to_vec())
        .collect();

    let eval = |m: Mv, pred: &mut [pel]| -> u32 {
        mc_block(refp, x, y, m, w, h, filter, pred, w);
        sad(&src_blk, w, pred, w, w, h) + (mv_rate(m, ref_mv) as u32 >> 4)
    };

    let mut best = *mv;
    let mut best_err = eval(best, &mut pred);

    for &hstep in &[4i16, 2, 1] {
        let center = best;
        for (dr, dc) in &[
            (-1i16, 0i16),
            (1, 0),
            (0, -1),
            (0, 1),
            (-1, -1),
            (-1, 1),
            (1, -1),
            (1, 1),
        ] {
            let cand = Mv::new(center.row + dr * hstep, center.col + dc * hstep);
            let err = eval(cand, &mut pred);
            if err < best_err {
                best_err = err;
                best = cand;
            }
        }
    }

    *mv = best;
    mc_block(refp, x, y, best, w, h, filter, &mut pred, w);
    sad(&src_blk, w, &pred, w, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: usize, h: usize, shift: isize) -> Plane {
        /* smooth bowl-shaped pattern, well behaved for descent */
        Plane::from_fn(w, h, |x, y| {
            let dx = (x as isize + shift - w as isize / 2).abs();
            let dy = (y as isize - h as isize / 2).abs();
            (20 + dx * 2 + dy * 2).min(255) as pel
        })
    }

    #[test]
    fn mv_cost_zero_diff_minimal() {
        let p = Mv::new(16, -8);
        assert!(mv_cost(p, p) < mv_cost(Mv::new(17, -8), p));
        assert!(mv_cost(Mv::new(100, 0), ZERO_MV) > mv_cost(Mv::new(10, 0), ZERO_MV));
    }

    #[test]
    fn diamond_finds_pure_translation() {
        let refp = gradient_frame(64, 64, 0);
        let src = gradient_frame(64, 64, 4); /* content of ref at x+4 */
        let (mv, sad) =
            full_pixel_diamond(&src, &refp, 16, 16, 16, 16, ZERO_MV, ZERO_MV, 2);
        assert_eq!(mv, Mv::new(0, 4));
        assert_eq!(sad, 0);
    }

    #[test]
    fn subpel_refine_no_worse_than_fullpel() {
        let refp = gradient_frame(64, 64, 0);
        let src = gradient_frame(64, 64, 3);
        let (fmv, fsad) =
            full_pixel_diamond(&src, &refp, 16, 16, 16, 16, ZERO_MV, ZERO_MV, 2);
        let mut mv = Mv::new(fmv.row << 3, fmv.col << 3);
        let sad = subpel_refine(
            &src,
            &refp,
            16,
            16,
            16,
            16,
            &mut mv,
            ZERO_MV,
            InterpFilter::EIGHTTAP_REGULAR,
        );
        assert!(sad <= fsad);
    }

    #[test]
    fn fullpel_clamped_to_range() {
        let refp = gradient_frame(32, 32, 0);
        let src = gradient_frame(32, 32, 0);
        let start = Mv::new(30000, -30000);
        let (mv, _) = full_pixel_diamond(&src, &refp, 8, 8, 8, 8, start, ZERO_MV, 0);
        assert!(mv.row.abs() <= MAX_FULL_PEL && mv.col.abs() <= MAX_FULL_PEL);
    }
}
