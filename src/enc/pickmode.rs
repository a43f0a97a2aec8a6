use log::debug;
use num_traits::FromPrimitive;
use std::rc::Rc;

use crate::api::frame::*;
use crate::api::*;
use crate::def::*;
use crate::enc::cost::*;
use crate::enc::me;
use crate::enc::model::*;
use crate::enc::sad as sadfn;
use crate::enc::tq::*;
use crate::enc::*;
use crate::ipred::*;
use crate::mc::*;
use crate::tbl::*;

/* pruning threshold on normalized zero-motion sse: below this the block is
 * nearly static and NEWMV on distant references is pointless */
const SSE_ZEROMV_NORM_SKIP: i64 = 500;

/*****************************************************************************
 * running best candidate
 *****************************************************************************/
#[derive(Debug, Clone)]
struct BestPickmode {
    mode: PredictionMode,
    ref_frame: RefFrame,
    mv: Mv,
    tx_size: TxSize,
    filter: InterpFilter,
    skip_txfm: bool,
    /* luma skip before any chroma veto, feeds the intra gate */
    initial_skip: bool,
    sse: i64,
    /* owned prediction buffer slot, moved in from the evaluator */
    pred_slot: Option<usize>,
}

impl BestPickmode {
    fn new(default_filter: InterpFilter) -> Self {
        BestPickmode {
            mode: PredictionMode::NEARESTMV,
            ref_frame: RefFrame::LAST_FRAME,
            mv: ZERO_MV,
            tx_size: TxSize::TX_8X8,
            filter: default_filter,
            skip_txfm: false,
            initial_skip: false,
            sse: i64::MAX,
            pred_slot: None,
        }
    }
}

/*****************************************************************************
 * neighbor-derived contexts
 *****************************************************************************/
fn neighbor_mvs(mb: &Macroblock, ref_frame: RefFrame) -> Vec<Mv> {
    let mut cands = Vec::with_capacity(2);
    if let Some(a) = &mb.above_mi {
        if a.is_inter() && a.ref_frame == ref_frame {
            cands.push(a.mv);
        }
    }
    if let Some(l) = &mb.left_mi {
        if l.is_inter() && l.ref_frame == ref_frame && !cands.contains(&l.mv) {
            cands.push(l.mv);
        }
    }
    cands
}

fn mode_context_for_ref(mb: &Macroblock, ref_frame: RefFrame) -> i16 {
    let mut matches = 0i16;
    let mut inter_neighbors = 0i16;
    for mi in [&mb.above_mi, &mb.left_mi].iter() {
        if let Some(m) = mi {
            if m.is_inter() {
                inter_neighbors += 1;
                if m.ref_frame == ref_frame {
                    matches += 1;
                }
            }
        }
    }
    let newmv_ctx: i16 = match matches {
        2 => 0,
        1 => 2,
        _ => {
            if inter_neighbors > 0 {
                4
            } else {
                6
            }
        }
    };
    let zeromv_ctx: i16 = if matches > 0 { 1 } else { 0 };
    let refmv_ctx: i16 = (matches * 2).min(5);
    newmv_ctx | (zeromv_ctx << GLOBALMV_OFFSET) | (refmv_ctx << REFMV_OFFSET)
}

#[inline]
fn skip_context(mb: &Macroblock) -> usize {
    let a = mb.above_mi.map(|m| m.skip_txfm as usize).unwrap_or(0);
    let l = mb.left_mi.map(|m| m.skip_txfm as usize).unwrap_or(0);
    a + l
}

#[inline]
fn intra_inter_context(mb: &Macroblock) -> usize {
    let a = mb.above_mi.map(|m| m.is_inter()).unwrap_or(false);
    let l = mb.left_mi.map(|m| m.is_inter()).unwrap_or(false);
    match (a, l) {
        (true, true) => 3,
        (true, false) | (false, true) => 1,
        (false, false) => 0,
    }
}

/*****************************************************************************
 * predictor fill
 *****************************************************************************/
fn find_predictors(
    fctx: &FrameCtx,
    mb: &mut Macroblock,
    cfg: &SearchConfig,
    ref_frame: RefFrame,
    frame_mv: &mut [[Mv; REF_FRAMES]; MB_MODE_COUNT],
    mode_context: &mut [i16; REF_FRAMES],
) {
    use PredictionMode::*;

    let r = ref_frame as usize;
    let cands = neighbor_mvs(mb, ref_frame);
    let nearest = cands.get(0).copied().unwrap_or(ZERO_MV);
    let near = cands.get(1).copied().unwrap_or(nearest);

    frame_mv[NEARESTMV as usize][r] = nearest;
    frame_mv[NEARMV as usize][r] = near;
    frame_mv[GLOBALMV as usize][r] = ZERO_MV;
    frame_mv[NEWMV as usize][r] = INVALID_MV;
    mode_context[r] = mode_context_for_ref(mb, ref_frame);

    /* the sad metric is skipped for distant references on settled blocks,
     * their candidates get rejected outright later */
    if ref_frame != RefFrame::LAST_FRAME
        && cfg.short_circuit_low_temp_var
        && mb.force_skip_low_temp_var
    {
        return;
    }

    let refp = match &fctx.refs[r] {
        Some(f) => &f.planes[0],
        None => return,
    };
    let src = &fctx.source.planes[0];
    let (x, y) = (mb.x(), mb.y());
    let (w, h) = (mb.bsize.width(), mb.bsize.height());

    let fullpel = |m: Mv| Mv::new(m.row >> 3, m.col >> 3);
    let s0 = sadfn::sad_plane_fullpel(src, refp, x, y, w, h, fullpel(nearest));
    let s1 = if near == nearest {
        s0
    } else {
        sadfn::sad_plane_fullpel(src, refp, x, y, w, h, fullpel(near))
    };
    let sz = if nearest.is_zero() {
        s0
    } else {
        sadfn::sad_plane_fullpel(src, refp, x, y, w, h, ZERO_MV)
    };

    mb.pred_mv0_sad[r] = s0;
    mb.pred_mv1_sad[r] = s1;
    mb.pred_mv_sad[r] = s0.min(s1).min(sz);
}

/*****************************************************************************
 * candidate rejection
 *****************************************************************************/
fn skip_mode_by_bsize_and_ref(
    cfg: &SearchConfig,
    bsize: BlockSize,
    ref_frame: RefFrame,
    mode: PredictionMode,
    sse_zeromv_norm: i64,
) -> bool {
    use PredictionMode::*;

    if bsize == BlockSize::BLOCK_128X128 && mode == NEWMV {
        return true;
    }
    if ref_frame != RefFrame::LAST_FRAME {
        if mode == NEWMV && sse_zeromv_norm < SSE_ZEROMV_NORM_SKIP {
            return true;
        }
        if cfg.prune_ref_search > 0 && mode == NEARMV {
            return true;
        }
        if cfg.prune_ref_search > 1
            && (bsize.area() > 64 * 64 || (bsize.area() > 16 * 16 && mode == NEWMV))
        {
            return true;
        }
    }
    if cfg.aggressive_skip && mode == NEARMV && bsize.area() >= 32 * 32 {
        return true;
    }
    false
}

fn skip_mode_by_low_temp_var(
    cfg: &SearchConfig,
    mb: &Macroblock,
    ref_frame: RefFrame,
    mode: PredictionMode,
    mv: Mv,
) -> bool {
    if !cfg.short_circuit_low_temp_var || !mb.force_skip_low_temp_var {
        return false;
    }
    if ref_frame != RefFrame::LAST_FRAME && !mv.is_zero() {
        return true;
    }
    if mode == PredictionMode::NEWMV && mb.bsize.area() >= 64 * 64 && !mb.source_sad_high {
        return true;
    }
    false
}

/* adaptive reject threshold for one candidate: doubled off the LAST
 * reference, doubled again for a stale golden frame */
fn mode_rd_thresh_for(
    base: i64,
    extra_shift: i32,
    initial_skip: bool,
    ref_frame: RefFrame,
    frames_since_golden: i32,
) -> i64 {
    let mut thr = base << (extra_shift + initial_skip as i32);
    if ref_frame != RefFrame::LAST_FRAME {
        thr <<= 1;
    }
    if ref_frame == RefFrame::GOLDEN_FRAME && frames_since_golden > 4 {
        thr <<= extra_shift + 1;
    }
    thr
}

/*****************************************************************************
 * transform size
 *****************************************************************************/
fn calculate_tx_size(mb: &Macroblock, bsize: BlockSize) -> TxSize {
    let mut tx = TxSize::max_for(bsize);
    if tx > TxSize::TX_16X16 {
        tx = TxSize::TX_16X16;
    }
    /* boosted segments get finer transforms for cleaner refresh */
    if mb.cyclic_refresh_boosted && tx > TxSize::TX_8X8 {
        tx = TxSize::TX_8X8;
    }
    tx
}

/*****************************************************************************
 * luma rd paths
 *****************************************************************************/
fn model_rd_for_sb_y(
    fctx: &FrameCtx,
    mb: &Macroblock,
    bsize: BlockSize,
    pred: &[pel],
    pred_stride: usize,
    rd: &mut RdStats,
) {
    let src = &fctx.source.planes[0];
    let (x, y) = (mb.x(), mb.y());
    let (w, h) = (bsize.width(), bsize.height());
    let (sse, _sum) = sadfn::block_sse_sum(
        &src.data[y * src.stride + x..],
        src.stride,
        pred,
        pred_stride,
        w,
        h,
    );
    let (rate, dist) = model_rd_from_sse(sse, bsize.area_log2(), ac_quant(fctx.qindex));
    rd.rate = rate;
    rd.dist = dist << 4;
    rd.sse = sse;
    rd.skip_txfm = rate == 0;
}

/// Large-block skip detector: 8x8 grid energies aggregated to transform
/// tiles, each tested against quantizer-derived dc and ac thresholds. When
/// every tile would quantize to nothing the block terminates early.
fn model_skip_for_sb_y_large(
    fctx: &FrameCtx,
    mb: &mut Macroblock,
    cfg: &SearchConfig,
    bsize: BlockSize,
    mv: Mv,
    refp: &Frame,
    filter: InterpFilter,
    pred: &[pel],
    pred_stride: usize,
    tx_size: TxSize,
    rd: &mut RdStats,
    early_term: &mut bool,
) {
    let src = &fctx.source.planes[0];
    let (x, y) = (mb.x(), mb.y());
    let (w, h) = (bsize.width(), bsize.height());
    let (gw, gh) = (w >> 3, h >> 3);

    let mut sse8 = vec![0i64; gw * gh];
    let mut sum8 = vec![0i64; gw * gh];
    sadfn::sse_sum_8x8_grid(
        &src.data[y * src.stride + x..],
        src.stride,
        pred,
        pred_stride,
        w,
        h,
        &mut sse8,
        &mut sum8,
    );

    let sse: i64 = sse8.iter().sum();
    let sum: i64 = sum8.iter().sum();
    rd.sse = sse;

    let norm_sum = if bsize.area_log2() > 6 {
        sum.abs() >> (bsize.area_log2() - 6)
    } else {
        sum.abs()
    };
    let dc_q = dc_quant(fctx.qindex) as i64;
    let ac_q = ac_quant(fctx.qindex) as i64;
    let dc_thr = (dc_q * dc_q) >> 6;
    let ac_thr = ((ac_q * ac_q) >> 6) * ac_thr_factor(cfg.speed, w, h, norm_sum);

    /* tile side in 8x8 grid cells */
    let ts = tx_size.size() >> 3;
    debug_assert!(ts >= 1);
    let tile_pels_log2 = 2 * (3 + TBL_LOG2[ts] as usize);

    let mut skip = true;
    'tiles: for ty in (0..gh).step_by(ts) {
        for tx in (0..gw).step_by(ts) {
            let mut t_sse = 0i64;
            let mut t_sum = 0i64;
            for j in 0..ts.min(gh - ty) {
                for i in 0..ts.min(gw - tx) {
                    t_sse += sse8[(ty + j) * gw + tx + i];
                    t_sum += sum8[(ty + j) * gw + tx + i];
                }
            }
            let dc = (t_sum * t_sum) >> tile_pels_log2;
            let ac = (t_sse - dc).max(0);
            if ac >= ac_thr || dc >= dc_thr {
                skip = false;
                break 'tiles;
            }
        }
    }

    /* a luma skip is only safe if the attended chroma planes agree */
    if skip && (mb.color_sensitivity[0] || mb.color_sensitivity[1]) {
        let uv_dc_thr = (dc_q * dc_q) >> 3;
        let uv_ac_thr = (ac_q * ac_q) >> 3;
        for p in 0..2 {
            if !mb.color_sensitivity[p] {
                continue;
            }
            let (p_sse, p_sum) = chroma_pred_sse_sum(fctx, mb, bsize, p, mv, refp, filter);
            let dc = (p_sum * p_sum) >> (bsize.area_log2() - 2);
            let ac = (p_sse - dc).max(0);
            if ac >= uv_ac_thr || dc >= uv_dc_thr {
                skip = false;
                break;
            }
        }
    }

    if skip {
        *early_term = true;
        rd.rate = 0;
        rd.dist = sse << 4;
        rd.skip_txfm = true;
    } else {
        let (rate, dist) = model_rd_from_sse(sse, bsize.area_log2(), ac_quant(fctx.qindex));
        rd.rate = rate;
        rd.dist = dist << 4;
        rd.skip_txfm = rate == 0;
    }
}

/// Exact luma cost: Hadamard transform and low-precision quantization per
/// tile. Only runs for transforms up to 16x16; `calculate_tx_size` upholds
/// that cap.
fn block_yrd(
    fctx: &FrameCtx,
    mb: &Macroblock,
    bsize: BlockSize,
    tx_size: TxSize,
    pred: &[pel],
    pred_stride: usize,
    rd: &mut RdStats,
) {
    let src = &fctx.source.planes[0];
    let (x, y) = (mb.x(), mb.y());
    let (w, h) = (bsize.width(), bsize.height());
    let ts = tx_size.size();
    let n = ts * ts;

    let dc_q = dc_quant(fctx.qindex);
    let ac_q = ac_quant(fctx.qindex);

    let mut sse = 0i64;
    let mut err = 0i64;
    let mut sat_rate = 0i64;
    let mut eob_cost = 0i64;
    let mut skippable = true;

    let mut tile = [0i16; 256];
    let mut coeff = [0i16; 256];
    let mut qcoeff = [0i16; 256];
    let mut dqcoeff = [0i16; 256];

    for ty in (0..h).step_by(ts) {
        for tx in (0..w).step_by(ts) {
            for j in 0..ts {
                let s = &src.data[(y + ty + j) * src.stride + x + tx..];
                let p = &pred[(ty + j) * pred_stride + tx..];
                for i in 0..ts {
                    let d = s[i] as i32 - p[i] as i32;
                    tile[j * ts + i] = d as i16;
                    sse += (d * d) as i64;
                }
            }
            match tx_size {
                TxSize::TX_4X4 => hadamard_4x4(&tile, ts, &mut coeff),
                TxSize::TX_8X8 => hadamard_8x8(&tile, ts, &mut coeff),
                TxSize::TX_16X16 => hadamard_16x16(&tile, ts, &mut coeff),
                TxSize::TX_32X32 | TxSize::TX_64X64 => {
                    unreachable!("transform too large for the exact path")
                }
            }
            let eob = quantize_lp(&coeff, n, dc_q, ac_q, &mut qcoeff, &mut dqcoeff);
            if eob == 0 {
                continue;
            }
            skippable = false;
            if eob == 1 {
                sat_rate += (qcoeff[0] as i64).abs();
            } else {
                sat_rate += sadfn::satd_lp(&qcoeff, n) as i64;
            }
            eob_cost += 1;
            err += block_error_lp(&coeff, &dqcoeff, n);
        }
    }

    rd.sse = sse;
    rd.skip_txfm = skippable;
    if skippable {
        rd.rate = 0;
        rd.dist = sse << 4;
    } else {
        let rate = (sat_rate << (2 + PROB_COST_SHIFT)) + (eob_cost << PROB_COST_SHIFT);
        rd.rate = rate.min(i32::MAX as i64 >> 1) as i32;
        rd.dist = err >> 2;
    }
}

/*****************************************************************************
 * chroma
 *****************************************************************************/
fn chroma_pred_sse_sum(
    fctx: &FrameCtx,
    mb: &mut Macroblock,
    bsize: BlockSize,
    plane: usize,
    mv: Mv,
    refp: &Frame,
    filter: InterpFilter,
) -> (i64, i64) {
    let (cx, cy) = (mb.x() >> 1, mb.y() >> 1);
    let (cw, ch) = (bsize.width() >> 1, bsize.height() >> 1);
    mc_block_chroma(
        &refp.planes[plane + 1],
        cx,
        cy,
        mv,
        cw,
        ch,
        filter,
        &mut mb.pred_uv[plane],
        cw,
    );
    let srcp = &fctx.source.planes[plane + 1];
    sadfn::block_sse_sum(
        &srcp.data[cy * srcp.stride + cx..],
        srcp.stride,
        &mb.pred_uv[plane],
        cw,
        cw,
        ch,
    )
}

/// Per-plane modeled chroma cost with separate dc/ac terms. Returns the
/// additional stats; `skip_txfm` is true when neither plane codes anything.
fn model_rd_for_sb_uv(
    fctx: &FrameCtx,
    mb: &mut Macroblock,
    bsize: BlockSize,
    mv: Mv,
    refp: &Frame,
    filter: InterpFilter,
) -> RdStats {
    let mut uv = RdStats::default();
    uv.rdcost = 0;
    let al2 = bsize.area_log2() - 2;
    let dc_q = dc_quant(fctx.qindex);
    let ac_q = ac_quant(fctx.qindex);

    for p in 0..2 {
        if !mb.color_sensitivity[p] {
            continue;
        }
        let (sse, sum) = chroma_pred_sse_sum(fctx, mb, bsize, p, mv, refp, filter);
        let dc_energy = (sum * sum) >> al2;
        let ac_energy = (sse - dc_energy).max(0);
        let (r_dc, d_dc) = model_rd_from_sse(dc_energy, al2, dc_q >> 3);
        let (r_ac, d_ac) = model_rd_from_sse(ac_energy, al2, ac_q);
        uv.rate += r_ac + (r_dc >> 1);
        uv.dist += (d_ac << 4) + (d_dc << 3);
        uv.sse += sse;
    }
    uv.skip_txfm = uv.rate == 0;
    uv
}

/// Decide once per block which chroma planes deserve attention, from the
/// ratio of chroma to luma zero-motion SAD against the last reference.
fn set_color_sensitivity(fctx: &FrameCtx, mb: &mut Macroblock, bsize: BlockSize, y_sad: u32) {
    let refp = match &fctx.refs[RefFrame::LAST_FRAME as usize] {
        Some(f) => f,
        None => return,
    };
    let factor = if bsize.area() >= 32 * 32 { 2 } else { 3 };
    let (cx, cy) = (mb.x() >> 1, mb.y() >> 1);
    let (cw, ch) = (bsize.width() >> 1, bsize.height() >> 1);
    let uv_area_log2 = bsize.area_log2() - 2;

    for p in 0..2 {
        let uv_sad = sadfn::sad_plane_fullpel(
            &fctx.source.planes[p + 1],
            &refp.planes[p + 1],
            cx,
            cy,
            cw,
            ch,
            ZERO_MV,
        );
        let norm_uv_sad = (uv_sad as u64 >> uv_area_log2) as u32;
        mb.color_sensitivity[p] =
            (y_sad != u32::MAX && uv_sad > (y_sad >> factor)) || norm_uv_sad > 40;
    }
}

/*****************************************************************************
 * motion search wrapper
 *****************************************************************************/
fn search_new_mv(
    fctx: &FrameCtx,
    mb: &Macroblock,
    cfg: &SearchConfig,
    ref_frame: RefFrame,
    refp: &Frame,
    frame_mv: &[[Mv; REF_FRAMES]; MB_MODE_COUNT],
    best_rdcost: i64,
) -> Option<(Mv, i32)> {
    use PredictionMode::*;

    let r = ref_frame as usize;
    let refy = &refp.planes[0];
    let src = &fctx.source.planes[0];
    let (x, y) = (mb.x(), mb.y());
    let (w, h) = (mb.bsize.width(), mb.bsize.height());
    let ref_mv = frame_mv[NEARESTMV as usize][r];
    let start = Mv::new(ref_mv.row >> 3, ref_mv.col >> 3);

    let mut mv8;
    if ref_frame != RefFrame::LAST_FRAME && cfg.gf_temporal_ref && cfg.rc_mode == RcMode::Cbr {
        /* distant reference under CBR: only worth it on larger blocks, and
         * only if the coarse result beats the last-frame predictor sad */
        if mb.bsize.area() < 16 * 16 {
            return None;
        }
        let (fmv, tmp_sad) = me::full_pixel_diamond(
            src,
            refy,
            x,
            y,
            w,
            h,
            start,
            ref_mv,
            cfg.me_step_param.saturating_add(2),
        );
        let last_sad = mb.pred_mv_sad[RefFrame::LAST_FRAME as usize];
        if last_sad != u32::MAX && tmp_sad > last_sad {
            return None;
        }
        mv8 = Mv::new(fmv.row << 3, fmv.col << 3);
        me::subpel_refine(src, refy, x, y, w, h, &mut mv8, ref_mv, fctx.default_filter);
    } else {
        let (fmv, _sad) =
            me::full_pixel_diamond(src, refy, x, y, w, h, start, ref_mv, cfg.me_step_param);
        mv8 = Mv::new(fmv.row << 3, fmv.col << 3);
        /* a full-pel vector already too expensive to signal cannot win */
        if RDCOST(fctx.rdmult, me::mv_rate(mv8, ref_mv), 0) > best_rdcost {
            return None;
        }
        me::subpel_refine(src, refy, x, y, w, h, &mut mv8, ref_mv, fctx.default_filter);
    }

    /* landing on a stacked predictor means the search found nothing new */
    if mv8 == frame_mv[NEARESTMV as usize][r] || mv8 == frame_mv[NEARMV as usize][r] {
        return None;
    }
    Some((mv8, me::mv_rate(mv8, ref_mv)))
}

/*****************************************************************************
 * interpolation filter choice
 *****************************************************************************/
fn use_filter_search(
    cfg: &SearchConfig,
    fctx: &FrameCtx,
    mb: &Macroblock,
    ref_frame: RefFrame,
    mv: Mv,
) -> bool {
    if !cfg.filter_search || !mv.has_subpel() {
        return false;
    }
    if ref_frame != RefFrame::LAST_FRAME && cfg.prune_ref_search > 0 {
        return false;
    }
    /* checkerboard over blocks and frames keeps the search rate constant */
    let bsl = mb.bsize.width_log2().min(mb.bsize.height_log2()) - 2;
    ((((mb.mi_row + mb.mi_col) >> bsl) + (fctx.frame_number as usize & 1)) & 1) == 0
}

/* modeled comparison of the two filter banks; the winning prediction is
 * left in `slot` */
fn search_filter_ref(
    fctx: &FrameCtx,
    mb: &Macroblock,
    pool: &mut PredBufferPool,
    costs: &ModeCosts,
    bsize: BlockSize,
    mv: Mv,
    refp: &Frame,
    slot: usize,
) -> InterpFilter {
    let (x, y) = (mb.x(), mb.y());
    let (w, h) = (bsize.width(), bsize.height());

    let mut best_filter = InterpFilter::EIGHTTAP_REGULAR;
    let mut best_cost = MAX_RD_COST;
    let alt = pool.acquire();

    for (i, &f) in [
        InterpFilter::EIGHTTAP_REGULAR,
        InterpFilter::EIGHTTAP_SMOOTH,
    ]
    .iter()
    .enumerate()
    {
        let target = if i == 0 {
            slot
        } else {
            match alt {
                Some(t) => t,
                None => break, /* pool exhausted, keep regular */
            }
        };
        mc_block(&refp.planes[0], x, y, mv, w, h, f, pool.data_mut(target), w);
        let mut rd = RdStats::default();
        model_rd_for_sb_y(fctx, mb, bsize, pool.data(target), w, &mut rd);
        rd.rate += costs.switchable_filter_cost[f as usize];
        rd.compute_rdcost(fctx.rdmult);
        /* ties keep the earlier, cheaper-to-signal filter */
        if rd.rdcost < best_cost {
            best_cost = rd.rdcost;
            best_filter = f;
        }
    }

    if let Some(a) = alt {
        if best_filter == InterpFilter::EIGHTTAP_SMOOTH {
            /* move the smooth prediction into the candidate slot */
            let tmp = pool.data(a)[..w * h].to_vec();
            pool.data_mut(slot)[..w * h].copy_from_slice(&tmp);
        }
        pool.release(a);
    }
    best_filter
}

/*****************************************************************************
 * CBR decision biases
 *****************************************************************************/
fn newmv_diff_bias(
    cfg: &SearchConfig,
    mb: &Macroblock,
    mode: PredictionMode,
    bsize: BlockSize,
    mv: Mv,
    rdcost: i64,
) -> i64 {
    if cfg.rc_mode != RcMode::Cbr {
        return rdcost;
    }
    let mut rd = rdcost;
    if mode == PredictionMode::NEWMV {
        /* deviating far from the neighborhood motion is risky to signal */
        let mut nmvs = Vec::with_capacity(2);
        for mi in [&mb.above_mi, &mb.left_mi].iter() {
            if let Some(m) = mi {
                if m.is_inter() {
                    nmvs.push(m.mv);
                }
            }
        }
        if !nmvs.is_empty() {
            let ar: i32 = nmvs.iter().map(|m| m.row as i32).sum::<i32>() / nmvs.len() as i32;
            let ac: i32 = nmvs.iter().map(|m| m.col as i32).sum::<i32>() / nmvs.len() as i32;
            if (mv.row as i32 - ar).abs() > 80 || (mv.col as i32 - ac).abs() > 80 {
                rd = if bsize.area() >= 32 * 32 {
                    rd << 1
                } else {
                    rd * 5 / 4
                };
            }
        }
        if bsize.area() >= 64 * 64
            && mb.source_variance < 300
            && (mv.row.abs() > 128 || mv.col.abs() > 128)
            && !mb.source_sad_high
        {
            rd <<= 2;
        }
    } else if cfg.speed >= 8 && mb.source_variance < 150 && (mv.row.abs() > 64 || mv.col.abs() > 64)
    {
        rd = rd * 5 / 4;
    }
    rd
}

/*****************************************************************************
 * intra fallback
 *****************************************************************************/
fn intra_mode_allowed(mode: PredictionMode, bsize: BlockSize) -> bool {
    use PredictionMode::*;
    match mode {
        DC_PRED => true,
        V_PRED | H_PRED => bsize.area() <= 32 * 32,
        SMOOTH_PRED => bsize.area() <= 16 * 16,
        _ => false,
    }
}

fn build_intra_pred(fctx: &FrameCtx, mb: &mut Macroblock, mode: PredictionMode) {
    let src = &fctx.source.planes[0];
    let (x, y) = (mb.x(), mb.y());
    let (w, h) = (mb.bsize.width(), mb.bsize.height());
    let mut above = [0 as pel; MAX_SB_SIZE];
    let mut left = [0 as pel; MAX_SB_SIZE];
    let (up, le) = ipred_edges(src, x, y, w, h, &mut above, &mut left);
    intra_pred(mode, &above, &left, up, le, &mut mb.pred_y, w, h);
}

fn estimate_intra_mode(
    fctx: &FrameCtx,
    mb: &mut Macroblock,
    cfg: &SearchConfig,
    costs: &ModeCosts,
    thresh: &ThresholdStore,
    force_intra: bool,
    best_early_term: &mut bool,
    best: &mut BestPickmode,
    best_rdc: &mut RdStats,
) {
    use PredictionMode::*;

    let bsize = mb.bsize;
    let mut penalty = intra_cost_penalty(fctx.qindex);

    if !force_intra {
        if bsize.area() > cfg.max_intra_size.area() {
            return;
        }
        if mb.source_sad_low {
            return;
        }
        let (svar_thr, motion_thr) = if !cfg.use_alt_ref && cfg.prune_ref_search > 0 {
            (150u32, 0i16)
        } else {
            (50u32, 32i16)
        };
        if mb.source_variance < svar_thr {
            /* flat content where the inter best is not a stable near-zero
             * LAST pick: give intra a real chance */
            if best.ref_frame != RefFrame::LAST_FRAME
                || best.mv.row.abs() >= motion_thr
                || best.mv.col.abs() >= motion_thr
            {
                penalty >>= 2;
            }
            if bsize.area() >= 32 * 32 {
                *best_early_term = false;
            }
        }
        if *best_early_term {
            return;
        }
        if cfg.skip_intra_pred_if_tx_skip && best.initial_skip {
            return;
        }
        let entry_price = RDCOST(
            fctx.rdmult,
            penalty + costs.ref_frame_cost[RefFrame::INTRA_FRAME as usize],
            0,
        );
        if best_rdc.rdcost <= entry_price {
            return;
        }
    }

    let skip_ctx = skip_context(mb);
    let ii_ctx = intra_inter_context(mb);
    let tx_size = calculate_tx_size(mb, bsize);
    let w = bsize.width();

    for &this_mode in INTRA_MODE_LIST.iter() {
        if !intra_mode_allowed(this_mode, bsize) {
            continue;
        }
        let thr_idx = thr_mode_idx(RefFrame::INTRA_FRAME, this_mode);
        if !force_intra
            && cfg.adaptive_rd_thresh > 0
            && this_mode != SMOOTH_PRED
            && ThresholdStore::rd_less_than_thresh(
                best_rdc.rdcost,
                thresh.thresh[bsize as usize][thr_idx] as i64,
                thresh.freq_fact[bsize as usize][thr_idx],
            )
        {
            continue;
        }

        mb.stats.intra_evaluated += 1;
        build_intra_pred(fctx, mb, this_mode);

        let mut this_rdc = RdStats::default();
        if cfg.use_modeled_non_rd_cost {
            model_rd_for_sb_y(fctx, mb, bsize, &mb.pred_y, w, &mut this_rdc);
        } else {
            block_yrd(fctx, mb, bsize, tx_size, &mb.pred_y, w, &mut this_rdc);
        }

        if this_rdc.skip_txfm {
            this_rdc.rate = costs.skip_txfm_cost[skip_ctx][1];
            this_rdc.dist = this_rdc.sse << 4;
        } else {
            this_rdc.rate += costs.skip_txfm_cost[skip_ctx][0];
        }

        this_rdc.rate += costs.y_mode_cost[this_mode.offset()];
        this_rdc.rate += match this_mode {
            V_PRED | H_PRED => costs.angle_delta_cost,
            DC_PRED => costs.filter_intra_off_cost,
            _ => 0,
        };
        this_rdc.rate += costs.ref_frame_cost[RefFrame::INTRA_FRAME as usize];
        this_rdc.rate += costs.intra_inter_cost[ii_ctx][0];
        this_rdc.rate += penalty;
        this_rdc.compute_rdcost(fctx.rdmult);

        if this_rdc.rdcost < best_rdc.rdcost {
            *best_rdc = this_rdc;
            best.mode = this_mode;
            best.ref_frame = RefFrame::INTRA_FRAME;
            best.mv = ZERO_MV;
            best.tx_size = tx_size;
            best.skip_txfm = this_rdc.skip_txfm;
            best.initial_skip = this_rdc.skip_txfm;
            best.sse = this_rdc.sse;
            best.pred_slot = None;
        }
    }
}

/*****************************************************************************
 * driver
 *****************************************************************************/

/// One-shot mode decision for a single block: enumerate the inter candidate
/// table, reject by the configured heuristics, evaluate the survivors, then
/// give intra a chance. Returns the decision plus its rd statistics; the
/// winning luma prediction is left in `mb.pred_y`.
pub fn nonrd_pick_inter_mode_sb(
    fctx: &FrameCtx,
    mb: &mut Macroblock,
    pool: &mut PredBufferPool,
    thresh: &mut ThresholdStore,
    cfg: &SearchConfig,
) -> Result<(ModeInfo, RdStats), RavtError> {
    use PredictionMode::*;

    let bsize = mb.bsize;
    let (x, y) = (mb.x(), mb.y());
    let (w, h) = (bsize.width(), bsize.height());
    if x + w > fctx.width || y + h > fctx.height {
        return Err(RavtError::BlockOutOfBounds);
    }
    if fctx.refs[RefFrame::LAST_FRAME as usize].is_none() {
        return Err(RavtError::MissingReference);
    }

    let costs = ModeCosts::default();
    let rdmult = fctx.rdmult;
    let use_model_yrd_large = cfg.rc_mode == RcMode::Cbr && bsize.area() >= 32 * 32;

    /* which references are open for enumeration */
    let mut usable = [false; REF_FRAMES];
    usable[RefFrame::LAST_FRAME as usize] = true;
    usable[RefFrame::GOLDEN_FRAME as usize] = cfg.use_golden_ref
        && fctx.refs[RefFrame::GOLDEN_FRAME as usize].is_some()
        && !(fctx.frames_since_golden == 0 && cfg.gf_temporal_ref);
    usable[RefFrame::ALTREF_FRAME as usize] =
        cfg.use_alt_ref && fctx.refs[RefFrame::ALTREF_FRAME as usize].is_some();
    if let Some(seg_ref) = mb.segment_ref_frame {
        for r in 1..REF_FRAMES {
            usable[r] = r == seg_ref as usize && fctx.refs[r].is_some();
        }
    }

    let mut frame_mv = [[ZERO_MV; REF_FRAMES]; MB_MODE_COUNT];
    let mut mode_context = [0i16; REF_FRAMES];
    for r in 1..REF_FRAMES {
        if usable[r] {
            let rf: RefFrame = FromPrimitive::from_usize(r).unwrap();
            find_predictors(fctx, mb, cfg, rf, &mut frame_mv, &mut mode_context);
        }
    }

    /* distant references must not be much worse than LAST at predicting */
    let last_sad = mb.pred_mv_sad[RefFrame::LAST_FRAME as usize];
    let thresh_sad_pred = if last_sad == u32::MAX {
        u32::MAX
    } else {
        last_sad.saturating_mul(2)
            + if cfg.prune_ref_search == 1 {
                last_sad >> 2
            } else {
                0
            }
    };

    let ref_mode_set: &[RefMode] = if cfg.use_reduced_set {
        &REF_MODE_SET_REDUCED
    } else {
        &REF_MODE_SET_RT
    };

    let mut best = BestPickmode::new(fctx.default_filter);
    let mut best_rdc = RdStats::default();
    let mut best_early_term = false;
    let mut mode_checked = [[false; REF_FRAMES]; MB_MODE_COUNT];
    let mut sse_zeromv_norm = i64::MAX;
    let skip_ctx = skip_context(mb);
    let ii_ctx = intra_inter_context(mb);
    let extra_shift = if cfg.aggressive_skip { 1 } else { 0 };

    for (idx, rm) in ref_mode_set.iter().enumerate() {
        let ref_frame = rm.ref_frame;
        let this_mode = rm.pred_mode;
        let r = ref_frame as usize;
        mb.stats.candidates_considered += 1;

        if !usable[r] {
            continue;
        }
        let refp = match &fctx.refs[r] {
            Some(f) => Rc::clone(f),
            None => continue,
        };
        if skip_mode_by_bsize_and_ref(cfg, bsize, ref_frame, this_mode, sse_zeromv_norm) {
            continue;
        }
        if skip_mode_by_low_temp_var(cfg, mb, ref_frame, this_mode, frame_mv[this_mode as usize][r])
        {
            continue;
        }
        if ref_frame != RefFrame::LAST_FRAME
            && mb.segment_ref_frame.is_none()
            && mb.pred_mv_sad[r] != u32::MAX
            && mb.pred_mv_sad[r] > thresh_sad_pred
        {
            continue;
        }
        if this_mode == NEARMV
            && mb.pred_mv1_sad[r] != u32::MAX
            && mb.pred_mv1_sad[r] > mb.pred_mv0_sad[r].saturating_mul(2)
        {
            continue;
        }

        /* adaptive rd threshold, only prunes moving candidates */
        if cfg.adaptive_rd_thresh > 0 && best_rdc.rdcost != MAX_RD_COST {
            let thr_idx = thr_mode_idx(ref_frame, this_mode);
            let mode_rd_thresh = mode_rd_thresh_for(
                thresh.thresh[bsize as usize][thr_idx] as i64,
                extra_shift,
                best.initial_skip,
                ref_frame,
                fctx.frames_since_golden,
            );
            if !frame_mv[this_mode as usize][r].is_zero()
                && ThresholdStore::rd_less_than_thresh(
                    best_rdc.rdcost,
                    mode_rd_thresh,
                    thresh.freq_fact[bsize as usize][thr_idx],
                )
            {
                continue;
            }
        }

        let mut rate_mv = 0i32;
        if this_mode == NEWMV {
            match search_new_mv(fctx, mb, cfg, ref_frame, &refp, &frame_mv, best_rdc.rdcost) {
                Some((mv, rmv)) => {
                    frame_mv[NEWMV as usize][r] = mv;
                    rate_mv = rmv;
                }
                None => continue,
            }
        }

        let this_mv = frame_mv[this_mode as usize][r];

        /* identical vectors on the same reference are evaluated once */
        let mut duplicate = false;
        for m2 in &[NEARESTMV, NEARMV, GLOBALMV, NEWMV] {
            if *m2 != this_mode
                && mode_checked[*m2 as usize][r]
                && frame_mv[*m2 as usize][r] == this_mv
            {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            continue;
        }
        mode_checked[this_mode as usize][r] = true;

        /* first evaluated candidate fixes the chroma attention flags */
        if mb.stats.candidates_evaluated == 0 {
            set_color_sensitivity(fctx, mb, bsize, mb.pred_mv_sad[r]);
        }
        mb.stats.candidates_evaluated += 1;

        let slot = match pool.acquire() {
            Some(s) => s,
            None => return Err(RavtError::PredPoolExhausted),
        };

        let tx_size = calculate_tx_size(mb, bsize);
        let mut this_filter = fctx.default_filter;
        let mut filter_rate = 0i32;

        if use_filter_search(cfg, fctx, mb, ref_frame, this_mv) {
            this_filter = search_filter_ref(fctx, mb, pool, &costs, bsize, this_mv, &refp, slot);
        } else {
            mc_block(
                &refp.planes[0],
                x,
                y,
                this_mv,
                w,
                h,
                this_filter,
                pool.data_mut(slot),
                w,
            );
        }
        if cfg.filter_search {
            filter_rate = costs.switchable_filter_cost[this_filter as usize];
        }

        let mut this_rdc = RdStats::default();
        let mut this_early_term = false;
        if use_model_yrd_large {
            model_skip_for_sb_y_large(
                fctx,
                mb,
                cfg,
                bsize,
                this_mv,
                &refp,
                this_filter,
                pool.data(slot),
                w,
                tx_size,
                &mut this_rdc,
                &mut this_early_term,
            );
        } else if bsize.area() >= 32 * 32 {
            /* large blocks under VBR take the modeled cost only */
            model_rd_for_sb_y(fctx, mb, bsize, pool.data(slot), w, &mut this_rdc);
        } else {
            block_yrd(fctx, mb, bsize, tx_size, pool.data(slot), w, &mut this_rdc);
        }

        if ref_frame == RefFrame::LAST_FRAME && this_mv.is_zero() {
            sse_zeromv_norm = this_rdc.sse >> bsize.area_log2();
        }

        /* skip-vs-code resolution on luma, keeping the coded stats around in
         * case chroma vetoes the skip */
        let mut nonskip_rdc: Option<RdStats> = None;
        if this_early_term {
            this_rdc.rate = costs.skip_txfm_cost[skip_ctx][1];
            this_rdc.dist = this_rdc.sse << 4;
            this_rdc.skip_txfm = true;
        } else if this_rdc.skip_txfm {
            this_rdc.rate = costs.skip_txfm_cost[skip_ctx][1];
            this_rdc.dist = this_rdc.sse << 4;
        } else {
            let coded = RDCOST(
                rdmult,
                this_rdc.rate + costs.skip_txfm_cost[skip_ctx][0],
                this_rdc.dist,
            );
            let skipped = RDCOST(rdmult, costs.skip_txfm_cost[skip_ctx][1], this_rdc.sse << 4);
            if coded >= skipped {
                let mut saved = this_rdc;
                saved.rate += costs.skip_txfm_cost[skip_ctx][0];
                nonskip_rdc = Some(saved);
                this_rdc.skip_txfm = true;
                this_rdc.rate = costs.skip_txfm_cost[skip_ctx][1];
                this_rdc.dist = this_rdc.sse << 4;
            } else {
                this_rdc.rate += costs.skip_txfm_cost[skip_ctx][0];
            }
        }
        let initial_skip = this_rdc.skip_txfm;

        /* chroma add-on for attended planes */
        if !this_early_term && (mb.color_sensitivity[0] || mb.color_sensitivity[1]) {
            let uv = model_rd_for_sb_uv(fctx, mb, bsize, this_mv, &refp, this_filter);
            if this_rdc.skip_txfm && !uv.skip_txfm {
                /* chroma codes something, the block cannot be skipped */
                if let Some(ns) = nonskip_rdc {
                    this_rdc = ns;
                } else {
                    this_rdc.rate = costs.skip_txfm_cost[skip_ctx][0];
                    this_rdc.dist = this_rdc.sse << 4;
                }
                this_rdc.skip_txfm = false;
            }
            this_rdc.rate += uv.rate;
            this_rdc.dist += uv.dist;
            this_rdc.sse += uv.sse;
        }

        /* mode signaling */
        this_rdc.rate += rate_mv;
        this_rdc.rate += filter_rate;
        this_rdc.rate += costs.ref_frame_cost[r];
        this_rdc.rate += costs.intra_inter_cost[ii_ctx][1];
        this_rdc.rate += cost_mv_ref(&costs, this_mode, mode_context[r]);
        this_rdc.compute_rdcost(rdmult);
        this_rdc.rdcost = newmv_diff_bias(cfg, mb, this_mode, bsize, this_mv, this_rdc.rdcost);

        if this_rdc.rdcost < best_rdc.rdcost {
            best_rdc = this_rdc;
            best.mode = this_mode;
            best.ref_frame = ref_frame;
            best.mv = this_mv;
            best.tx_size = tx_size;
            best.filter = this_filter;
            best.skip_txfm = this_rdc.skip_txfm;
            best.initial_skip = initial_skip;
            best.sse = this_rdc.sse;
            if let Some(old) = best.pred_slot.replace(slot) {
                pool.release(old);
            }
            best_early_term = this_early_term;
        } else {
            pool.release(slot);
        }
        mb.stats.rd_trace.push(best_rdc.rdcost);

        if best_early_term && (idx > 0 || cfg.aggressive_skip) {
            best.skip_txfm = true;
            break;
        }
    }

    /* intra fallback, forced when no inter candidate survived */
    let force_intra = best_rdc.rdcost == MAX_RD_COST;
    estimate_intra_mode(
        fctx,
        mb,
        cfg,
        &costs,
        thresh,
        force_intra,
        &mut best_early_term,
        &mut best,
        &mut best_rdc,
    );

    /* materialize the winner's prediction */
    if let Some(slot) = best.pred_slot.take() {
        let data = pool.data(slot)[..w * h].to_vec();
        mb.pred_y[..w * h].copy_from_slice(&data);
        pool.release(slot);
    } else if best.ref_frame == RefFrame::INTRA_FRAME {
        build_intra_pred(fctx, mb, best.mode);
    }

    /* threshold factor bookkeeping for the winning group */
    if cfg.adaptive_rd_thresh > 0 {
        let group = &MODE_IDX[best.ref_frame as usize];
        let winner = thr_mode_idx(best.ref_frame, best.mode);
        thresh.update_freq_facts(bsize, winner, group);
    }

    let mi = ModeInfo {
        mode: best.mode,
        ref_frame: best.ref_frame,
        mv: best.mv,
        interp_filter: best.filter,
        tx_size: best.tx_size,
        skip_txfm: best.skip_txfm,
    };
    debug!(
        "pick {:?}/{:?} mv ({}, {}) skip {} rd {}",
        mi.mode, mi.ref_frame, mi.mv.row, mi.mv.col, mi.skip_txfm, best_rdc.rdcost
    );
    Ok((mi, best_rdc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn textured_frame(w: usize, h: usize, seed: u64) -> Frame {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut f = Frame::new(w, h);
        for p in 0..3 {
            let plane = &mut f.planes[p];
            for v in plane.data.iter_mut() {
                *v = rng.gen_range(60, 200);
            }
        }
        f
    }

    fn bowl_frame(w: usize, h: usize, shift: isize) -> Frame {
        let mut f = Frame::new(w, h);
        f.planes[0] = Plane::from_fn(w, h, |x, y| {
            let dx = (x as isize + shift - w as isize / 2).abs();
            let dy = (y as isize - h as isize / 2).abs();
            (20 + dx * 2 + dy * 2).min(255) as pel
        });
        for p in 1..3 {
            let (cw, ch) = (w / 2, h / 2);
            f.planes[p] = Plane::from_fn(cw, ch, |_, _| 128);
        }
        f
    }

    fn setup(
        src: Frame,
        last: Frame,
        qindex: u8,
        bsize: BlockSize,
        mi_row: usize,
        mi_col: usize,
    ) -> (FrameCtx, Macroblock) {
        let mut fctx = FrameCtx::new(src, qindex);
        fctx.set_ref(RefFrame::LAST_FRAME, Rc::new(last));
        let mut mb = Macroblock::new();
        mb.set_block(bsize, mi_row, mi_col);
        (fctx, mb)
    }

    #[test]
    fn missing_last_ref_is_an_error() {
        let fctx = FrameCtx::new(Frame::new(64, 64), 100);
        let mut mb = Macroblock::new();
        mb.set_block(BlockSize::BLOCK_16X16, 4, 4);
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();
        let r = nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg);
        assert_eq!(r.unwrap_err(), RavtError::MissingReference);
    }

    #[test]
    fn out_of_bounds_block_is_an_error() {
        let mut fctx = FrameCtx::new(Frame::new(64, 64), 100);
        fctx.set_ref(RefFrame::LAST_FRAME, Rc::new(Frame::new(64, 64)));
        let mut mb = Macroblock::new();
        mb.set_block(BlockSize::BLOCK_32X32, 14, 14);
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();
        let r = nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg);
        assert_eq!(r.unwrap_err(), RavtError::BlockOutOfBounds);
    }

    /* static textured content: the first candidate matches exactly, skips,
     * and the duplicate-vector rule collapses the rest of the table */
    #[test]
    fn static_content_picks_zero_mv_skip() {
        let src = textured_frame(64, 64, 7);
        let last = src.clone();
        let (fctx, mut mb) = setup(src, last, 100, BlockSize::BLOCK_32X32, 4, 4);
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();

        let (mi, rdc) =
            nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        assert_eq!(mi.mode, PredictionMode::NEARESTMV);
        assert_eq!(mi.ref_frame, RefFrame::LAST_FRAME);
        assert_eq!(mi.mv, ZERO_MV);
        assert!(mi.skip_txfm);
        assert_eq!(rdc.sse, 0);
        assert_eq!(rdc.dist, 0);
        /* only the zero-mv candidate was worth a full evaluation */
        assert_eq!(mb.stats.candidates_evaluated, 1);
        assert_eq!(mb.stats.intra_evaluated, 0);
        assert_eq!(pool.slots_in_use(), 0);
    }

    /* pure horizontal pan: motion search must recover the displacement */
    #[test]
    fn pan_content_picks_new_mv() {
        let last = bowl_frame(64, 64, 0);
        let src = bowl_frame(64, 64, 4); /* src(x) == last(x + 4) */
        let (fctx, mut mb) = setup(src, last, 80, BlockSize::BLOCK_16X16, 4, 4);
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(80, 4);
        let cfg = SearchConfig::default();

        let (mi, rdc) =
            nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        assert_eq!(mi.mode, PredictionMode::NEWMV);
        assert_eq!(mi.mv, Mv::new(0, 32)); /* 4 pels in 1/8 units */
        assert!(mi.skip_txfm);
        assert_eq!(rdc.sse, 0);
    }

    /* golden reference matches while last is noise: selection must cross
     * references */
    #[test]
    fn golden_ref_wins_over_noisy_last() {
        let src = textured_frame(64, 64, 3);
        let last = textured_frame(64, 64, 99);
        let golden = src.clone();
        let (mut fctx, mut mb) = setup(src, last, 100, BlockSize::BLOCK_16X16, 4, 4);
        fctx.set_ref(RefFrame::GOLDEN_FRAME, Rc::new(golden));
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();

        let (mi, rdc) =
            nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        assert_eq!(mi.ref_frame, RefFrame::GOLDEN_FRAME);
        assert_eq!(mi.mv, ZERO_MV);
        assert!(mi.skip_txfm);
        assert_eq!(rdc.sse, 0);
    }

    /* a later early-terminating candidate must break the loop and suppress
     * the intra pass */
    #[test]
    fn early_term_on_later_candidate_stops_search() {
        let src = textured_frame(64, 64, 3);
        let last = textured_frame(64, 64, 99);
        let golden = src.clone();
        let (mut fctx, mut mb) = setup(src, last, 100, BlockSize::BLOCK_32X32, 4, 4);
        fctx.set_ref(RefFrame::GOLDEN_FRAME, Rc::new(golden));
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();

        let (mi, _) = nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        assert_eq!(mi.ref_frame, RefFrame::GOLDEN_FRAME);
        assert_eq!(mi.mode, PredictionMode::NEARESTMV);
        assert!(mi.skip_txfm);
        /* loop broke before the full table and intra never ran */
        assert!(mb.stats.candidates_considered < REF_MODE_SET_RT.len() as u32);
        assert_eq!(mb.stats.intra_evaluated, 0);
    }

    /* first-candidate early termination only breaks under aggressive skip */
    #[test]
    fn first_candidate_break_needs_aggressive_skip() {
        let src = textured_frame(64, 64, 11);
        let last = src.clone();

        let (fctx, mut mb) = setup(src.clone(), last.clone(), 100, BlockSize::BLOCK_32X32, 4, 4);
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();
        nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        let considered_default = mb.stats.candidates_considered;

        let (fctx, mut mb) = setup(src, last, 100, BlockSize::BLOCK_32X32, 4, 4);
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let mut cfg = SearchConfig::default();
        cfg.aggressive_skip = true;
        nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();

        assert_eq!(mb.stats.candidates_considered, 1);
        assert!(considered_default > 1);
    }

    /* the running best cost never worsens across evaluated candidates */
    #[test]
    fn best_rdcost_is_monotone() {
        let last = bowl_frame(64, 64, 0);
        let src = bowl_frame(64, 64, 2);
        let (fctx, mut mb) = setup(src, last, 120, BlockSize::BLOCK_16X16, 4, 4);
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(120, 4);
        let cfg = SearchConfig::default();

        nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        assert!(!mb.stats.rd_trace.is_empty());
        for pair in mb.stats.rd_trace.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    /* same inputs with fresh state produce the same decision */
    #[test]
    fn decision_is_deterministic() {
        let last = bowl_frame(64, 64, 0);
        let src = textured_frame(64, 64, 5);
        let run = || {
            let (fctx, mut mb) = setup(src.clone(), last.clone(), 90, BlockSize::BLOCK_16X16, 4, 4);
            mb.source_variance = 500;
            let mut pool = PredBufferPool::new();
            let mut ts = ThresholdStore::new(90, 4);
            let cfg = SearchConfig::default();
            nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap()
        };
        let (mi_a, rdc_a) = run();
        let (mi_b, rdc_b) = run();
        assert_eq!(mi_a, mi_b);
        assert_eq!(rdc_a, rdc_b);
    }

    /* candidate count never exceeds the enumeration table */
    #[test]
    fn candidates_bounded_by_table() {
        let src = textured_frame(64, 64, 21);
        let last = textured_frame(64, 64, 22);
        let (fctx, mut mb) = setup(src, last, 140, BlockSize::BLOCK_16X16, 4, 4);
        mb.source_variance = 2000;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(140, 4);
        let cfg = SearchConfig::default();

        nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        assert!(mb.stats.candidates_considered <= REF_MODE_SET_RT.len() as u32);
        assert!(mb.stats.candidates_evaluated <= mb.stats.candidates_considered);
    }

    /* segment-forced reference that is unavailable leaves intra only */
    #[test]
    fn forced_segment_ref_missing_falls_back_to_intra() {
        let src = textured_frame(64, 64, 2);
        let last = textured_frame(64, 64, 4);
        let (fctx, mut mb) = setup(src, last, 100, BlockSize::BLOCK_16X16, 4, 4);
        mb.segment_ref_frame = Some(RefFrame::GOLDEN_FRAME);
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();

        let (mi, _) = nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        assert_eq!(mi.ref_frame, RefFrame::INTRA_FRAME);
        assert!(!mi.mode.is_inter());
        assert!(mb.stats.intra_evaluated > 0);
    }

    /* a skip decision always reports distortion equal to the scaled sse */
    #[test]
    fn skip_decision_dist_matches_sse() {
        let src = textured_frame(64, 64, 7);
        let last = src.clone();
        let (fctx, mut mb) = setup(src, last, 100, BlockSize::BLOCK_16X16, 4, 4);
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();

        let (mi, rdc) =
            nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        assert!(mi.skip_txfm);
        assert_eq!(rdc.dist, rdc.sse << 4);
    }

    /* the winning prediction is materialized for the caller */
    #[test]
    fn winner_prediction_written_to_mb() {
        let src = textured_frame(64, 64, 7);
        let last = src.clone();
        let (fctx, mut mb) = setup(src, last, 100, BlockSize::BLOCK_16X16, 4, 4);
        mb.source_variance = 900;
        let mut pool = PredBufferPool::new();
        let mut ts = ThresholdStore::new(100, 4);
        let cfg = SearchConfig::default();

        nonrd_pick_inter_mode_sb(&fctx, &mut mb, &mut pool, &mut ts, &cfg).unwrap();
        let srcp = &fctx.source.planes[0];
        for j in 0..16 {
            for i in 0..16 {
                assert_eq!(mb.pred_y[j * 16 + i], srcp.pel_at(16 + i, 16 + j));
            }
        }
    }

    #[test]
    fn tx_size_clamped_for_all_blocks() {
        use num_traits::FromPrimitive;
        let mut mb = Macroblock::new();
        for i in 0..BLOCK_SIZES_ALL {
            let bs: BlockSize = FromPrimitive::from_usize(i).unwrap();
            mb.bsize = bs;
            mb.cyclic_refresh_boosted = false;
            let tx = calculate_tx_size(&mb, bs);
            assert!(tx <= TxSize::TX_16X16);
            assert!(tx.size() <= bs.width() && tx.size() <= bs.height());
            mb.cyclic_refresh_boosted = true;
            assert!(calculate_tx_size(&mb, bs) <= TxSize::TX_8X8);
        }
    }

    #[test]
    fn duplicate_vector_detection() {
        /* near collapsing onto nearest must leave only one evaluation per
         * reference in a static scene, already asserted in the static test;
         * here check the predictor fill produces that collapse */
        let mut mb = Macroblock::new();
        mb.set_block(BlockSize::BLOCK_16X16, 4, 4);
        let mut fctx = FrameCtx::new(Frame::new(64, 64), 100);
        fctx.set_ref(RefFrame::LAST_FRAME, Rc::new(Frame::new(64, 64)));
        let cfg = SearchConfig::default();
        let mut frame_mv = [[ZERO_MV; REF_FRAMES]; MB_MODE_COUNT];
        let mut mode_context = [0i16; REF_FRAMES];
        find_predictors(
            &fctx,
            &mut mb,
            &cfg,
            RefFrame::LAST_FRAME,
            &mut frame_mv,
            &mut mode_context,
        );
        let r = RefFrame::LAST_FRAME as usize;
        assert_eq!(
            frame_mv[PredictionMode::NEARESTMV as usize][r],
            frame_mv[PredictionMode::NEARMV as usize][r]
        );
        assert!(!frame_mv[PredictionMode::NEWMV as usize][r].is_valid());
    }

    #[test]
    fn neighbor_mv_feeds_nearest_predictor() {
        let mut mb = Macroblock::new();
        mb.set_block(BlockSize::BLOCK_16X16, 4, 4);
        mb.above_mi = Some(ModeInfo {
            mode: PredictionMode::NEWMV,
            ref_frame: RefFrame::LAST_FRAME,
            mv: Mv::new(8, -16),
            ..Default::default()
        });
        mb.left_mi = Some(ModeInfo {
            mode: PredictionMode::NEARESTMV,
            ref_frame: RefFrame::LAST_FRAME,
            mv: Mv::new(0, 8),
            ..Default::default()
        });
        let mut fctx = FrameCtx::new(Frame::new(64, 64), 100);
        fctx.set_ref(RefFrame::LAST_FRAME, Rc::new(Frame::new(64, 64)));
        let cfg = SearchConfig::default();
        let mut frame_mv = [[ZERO_MV; REF_FRAMES]; MB_MODE_COUNT];
        let mut mode_context = [0i16; REF_FRAMES];
        find_predictors(
            &fctx,
            &mut mb,
            &cfg,
            RefFrame::LAST_FRAME,
            &mut frame_mv,
            &mut mode_context,
        );
        let r = RefFrame::LAST_FRAME as usize;
        assert_eq!(frame_mv[PredictionMode::NEARESTMV as usize][r], Mv::new(8, -16));
        assert_eq!(frame_mv[PredictionMode::NEARMV as usize][r], Mv::new(0, 8));
        /* both neighbors inter on this ref: confident new-mv context */
        assert_eq!(mode_context[r] & NEWMV_CTX_MASK, 0);
    }

    /* flat content where the inter best is a large-motion non-LAST pick:
     * intra must be tried even after an inter early termination */
    #[test]
    fn intra_tried_when_inter_best_is_unstable() {
        let fctx = FrameCtx::new(Frame::new(64, 64), 100);
        let mut mb = Macroblock::new();
        mb.set_block(BlockSize::BLOCK_32X32, 4, 4);
        mb.source_variance = 10;
        let cfg = SearchConfig::default();
        let costs = ModeCosts::default();
        let ts = ThresholdStore::new(100, 4);

        let mut best = BestPickmode::new(fctx.default_filter);
        best.ref_frame = RefFrame::GOLDEN_FRAME;
        best.mv = Mv::new(100, 0);
        let mut best_rdc = RdStats::default();
        let mut early_term = true;

        estimate_intra_mode(
            &fctx, &mut mb, &cfg, &costs, &ts, false, &mut early_term, &mut best, &mut best_rdc,
        );
        assert!(!early_term);
        assert!(mb.stats.intra_evaluated > 0);
        assert_eq!(best.ref_frame, RefFrame::INTRA_FRAME);

        /* below 32x32 the early termination stands and intra stays out */
        let mut mb = Macroblock::new();
        mb.set_block(BlockSize::BLOCK_16X16, 4, 4);
        mb.source_variance = 10;
        let mut best = BestPickmode::new(fctx.default_filter);
        best.ref_frame = RefFrame::GOLDEN_FRAME;
        best.mv = Mv::new(100, 0);
        let mut best_rdc = RdStats::default();
        let mut early_term = true;
        estimate_intra_mode(
            &fctx, &mut mb, &cfg, &costs, &ts, false, &mut early_term, &mut best, &mut best_rdc,
        );
        assert!(early_term);
        assert_eq!(mb.stats.intra_evaluated, 0);
    }

    /* off-LAST candidates face a doubled reject threshold, stale golden a
     * quadrupled one */
    #[test]
    fn non_last_threshold_doubling() {
        let base = 1000i64;
        assert_eq!(mode_rd_thresh_for(base, 0, false, RefFrame::LAST_FRAME, 1), base);
        assert_eq!(
            mode_rd_thresh_for(base, 0, false, RefFrame::ALTREF_FRAME, 1),
            base << 1
        );
        assert_eq!(
            mode_rd_thresh_for(base, 0, false, RefFrame::GOLDEN_FRAME, 1),
            base << 1
        );
        assert_eq!(
            mode_rd_thresh_for(base, 0, false, RefFrame::GOLDEN_FRAME, 5),
            base << 2
        );
        /* aggressive-skip shift and a skipping best stack underneath */
        assert_eq!(mode_rd_thresh_for(base, 1, true, RefFrame::LAST_FRAME, 1), base << 2);
    }

    /* intra fallback honors the configured maximum block size */
    #[test]
    fn oversize_block_skips_intra_fallback() {
        let fctx = FrameCtx::new(Frame::new(128, 128), 100);
        let costs = ModeCosts::default();
        let ts = ThresholdStore::new(100, 4);

        let run = |cfg: &SearchConfig| {
            let mut mb = Macroblock::new();
            mb.set_block(BlockSize::BLOCK_128X128, 0, 0);
            mb.source_variance = 10;
            let mut best = BestPickmode::new(fctx.default_filter);
            best.ref_frame = RefFrame::GOLDEN_FRAME;
            best.mv = Mv::new(100, 0);
            let mut best_rdc = RdStats::default();
            let mut early_term = false;
            estimate_intra_mode(
                &fctx, &mut mb, cfg, &costs, &ts, false, &mut early_term, &mut best, &mut best_rdc,
            );
            mb.stats.intra_evaluated
        };

        let cfg = SearchConfig::default();
        assert_eq!(run(&cfg), 0);
        let mut open = SearchConfig::default();
        open.max_intra_size = BlockSize::BLOCK_128X128;
        assert!(run(&open) > 0);
    }
}
