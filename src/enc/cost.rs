use crate::def::*;
use crate::enc::tq::ac_quant;

/* mode context packing: low bits newmv, then globalmv, then refmv */
pub(crate) const NEWMV_CTX_MASK: i16 = 7;
pub(crate) const GLOBALMV_OFFSET: i16 = 3;
pub(crate) const GLOBALMV_CTX_MASK: i16 = 1;
pub(crate) const REFMV_OFFSET: i16 = 4;
pub(crate) const REFMV_CTX_MASK: i16 = 7;

pub(crate) const NEWMV_MODE_CONTEXTS: usize = 7;
pub(crate) const GLOBALMV_MODE_CONTEXTS: usize = 2;
pub(crate) const REFMV_MODE_CONTEXTS: usize = 6;
pub(crate) const SKIP_CONTEXTS: usize = 3;
pub(crate) const INTRA_INTER_CONTEXTS: usize = 4;

/// Signaling costs in 1/512-bit units. A full encoder refreshes these from
/// the frame entropy state; here they are fixed at plausible midpoints, which
/// keeps every decision rule deterministic.
#[derive(Debug, Clone)]
pub(crate) struct ModeCosts {
    pub newmv_mode_cost: [[i32; 2]; NEWMV_MODE_CONTEXTS],
    pub zeromv_mode_cost: [[i32; 2]; GLOBALMV_MODE_CONTEXTS],
    pub refmv_mode_cost: [[i32; 2]; REFMV_MODE_CONTEXTS],
    pub skip_txfm_cost: [[i32; 2]; SKIP_CONTEXTS],
    pub intra_inter_cost: [[i32; 2]; INTRA_INTER_CONTEXTS],
    /* flat per-reference signaling totals */
    pub ref_frame_cost: [i32; REF_FRAMES],
    pub switchable_filter_cost: [i32; SWITCHABLE_FILTERS],
    /* indexed by intra mode offset: DC, V, H, SMOOTH */
    pub y_mode_cost: [i32; 4],
    pub angle_delta_cost: i32,
    pub filter_intra_off_cost: i32,
}

impl Default for ModeCosts {
    #[rustfmt::skip]
    fn default() -> Self {
        ModeCosts {
            newmv_mode_cost: [
                [ 642,  187], [ 983,  120], [1265,   91], [1570,   66],
                [1862,   43], [2112,   35], [2340,   29],
            ],
            zeromv_mode_cost: [[ 128, 2312], [ 392, 1124]],
            refmv_mode_cost: [
                [ 436,  652], [ 358,  744], [ 224, 1038],
                [ 144, 1348], [ 108, 1588], [  86, 1794],
            ],
            skip_txfm_cost: [[ 168, 1719], [ 512,  512], [1719,  168]],
            intra_inter_cost: [[ 240, 1308], [ 626,  686], [1308,  240], [2048,   90]],
            ref_frame_cost: [ 620, 276, 830, 998],
            switchable_filter_cost: [ 104, 642],
            y_mode_cost: [ 400, 620, 632, 724],
            angle_delta_cost: 312,
            filter_intra_off_cost: 118,
        }
    }
}

/// Cost of signaling an inter mode given the packed neighbor context.
pub(crate) fn cost_mv_ref(
    costs: &ModeCosts,
    mode: PredictionMode,
    mode_context: i16,
) -> i32 {
    debug_assert!(mode.is_inter());

    let newmv_ctx = (mode_context & NEWMV_CTX_MASK) as usize;
    if mode == PredictionMode::NEWMV {
        return costs.newmv_mode_cost[newmv_ctx][0];
    }
    let mut cost = costs.newmv_mode_cost[newmv_ctx][1];

    let zeromv_ctx = ((mode_context >> GLOBALMV_OFFSET) & GLOBALMV_CTX_MASK) as usize;
    if mode == PredictionMode::GLOBALMV {
        return cost + costs.zeromv_mode_cost[zeromv_ctx][0];
    }
    cost += costs.zeromv_mode_cost[zeromv_ctx][1];

    let refmv_ctx = ((mode_context >> REFMV_OFFSET) & REFMV_CTX_MASK) as usize;
    cost + costs.refmv_mode_cost[refmv_ctx][(mode != PredictionMode::NEARESTMV) as usize]
}

/// Flat penalty charged to every intra candidate against an inter best,
/// proportional to the quantizer step.
pub(crate) fn intra_cost_penalty(qindex: u8) -> i32 {
    20 * ac_quant(qindex) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::PredictionMode::*;

    #[test]
    fn mv_ref_cost_chain() {
        let costs = ModeCosts::default();
        /* NEWMV pays only the first branch */
        assert_eq!(cost_mv_ref(&costs, NEWMV, 0), 642);
        /* GLOBALMV pays not-new plus zero branch */
        assert_eq!(cost_mv_ref(&costs, GLOBALMV, 0), 187 + 128);
        /* NEAR costs more than NEAREST in the same context */
        let ctx = 2 | (1 << GLOBALMV_OFFSET) | (1 << REFMV_OFFSET);
        assert!(cost_mv_ref(&costs, NEARMV, ctx) > cost_mv_ref(&costs, NEARESTMV, ctx));
    }

    #[test]
    fn confident_new_context_cheapens_newmv() {
        let costs = ModeCosts::default();
        assert!(cost_mv_ref(&costs, NEWMV, 0) < cost_mv_ref(&costs, NEWMV, 6));
    }

    #[test]
    fn intra_penalty_grows_with_qindex() {
        assert!(intra_cost_penalty(200) > intra_cost_penalty(40));
        assert!(intra_cost_penalty(0) > 0);
    }
}
