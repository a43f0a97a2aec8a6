use crate::def::*;

/*****************************************************************************
 * candidate enumeration tables
 *****************************************************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RefMode {
    pub ref_frame: RefFrame,
    pub pred_mode: PredictionMode,
}

macro_rules! ref_mode {
    ($r:ident, $m:ident) => {
        RefMode {
            ref_frame: RefFrame::$r,
            pred_mode: PredictionMode::$m,
        }
    };
}

pub(crate) const NUM_INTER_MODES_RT: usize = 9;
pub(crate) const NUM_INTER_MODES_REDUCED: usize = 8;

#[rustfmt::skip]
pub(crate) static REF_MODE_SET_RT: [RefMode; NUM_INTER_MODES_RT] = [
    ref_mode!(LAST_FRAME,   NEARESTMV),
    ref_mode!(LAST_FRAME,   NEARMV),
    ref_mode!(LAST_FRAME,   NEWMV),
    ref_mode!(GOLDEN_FRAME, NEARESTMV),
    ref_mode!(GOLDEN_FRAME, NEARMV),
    ref_mode!(GOLDEN_FRAME, NEWMV),
    ref_mode!(ALTREF_FRAME, NEARESTMV),
    ref_mode!(ALTREF_FRAME, NEARMV),
    ref_mode!(ALTREF_FRAME, NEWMV),
];

#[rustfmt::skip]
pub(crate) static REF_MODE_SET_REDUCED: [RefMode; NUM_INTER_MODES_REDUCED] = [
    ref_mode!(LAST_FRAME,   GLOBALMV),
    ref_mode!(LAST_FRAME,   NEARESTMV),
    ref_mode!(GOLDEN_FRAME, GLOBALMV),
    ref_mode!(LAST_FRAME,   NEARMV),
    ref_mode!(LAST_FRAME,   NEWMV),
    ref_mode!(GOLDEN_FRAME, NEARESTMV),
    ref_mode!(GOLDEN_FRAME, NEARMV),
    ref_mode!(GOLDEN_FRAME, NEWMV),
];

pub(crate) static INTRA_MODE_LIST: [PredictionMode; 4] = [
    PredictionMode::DC_PRED,
    PredictionMode::V_PRED,
    PredictionMode::H_PRED,
    PredictionMode::SMOOTH_PRED,
];

/*****************************************************************************
 * rd threshold bookkeeping indices, one slot per (reference, mode)
 *****************************************************************************/
pub(crate) const THR_NEARESTMV: usize = 0;
pub(crate) const THR_NEARMV: usize = 1;
pub(crate) const THR_GLOBALMV: usize = 2;
pub(crate) const THR_NEWMV: usize = 3;
pub(crate) const THR_NEARESTG: usize = 4;
pub(crate) const THR_NEARG: usize = 5;
pub(crate) const THR_GLOBALG: usize = 6;
pub(crate) const THR_NEWG: usize = 7;
pub(crate) const THR_NEARESTA: usize = 8;
pub(crate) const THR_NEARA: usize = 9;
pub(crate) const THR_GLOBALA: usize = 10;
pub(crate) const THR_NEWA: usize = 11;
pub(crate) const THR_DC: usize = 12;
pub(crate) const THR_V: usize = 13;
pub(crate) const THR_H: usize = 14;
pub(crate) const THR_SMOOTH: usize = 15;

pub(crate) const THR_MODES: usize = 16;

/* [ref_frame][mode offset] */
#[rustfmt::skip]
pub(crate) static MODE_IDX: [[usize; 4]; REF_FRAMES] = [
    [THR_DC,        THR_V,      THR_H,       THR_SMOOTH],
    [THR_NEARESTMV, THR_NEARMV, THR_GLOBALMV, THR_NEWMV],
    [THR_NEARESTG,  THR_NEARG,  THR_GLOBALG,  THR_NEWG],
    [THR_NEARESTA,  THR_NEARA,  THR_GLOBALA,  THR_NEWA],
];

/* base threshold multiplier per slot, applied in 1/16 units */
#[rustfmt::skip]
pub(crate) static THR_MULT: [i32; THR_MODES] = [
    4, 6, 5, 20,
    6, 8, 7, 24,
    6, 8, 7, 24,
    12, 16, 16, 18,
];

#[inline]
pub(crate) fn thr_mode_idx(ref_frame: RefFrame, mode: PredictionMode) -> usize {
    MODE_IDX[ref_frame as usize][mode.offset()]
}

/*****************************************************************************
 * misc lookups
 *****************************************************************************/
#[rustfmt::skip]
pub(crate) static TBL_LOG2: [i8; 129] = [
    -1, 0, 1, -1, 2, -1, -1, -1, 3, -1, -1, -1, -1, -1, -1, -1,
    4, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    5, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    6, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    7,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_tables_order() {
        use crate::def::PredictionMode::*;
        use crate::def::RefFrame::*;
        /* references grouped, NEAREST before NEAR before NEW */
        assert_eq!(REF_MODE_SET_RT[0], ref_mode!(LAST_FRAME, NEARESTMV));
        assert_eq!(REF_MODE_SET_RT[2], ref_mode!(LAST_FRAME, NEWMV));
        assert_eq!(REF_MODE_SET_RT[8], ref_mode!(ALTREF_FRAME, NEWMV));
        /* reduced set leads with zero-motion candidates and has no altref */
        assert_eq!(REF_MODE_SET_REDUCED[0].pred_mode, GLOBALMV);
        assert!(REF_MODE_SET_REDUCED
            .iter()
            .all(|rm| rm.ref_frame != ALTREF_FRAME));
    }

    #[test]
    fn thr_mode_indices_unique() {
        let mut seen = [false; THR_MODES];
        for r in 0..REF_FRAMES {
            for m in 0..4 {
                let idx = MODE_IDX[r][m];
                assert!(!seen[idx]);
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(
            thr_mode_idx(RefFrame::GOLDEN_FRAME, PredictionMode::NEWMV),
            THR_NEWG
        );
        assert_eq!(
            thr_mode_idx(RefFrame::INTRA_FRAME, PredictionMode::SMOOTH_PRED),
            THR_SMOOTH
        );
    }

    #[test]
    fn log2_table() {
        for s in &[1usize, 2, 4, 8, 16, 32, 64, 128] {
            assert_eq!(TBL_LOG2[*s] as u32, (*s as u32).trailing_zeros());
        }
    }
}
