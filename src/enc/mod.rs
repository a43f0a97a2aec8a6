pub(crate) mod cost;
pub(crate) mod me;
pub(crate) mod model;
pub mod pickmode;
pub(crate) mod sad;
pub(crate) mod tq;

use std::rc::Rc;

use crate::api::frame::*;
use crate::api::*;
use crate::def::*;
use crate::tbl::*;

use tq::{ac_quant, dc_quant};

pub(crate) const PRED_POOL_SLOTS: usize = 4;

/*****************************************************************************
 * frame-level state
 *****************************************************************************/
pub struct FrameCtx {
    pub width: usize,
    pub height: usize,
    pub qindex: u8,
    /* lambda for RDCOST, derived from the quantizer */
    pub rdmult: i64,
    pub frame_number: u32,
    pub frames_since_golden: i32,
    pub source: Frame,
    /* indexed by RefFrame; the INTRA slot stays empty */
    pub refs: [Option<Rc<Frame>>; REF_FRAMES],
    /* frame-wide default when filter search is off or undecided */
    pub default_filter: InterpFilter,
}

impl FrameCtx {
    pub fn new(source: Frame, qindex: u8) -> Self {
        let width = source.planes[0].width;
        let height = source.planes[0].height;
        /* lambda from the dc step in 8-bit units (step >> 3), so typical
         * mv-signaling rates stay comparable to block distortions */
        let q = (dc_quant(qindex) >> 3) as i64;
        FrameCtx {
            width,
            height,
            qindex,
            rdmult: (88 * q * q / 24).max(1),
            frame_number: 0,
            frames_since_golden: 1,
            source,
            refs: [None, None, None, None],
            default_filter: InterpFilter::EIGHTTAP_REGULAR,
        }
    }

    pub fn set_ref(&mut self, ref_frame: RefFrame, frame: Rc<Frame>) {
        debug_assert!(ref_frame != RefFrame::INTRA_FRAME);
        self.refs[ref_frame as usize] = Some(frame);
    }
}

/*****************************************************************************
 * per-block working state and scratch buffers
 *****************************************************************************/
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SearchStats {
    pub candidates_considered: u32,
    pub candidates_evaluated: u32,
    pub intra_evaluated: u32,
    /* running best rd cost after each evaluated candidate */
    pub rd_trace: Vec<i64>,
}

pub struct Macroblock {
    pub bsize: BlockSize,
    /* position in mi (4-pel) units */
    pub mi_row: usize,
    pub mi_col: usize,

    /* caller-provided content analysis */
    pub source_variance: u32,
    pub source_sad_high: bool,
    pub source_sad_low: bool,
    pub force_skip_low_temp_var: bool,
    pub segment_ref_frame: Option<RefFrame>,
    pub cyclic_refresh_boosted: bool,

    /* neighbor decisions, if coded */
    pub above_mi: Option<ModeInfo>,
    pub left_mi: Option<ModeInfo>,

    /* per-reference predictor metrics, filled by find_predictors */
    pub pred_mv_sad: [u32; REF_FRAMES],
    pub pred_mv0_sad: [u32; REF_FRAMES],
    pub pred_mv1_sad: [u32; REF_FRAMES],

    /* chroma attention flags, decided once per block */
    pub color_sensitivity: [bool; 2],

    /* final prediction of the winning mode */
    pub pred_y: Vec<pel>,
    pub pred_uv: [Vec<pel>; 2],

    pub stats: SearchStats,
}

impl Macroblock {
    pub fn new() -> Self {
        Macroblock {
            bsize: BlockSize::BLOCK_16X16,
            mi_row: 0,
            mi_col: 0,
            source_variance: 0,
            source_sad_high: false,
            source_sad_low: false,
            force_skip_low_temp_var: false,
            segment_ref_frame: None,
            cyclic_refresh_boosted: false,
            above_mi: None,
            left_mi: None,
            pred_mv_sad: [u32::MAX; REF_FRAMES],
            pred_mv0_sad: [u32::MAX; REF_FRAMES],
            pred_mv1_sad: [u32::MAX; REF_FRAMES],
            color_sensitivity: [false; 2],
            pred_y: vec![0; MAX_SB_AREA],
            pred_uv: [vec![0; MAX_SB_AREA / 4], vec![0; MAX_SB_AREA / 4]],
            stats: SearchStats::default(),
        }
    }

    pub fn set_block(&mut self, bsize: BlockSize, mi_row: usize, mi_col: usize) {
        self.bsize = bsize;
        self.mi_row = mi_row;
        self.mi_col = mi_col;
        self.pred_mv_sad = [u32::MAX; REF_FRAMES];
        self.pred_mv0_sad = [u32::MAX; REF_FRAMES];
        self.pred_mv1_sad = [u32::MAX; REF_FRAMES];
        self.color_sensitivity = [false; 2];
        self.stats = SearchStats::default();
    }

    /* pel position of the block origin */
    #[inline]
    pub fn x(&self) -> usize {
        self.mi_col << MI_SIZE_LOG2
    }

    #[inline]
    pub fn y(&self) -> usize {
        self.mi_row << MI_SIZE_LOG2
    }
}

/*****************************************************************************
 * adaptive rd thresholds
 *
 * One base threshold and one running frequency factor per (block size,
 * mode slot). Factors start at 32 (neutral), decay for winners and grow for
 * losers, so rarely-winning modes get pruned earlier over time.
 *****************************************************************************/
pub(crate) const THRESH_FACT_INIT: i32 = 32;

#[derive(Debug, Clone)]
pub struct ThresholdStore {
    pub(crate) thresh: [[i32; THR_MODES]; BLOCK_SIZES_ALL],
    pub(crate) freq_fact: [[i32; THR_MODES]; BLOCK_SIZES_ALL],
    pub(crate) max_fact: i32,
}

impl ThresholdStore {
    pub fn new(qindex: u8, adaptive_rd_thresh: i32) -> Self {
        use num_traits::FromPrimitive;
        let q = ac_quant(qindex) as i64;
        let mut thresh = [[0i32; THR_MODES]; BLOCK_SIZES_ALL];
        for bs in 0..BLOCK_SIZES_ALL {
            let bsize: BlockSize = FromPrimitive::from_usize(bs).unwrap();
            /* base scales with quantizer energy and block area */
            let base = ((q * q) >> 6) * (bsize.area() as i64 / 64).max(1);
            for m in 0..THR_MODES {
                thresh[bs][m] = ((base * THR_MULT[m] as i64) >> 4).min(i32::MAX as i64 - 1) as i32;
            }
        }
        ThresholdStore {
            thresh,
            freq_fact: [[THRESH_FACT_INIT; THR_MODES]; BLOCK_SIZES_ALL],
            max_fact: adaptive_rd_thresh.max(1),
        }
    }

    #[inline]
    pub(crate) fn rd_less_than_thresh(best_rd: i64, thresh: i64, freq_fact: i32) -> bool {
        thresh != i64::MAX && best_rd < (thresh * freq_fact as i64) >> 5
    }

    /// After a block is decided, decay the winning slot's factor and grow the
    /// losing slots of the examined group.
    pub(crate) fn update_freq_facts(&mut self, bsize: BlockSize, winner: usize, group: &[usize]) {
        let row = &mut self.freq_fact[bsize as usize];
        for &m in group {
            if m == winner {
                row[m] -= row[m] >> 4;
            } else {
                row[m] = (row[m] + 64).min(32 * self.max_fact);
            }
        }
    }
}

/*****************************************************************************
 * prediction buffer pool
 *
 * Fixed arena of luma-sized buffers. The evaluator acquires a slot per
 * candidate; the tracker takes ownership of the winner's slot and releases
 * the loser, so the running best prediction is never copied.
 *****************************************************************************/
pub struct PredBufferPool {
    bufs: Vec<Vec<pel>>,
    in_use: [bool; PRED_POOL_SLOTS],
}

impl PredBufferPool {
    pub fn new() -> Self {
        PredBufferPool {
            bufs: (0..PRED_POOL_SLOTS).map(|_| vec![0; MAX_SB_AREA]).collect(),
            in_use: [false; PRED_POOL_SLOTS],
        }
    }

    pub fn acquire(&mut self) -> Option<usize> {
        for i in 0..PRED_POOL_SLOTS {
            if !self.in_use[i] {
                self.in_use[i] = true;
                return Some(i);
            }
        }
        None
    }

    pub fn release(&mut self, idx: usize) {
        debug_assert!(self.in_use[idx]);
        self.in_use[idx] = false;
    }

    #[inline]
    pub fn data(&self, idx: usize) -> &[pel] {
        &self.bufs[idx]
    }

    #[inline]
    pub fn data_mut(&mut self, idx: usize) -> &mut [pel] {
        &mut self.bufs[idx]
    }

    #[cfg(test)]
    pub(crate) fn slots_in_use(&self) -> usize {
        self.in_use.iter().filter(|&&u| u).count()
    }
}
