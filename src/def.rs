#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

use num_traits::FromPrimitive;

/* pixel type */
pub type pel = u8;

pub(crate) const BIT_DEPTH: usize = 8;

pub(crate) const MAX_SB_SIZE: usize = 128;
pub(crate) const MAX_SB_AREA: usize = MAX_SB_SIZE * MAX_SB_SIZE;

/* mi (4x4) unit log2 */
pub(crate) const MI_SIZE_LOG2: usize = 2;
pub(crate) const MI_SIZE: usize = 1 << MI_SIZE_LOG2;

/* cost of 512 equals one bit */
pub(crate) const PROB_COST_SHIFT: u32 = 9;
pub(crate) const MV_COST_WEIGHT: i64 = 108;

pub const MAX_RD_COST: i64 = i64::MAX;

pub(crate) const REF_FRAMES: usize = 4;
pub(crate) const MB_MODE_COUNT: usize = 8;
pub(crate) const BLOCK_SIZES_ALL: usize = 22;

/* rd cost in fixed point: rate in 1/512 bit units, dist pre-scaled by the
 * caller (sse << 4 convention throughout the encoder side) */
#[inline]
pub(crate) fn RDCOST(rdmult: i64, rate: i32, dist: i64) -> i64 {
    ((rate as i64 * rdmult + (1 << (PROB_COST_SHIFT - 1))) >> PROB_COST_SHIFT) + dist
}

/*****************************************************************************
 * block size
 *****************************************************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, ToPrimitive)]
pub enum BlockSize {
    BLOCK_4X4 = 0,
    BLOCK_4X8,
    BLOCK_8X4,
    BLOCK_8X8,
    BLOCK_8X16,
    BLOCK_16X8,
    BLOCK_16X16,
    BLOCK_16X32,
    BLOCK_32X16,
    BLOCK_32X32,
    BLOCK_32X64,
    BLOCK_64X32,
    BLOCK_64X64,
    BLOCK_64X128,
    BLOCK_128X64,
    BLOCK_128X128,
    BLOCK_4X16,
    BLOCK_16X4,
    BLOCK_8X32,
    BLOCK_32X8,
    BLOCK_16X64,
    BLOCK_64X16,
}

impl BlockSize {
    pub fn width_log2(self) -> usize {
        use self::BlockSize::*;
        match self {
            BLOCK_4X4 | BLOCK_4X8 | BLOCK_4X16 => 2,
            BLOCK_8X4 | BLOCK_8X8 | BLOCK_8X16 | BLOCK_8X32 => 3,
            BLOCK_16X8 | BLOCK_16X16 | BLOCK_16X32 | BLOCK_16X4 | BLOCK_16X64 => 4,
            BLOCK_32X16 | BLOCK_32X32 | BLOCK_32X64 | BLOCK_32X8 => 5,
            BLOCK_64X32 | BLOCK_64X64 | BLOCK_64X128 | BLOCK_64X16 => 6,
            BLOCK_128X64 | BLOCK_128X128 => 7,
        }
    }

    pub fn height_log2(self) -> usize {
        use self::BlockSize::*;
        match self {
            BLOCK_4X4 | BLOCK_8X4 | BLOCK_16X4 => 2,
            BLOCK_4X8 | BLOCK_8X8 | BLOCK_16X8 | BLOCK_32X8 => 3,
            BLOCK_8X16 | BLOCK_16X16 | BLOCK_32X16 | BLOCK_4X16 | BLOCK_64X16 => 4,
            BLOCK_16X32 | BLOCK_32X32 | BLOCK_64X32 | BLOCK_8X32 => 5,
            BLOCK_32X64 | BLOCK_64X64 | BLOCK_128X64 | BLOCK_16X64 => 6,
            BLOCK_64X128 | BLOCK_128X128 => 7,
        }
    }

    #[inline]
    pub fn width(self) -> usize {
        1 << self.width_log2()
    }

    #[inline]
    pub fn height(self) -> usize {
        1 << self.height_log2()
    }

    #[inline]
    pub fn area(self) -> usize {
        self.width() * self.height()
    }

    #[inline]
    pub fn area_log2(self) -> usize {
        self.width_log2() + self.height_log2()
    }

    /* mi units */
    #[inline]
    pub fn width_mi(self) -> usize {
        self.width() >> MI_SIZE_LOG2
    }

    #[inline]
    pub fn height_mi(self) -> usize {
        self.height() >> MI_SIZE_LOG2
    }
}

/*****************************************************************************
 * transform size (square sizes only; the non-RD path never splits further)
 *****************************************************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, ToPrimitive)]
pub enum TxSize {
    TX_4X4 = 0,
    TX_8X8,
    TX_16X16,
    TX_32X32,
    TX_64X64,
}

impl TxSize {
    #[inline]
    pub fn size_log2(self) -> usize {
        self as usize + 2
    }

    #[inline]
    pub fn size(self) -> usize {
        1 << self.size_log2()
    }

    /* largest square tx fitting the block */
    pub fn max_for(bsize: BlockSize) -> TxSize {
        let min_log2 = bsize.width_log2().min(bsize.height_log2());
        match min_log2 {
            2 => TxSize::TX_4X4,
            3 => TxSize::TX_8X8,
            4 => TxSize::TX_16X16,
            5 => TxSize::TX_32X32,
            _ => TxSize::TX_64X64,
        }
    }
}

/*****************************************************************************
 * prediction modes and reference frames
 *****************************************************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, ToPrimitive)]
pub enum PredictionMode {
    DC_PRED = 0,
    V_PRED,
    H_PRED,
    SMOOTH_PRED,
    NEARESTMV,
    NEARMV,
    GLOBALMV,
    NEWMV,
}

impl PredictionMode {
    #[inline]
    pub fn is_inter(self) -> bool {
        self >= PredictionMode::NEARESTMV
    }

    /* index inside the 4-entry intra or inter group */
    #[inline]
    pub(crate) fn offset(self) -> usize {
        if self.is_inter() {
            self as usize - PredictionMode::NEARESTMV as usize
        } else {
            self as usize
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum RefFrame {
    INTRA_FRAME = 0,
    LAST_FRAME,
    GOLDEN_FRAME,
    ALTREF_FRAME,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum InterpFilter {
    EIGHTTAP_REGULAR = 0,
    EIGHTTAP_SMOOTH,
}

pub(crate) const SWITCHABLE_FILTERS: usize = 2;

/*****************************************************************************
 * motion vector, 1/8-pel units
 *****************************************************************************/
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Mv {
    pub row: i16,
    pub col: i16,
}

pub(crate) const INVALID_MV: Mv = Mv {
    row: i16::MIN,
    col: i16::MIN,
};

pub(crate) const ZERO_MV: Mv = Mv { row: 0, col: 0 };

impl Mv {
    #[inline]
    pub fn new(row: i16, col: i16) -> Self {
        Mv { row, col }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != INVALID_MV
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.row == 0 && self.col == 0
    }

    #[inline]
    pub fn has_subpel(self) -> bool {
        (self.row & 7) != 0 || (self.col & 7) != 0
    }

}

/*****************************************************************************
 * per-candidate rd statistics
 *****************************************************************************/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RdStats {
    pub rate: i32,
    /* pre-scaled distortion, sse << 4 convention */
    pub dist: i64,
    /* raw sum of squared residual */
    pub sse: i64,
    pub skip_txfm: bool,
    pub rdcost: i64,
}

impl Default for RdStats {
    fn default() -> Self {
        RdStats {
            rate: 0,
            dist: 0,
            sse: 0,
            skip_txfm: false,
            rdcost: MAX_RD_COST,
        }
    }
}

impl RdStats {
    #[inline]
    pub(crate) fn compute_rdcost(&mut self, rdmult: i64) {
        self.rdcost = RDCOST(rdmult, self.rate, self.dist);
    }
}

/*****************************************************************************
 * final per-block coding decision
 *****************************************************************************/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeInfo {
    pub mode: PredictionMode,
    pub ref_frame: RefFrame,
    pub mv: Mv,
    pub interp_filter: InterpFilter,
    pub tx_size: TxSize,
    pub skip_txfm: bool,
}

impl Default for ModeInfo {
    fn default() -> Self {
        ModeInfo {
            mode: PredictionMode::NEARESTMV,
            ref_frame: RefFrame::LAST_FRAME,
            mv: ZERO_MV,
            interp_filter: InterpFilter::EIGHTTAP_REGULAR,
            tx_size: TxSize::TX_8X8,
            skip_txfm: false,
        }
    }
}

impl ModeInfo {
    #[inline]
    pub fn is_inter(&self) -> bool {
        self.mode.is_inter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn block_size_geometry() {
        assert_eq!(BlockSize::BLOCK_4X4.width(), 4);
        assert_eq!(BlockSize::BLOCK_128X128.height(), 128);
        assert_eq!(BlockSize::BLOCK_16X32.width(), 16);
        assert_eq!(BlockSize::BLOCK_16X32.height(), 32);
        assert_eq!(BlockSize::BLOCK_64X16.area(), 1024);
        for i in 0..BLOCK_SIZES_ALL {
            let bs: BlockSize = FromPrimitive::from_usize(i).unwrap();
            assert_eq!(bs.area(), bs.width() * bs.height());
            assert_eq!(bs.area_log2(), bs.width_log2() + bs.height_log2());
        }
    }

    #[test]
    fn max_tx_fits_block() {
        use num_traits::FromPrimitive;
        for i in 0..BLOCK_SIZES_ALL {
            let bs: BlockSize = FromPrimitive::from_usize(i).unwrap();
            let tx = TxSize::max_for(bs);
            assert!(tx.size() <= bs.width());
            assert!(tx.size() <= bs.height());
        }
    }

    #[test]
    fn mv_validity_and_subpel() {
        assert!(!INVALID_MV.is_valid());
        assert!(Mv::new(8, 0).is_valid());
        assert!(Mv::new(1, 0).has_subpel());
        assert!(!Mv::new(8, -16).has_subpel());
    }

    #[test]
    fn rdcost_units() {
        /* 512 rate units at rdmult 512 is one bit costing 512 */
        assert_eq!(RDCOST(512, 512, 0), 512);
        assert_eq!(RDCOST(512, 0, 100), 100);
        assert!(RDCOST(512, 100, 100) > RDCOST(512, 50, 100));
    }
}
