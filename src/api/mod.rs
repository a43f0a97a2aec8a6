pub mod frame;

use thiserror::Error;

pub use crate::def::{
    BlockSize, InterpFilter, ModeInfo, Mv, PredictionMode, RdStats, RefFrame, TxSize, MAX_RD_COST,
};
pub use frame::{Frame, Plane};

#[derive(Debug, Error, PartialEq)]
pub enum RavtError {
    #[error("block lies outside the frame")]
    BlockOutOfBounds,
    #[error("no reference frame configured for inter search")]
    MissingReference,
    #[error("prediction buffer pool exhausted")]
    PredPoolExhausted,
}

/// Rate-control mode of the surrounding encoder. Several decision biases only
/// apply under CBR, where overshooting a frame budget is expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcMode {
    Vbr,
    Cbr,
}

/// All speed-feature and runtime flags consumed by the mode decision, in one
/// plain struct. Passed down by reference; nothing in the crate reads global
/// state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub speed: u8,
    pub rc_mode: RcMode,
    /// use the GLOBALMV-biased reduced candidate table
    pub use_reduced_set: bool,
    pub use_golden_ref: bool,
    pub use_alt_ref: bool,
    /// 0 = off, 1 = drop distant-reference NEARMV, 2 = also drop large-block
    /// and NEWMV candidates on distant references
    pub prune_ref_search: u8,
    /// allow early termination even on the first candidate
    pub aggressive_skip: bool,
    /// 0 disables the adaptive threshold reject and its factor updates;
    /// otherwise the maximum growth factor multiplier
    pub adaptive_rd_thresh: i32,
    pub filter_search: bool,
    /// golden frame is temporally close (affects GOLDEN handling under CBR)
    pub gf_temporal_ref: bool,
    /// honor the caller-computed low temporal variance flag
    pub short_circuit_low_temp_var: bool,
    /// estimate intra luma cost with the model instead of the exact transform
    pub use_modeled_non_rd_cost: bool,
    pub skip_intra_pred_if_tx_skip: bool,
    /// largest block size on which intra is still tried as a fallback
    pub max_intra_size: BlockSize,
    /// full-pel search step parameter, larger starts coarser
    pub me_step_param: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            speed: 7,
            rc_mode: RcMode::Cbr,
            use_reduced_set: false,
            use_golden_ref: true,
            use_alt_ref: true,
            prune_ref_search: 0,
            aggressive_skip: false,
            adaptive_rd_thresh: 4,
            filter_search: true,
            gf_temporal_ref: false,
            short_circuit_low_temp_var: true,
            use_modeled_non_rd_cost: false,
            skip_intra_pred_if_tx_skip: true,
            max_intra_size: BlockSize::BLOCK_32X32,
            me_step_param: 2,
        }
    }
}
