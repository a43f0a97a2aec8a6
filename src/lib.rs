#![allow(warnings)]
#![allow(dead_code)]

#[macro_use]
extern crate num_derive;

#[macro_use]
extern crate lazy_static;

pub mod api;
pub mod def;
pub mod enc;
pub mod ipred;
pub mod mc;
pub mod tbl;

#[cfg(feature = "bench")]
pub mod bench {
    pub mod mc {
        pub use crate::mc::mc_block;
    }
    pub mod sad {
        pub use crate::enc::sad::sad;
    }
    pub mod tq {
        pub use crate::enc::tq::{ac_quant, dc_quant, hadamard_16x16, hadamard_8x8, quantize_lp};
    }
}
