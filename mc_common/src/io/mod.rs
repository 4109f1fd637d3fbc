//! I/O role vocabulary and switch-state bank shared between `mc_hal`
//! and `mc_core` (§4.7, §6).

pub mod role;
pub mod switches;
