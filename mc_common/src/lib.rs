//! Motion-core common library.
//!
//! Shared types used by both `mc_hal` and `mc_core`: machine-wide
//! constants, the I/O role vocabulary and switch bank, unit
//! conversion, and the persisted settings table.
//!
//! # Module Structure
//!
//! - [`consts`] - dimensional and tuning constants
//! - [`io`] - I/O role vocabulary and switch-state bank
//! - [`units`] - inch/mm conversion
//! - [`settings`] - persisted typed key/value settings store

pub mod consts;
pub mod io;
pub mod settings;
pub mod units;
