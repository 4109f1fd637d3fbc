//! # Motion core
//!
//! The CNC motion-controller brain: G-code front end, planner, segment
//! executor, and the run/hold/flush/resume state machine that
//! arbitrates them, plus the cycle layer (homing/probing/jogging) and
//! safety monitoring built on top.
//!
//! ## Pipeline
//!
//! 1. **gcode** — normalize, tokenize, evaluate expressions, parse and
//!    dispatch one block against the machine model.
//! 2. **machine** — the modal-state singleton the parser mutates.
//! 3. **planner** — move queue, junction-velocity analysis, trapezoid fit.
//! 4. **executor** — turns planned blocks into timed step segments.
//! 5. **cycle** — the plan-state machine servicing hold/flush/resume.
//! 6. **safety** — hardware fault monitoring and the e-stop latch.

#![deny(clippy::disallowed_types)]

pub mod arc;
pub mod axis;
pub mod config;
pub mod cycle;
pub mod cycles;
pub mod error;
pub mod executor;
pub mod gcode;
pub mod machine;
pub mod motor;
pub mod planner;
pub mod report;
pub mod safety;
