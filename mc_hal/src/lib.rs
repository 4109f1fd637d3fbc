//! Motion-core hardware abstraction layer.
//!
//! Owns the stepper scheduler (§4.6) and the pluggable stepper-driver
//! capability (§1's "opaque driver" collaborator) that the scheduler
//! programs. `mc_core` drives this crate from its cycle loop; it never
//! reaches past `StepperDriver` into a concrete backend.
//!
//! # Module Structure
//!
//! - [`driver`] - `StepperDriver` trait + driver registry
//! - [`module_status`] - per-motor hardware fault flags
//! - [`drivers`] - driver backend implementations (`simulation`)
//! - [`scheduler`] - the stepper scheduler itself

pub mod driver;
pub mod drivers;
pub mod module_status;
pub mod scheduler;

pub use driver::{DriverError, DriverRegistry, MotorPulseTrain, StepperDriver};
pub use module_status::MotorFaultFlags;
pub use scheduler::{MotorMapping, SchedulerError, SegmentKind, StepperScheduler, NUM_MOTORS};
