//! The stepper driver capability (§1, §4.6).
//!
//! `spec.md` treats stepper-driver register programming as an opaque
//! capability the scheduler calls into. `StepperDriver` is that
//! boundary: one implementation talks to real silicon over SPI/step/dir
//! pins, another (`drivers::simulation`) fakes the physics so the rest
//! of the workspace can run without hardware. `DriverRegistry` keeps the
//! pluggable-driver shape the teacher used for its HAL backends.

use std::collections::HashMap;

use thiserror::Error;

use crate::module_status::MotorFaultFlags;

/// Errors a driver backend can report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriverError {
    #[error("motor index {0} out of range")]
    MotorOutOfRange(u8),
    #[error("driver '{0}' not found in registry")]
    DriverNotFound(String),
    #[error("driver init failed: {0}")]
    InitFailed(String),
}

/// One motor's commanded step-pulse train for the duration of a segment,
/// as programmed by [`crate::scheduler::StepperScheduler::prep_line`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorPulseTrain {
    /// Timer period in prescaled clock ticks (0 == motor idle this segment).
    pub period_ticks: u16,
    /// Clock prescaler actually selected (1, 2, 4, 8 or 64).
    pub prescaler: u8,
    /// Direction line state (`true` == positive travel), already corrected
    /// for the motor's configured polarity.
    pub direction_positive: bool,
    /// Number of step pulses to emit this segment.
    pub step_count: u32,
}

impl MotorPulseTrain {
    pub const IDLE: Self = Self {
        period_ticks: 0,
        prescaler: 1,
        direction_positive: true,
        step_count: 0,
    };
}

/// Capability exposed by a stepper-driver backend. One call per motor per
/// segment boundary; the HI-priority step timer itself is not modeled
/// here — only the programming interface the LO-priority loader uses.
pub trait StepperDriver: Send {
    fn name(&self) -> &'static str;

    /// Program one motor's pulse train for the upcoming segment.
    fn program_motor(&mut self, motor: u8, train: MotorPulseTrain) -> Result<(), DriverError>;

    /// Enable or disable a motor's driver stage (power mode transitions).
    fn set_enabled(&mut self, motor: u8, enabled: bool) -> Result<(), DriverError>;

    /// Read the DMA-accumulated encoder/step-count proxy for a motor,
    /// in raw steps, since the driver was last reset.
    fn read_encoder(&self, motor: u8) -> Result<i64, DriverError>;

    /// Read latched hardware fault flags for a motor (§7 hardware errors).
    fn read_faults(&self, motor: u8) -> Result<MotorFaultFlags, DriverError>;

    /// Advance the simulated/real world by one segment's worth of time.
    /// Real hardware backends no-op this; the simulation backend uses it
    /// to integrate motion and update switch state.
    fn tick(&mut self, seg_time_s: f64);
}

type DriverFactory = fn() -> Box<dyn StepperDriver>;

/// Registry of driver backends selectable by name, mirroring the
/// teacher's `DriverRegistry` (constructor injection, no global state).
#[derive(Default)]
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        self.factories.insert(name, factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn StepperDriver>, DriverError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DriverError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    pub fn list(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}
