//! Calibration cycle (§4.7): per motor, drive toward a hard stop at
//! jog acceleration until the driver's stall-guard flags a stall,
//! record the encoder position that produced, then hand off to a
//! re-home.
//!
//! New code — no direct `original_source` analog (buildbotics has no
//! stall-based calibration cycle); grounded on `mc_hal::module_status::
//! MotorFaultFlags::STALL` for the stall signal this cycle treats as
//! its completion trigger rather than a hardware alarm, matching that
//! module's own doc comment that a stall's meaning is cycle-dependent.

use mc_hal::module_status::MotorFaultFlags;

/// Per-motor calibration sequencer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Accelerating,
    Done,
}

pub struct CalibrateCycle {
    motor: u8,
    phase: Phase,
    velocity: f64,
    acceleration: f64,
    direction: f64,
}

/// One tick's result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrateOutcome {
    /// Keep driving at this velocity.
    Driving { velocity: f64 },
    /// Stall detected; `encoder_position` is this motor's calibration number.
    Stalled { encoder_position: i64 },
}

impl CalibrateCycle {
    pub fn new(motor: u8, acceleration: f64, direction: f64) -> Self {
        Self { motor, phase: Phase::Accelerating, velocity: 0.0, acceleration, direction: direction.signum() }
    }

    pub fn motor(&self) -> u8 {
        self.motor
    }

    /// Advance one tick: accelerate unless the driver's fault flags show
    /// a stall, in which case latch `Done` and report the encoder count
    /// at the moment of the stall.
    pub fn tick(&mut self, segment_time: f64, fault_flags: MotorFaultFlags, encoder_position: i64) -> CalibrateOutcome {
        if self.phase == Phase::Done {
            return CalibrateOutcome::Stalled { encoder_position };
        }
        if fault_flags.contains(MotorFaultFlags::STALL) {
            self.phase = Phase::Done;
            return CalibrateOutcome::Stalled { encoder_position };
        }
        self.velocity += self.acceleration * segment_time * self.direction;
        CalibrateOutcome::Driving { velocity: self.velocity }
    }
}
