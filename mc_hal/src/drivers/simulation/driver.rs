//! Software-simulated stepper driver backend.
//!
//! Implements [`StepperDriver`] over an array of [`SimMotor`]s so the
//! rest of the workspace (scheduler, cycle FSMs, integration tests) can
//! run without physical hardware, the same role the teacher's
//! `SimulationDriver` played for its HAL.

use mc_common::io::switches::SwitchBank;

use crate::driver::{DriverError, MotorPulseTrain, StepperDriver};
use crate::module_status::MotorFaultFlags;

use super::motor::SimMotor;

pub struct SimulatedDriver {
    motors: Vec<SimMotor>,
    enabled: Vec<bool>,
    switches: SwitchBank,
}

impl SimulatedDriver {
    pub fn new(motor_count: usize) -> Self {
        Self {
            motors: (0..motor_count).map(|_| SimMotor::new()).collect(),
            enabled: vec![false; motor_count],
            switches: SwitchBank::new(),
        }
    }

    pub fn motor_count(&self) -> usize {
        self.motors.len()
    }

    /// Test/harness hook: wire a motor's limit-switch trip points.
    pub fn set_limit_thresholds(&mut self, motor: u8, min_steps: Option<i64>, max_steps: Option<i64>) {
        if let Some(m) = self.motors.get_mut(motor as usize) {
            m.set_limit_thresholds(min_steps, max_steps);
        }
    }

    /// Test/harness hook: force a fault flag onto a motor.
    pub fn inject_fault(&mut self, motor: u8, flags: MotorFaultFlags) {
        if let Some(m) = self.motors.get_mut(motor as usize) {
            m.inject_fault(flags);
        }
    }

    pub fn switches(&self) -> &SwitchBank {
        &self.switches
    }

    pub fn position_steps(&self, motor: u8) -> Result<i64, DriverError> {
        self.motors
            .get(motor as usize)
            .map(|m| m.position_steps)
            .ok_or(DriverError::MotorOutOfRange(motor))
    }

    fn motor_mut(&mut self, motor: u8) -> Result<&mut SimMotor, DriverError> {
        self.motors
            .get_mut(motor as usize)
            .ok_or(DriverError::MotorOutOfRange(motor))
    }
}

impl StepperDriver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn program_motor(&mut self, motor: u8, train: MotorPulseTrain) -> Result<(), DriverError> {
        let m = self.motor_mut(motor)?;
        m.apply_pulses(train.direction_positive, train.step_count);
        Ok(())
    }

    fn set_enabled(&mut self, motor: u8, enabled: bool) -> Result<(), DriverError> {
        *self
            .enabled
            .get_mut(motor as usize)
            .ok_or(DriverError::MotorOutOfRange(motor))? = enabled;
        Ok(())
    }

    fn read_encoder(&self, motor: u8) -> Result<i64, DriverError> {
        self.motors
            .get(motor as usize)
            .map(|m| m.encoder_steps)
            .ok_or(DriverError::MotorOutOfRange(motor))
    }

    fn read_faults(&self, motor: u8) -> Result<MotorFaultFlags, DriverError> {
        self.motors
            .get(motor as usize)
            .map(|m| m.faults())
            .ok_or(DriverError::MotorOutOfRange(motor))
    }

    fn tick(&mut self, _seg_time_s: f64) {
        for (axis, motor) in self.motors.iter().enumerate() {
            motor.publish_switches(axis as u8, &mut self.switches);
        }
    }
}
