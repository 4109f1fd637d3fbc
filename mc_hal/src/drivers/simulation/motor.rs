//! Per-motor physics for [`super::SimulatedDriver`] (§4.6, §4.7).
//!
//! Each simulated motor integrates the commanded pulse train into a
//! step count, derives an encoder reading (an exact copy, since this is
//! a noiseless simulation — real hardware can and does disagree), and
//! trips limit/stall switches from position thresholds configured by
//! the test harness.

use mc_common::io::role::{DiLogic, IoRole};
use mc_common::io::switches::SwitchBank;

use crate::module_status::MotorFaultFlags;

/// A simulated motor's full physical + fault state.
pub struct SimMotor {
    /// Accumulated step position (signed; direction folded in).
    pub position_steps: i64,
    /// Encoder proxy — equals `position_steps` absent injected slip.
    pub encoder_steps: i64,
    /// Steps of slip to inject on the next `tick` (test hook).
    pub inject_slip_steps: i64,
    faults: MotorFaultFlags,
    /// Position (in steps) at/beyond which the min-side limit trips.
    limit_min_steps: Option<i64>,
    /// Position (in steps) at/beyond which the max-side limit trips.
    limit_max_steps: Option<i64>,
}

impl SimMotor {
    pub fn new() -> Self {
        Self {
            position_steps: 0,
            encoder_steps: 0,
            inject_slip_steps: 0,
            faults: MotorFaultFlags::empty(),
            limit_min_steps: None,
            limit_max_steps: None,
        }
    }

    pub fn set_limit_thresholds(&mut self, min_steps: Option<i64>, max_steps: Option<i64>) {
        self.limit_min_steps = min_steps;
        self.limit_max_steps = max_steps;
    }

    pub fn apply_pulses(&mut self, direction_positive: bool, step_count: u32) {
        let delta = step_count as i64;
        self.position_steps += if direction_positive { delta } else { -delta };
        self.encoder_steps = self.position_steps + self.inject_slip_steps;
        self.inject_slip_steps = 0;
    }

    pub fn inject_fault(&mut self, flags: MotorFaultFlags) {
        self.faults |= flags;
    }

    pub fn clear_faults(&mut self) {
        self.faults = MotorFaultFlags::empty();
    }

    pub fn faults(&self) -> MotorFaultFlags {
        self.faults
    }

    /// Publish this motor's limit-switch state into `bank` under roles
    /// for `axis`, and latch a stall fault flag bit into the bank too.
    pub fn publish_switches(&self, axis: u8, bank: &mut SwitchBank) {
        let min_engaged = self
            .limit_min_steps
            .is_some_and(|t| self.position_steps <= t);
        let max_engaged = self
            .limit_max_steps
            .is_some_and(|t| self.position_steps >= t);
        bank.bind(IoRole::LimitMin(axis), axis as u16 * 2, DiLogic::NO);
        bank.bind(IoRole::LimitMax(axis), axis as u16 * 2 + 1, DiLogic::NO);
        bank.set(IoRole::LimitMin(axis), min_engaged);
        bank.set(IoRole::LimitMax(axis), max_engaged);
        bank.set(IoRole::Stall(axis), self.faults.contains(MotorFaultFlags::STALL));
    }
}

impl Default for SimMotor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_pulses_positive_direction() {
        let mut m = SimMotor::new();
        m.apply_pulses(true, 100);
        assert_eq!(m.position_steps, 100);
        assert_eq!(m.encoder_steps, 100);
    }

    #[test]
    fn apply_pulses_negative_direction() {
        let mut m = SimMotor::new();
        m.apply_pulses(false, 40);
        assert_eq!(m.position_steps, -40);
    }

    #[test]
    fn injected_slip_applies_once() {
        let mut m = SimMotor::new();
        m.inject_slip_steps = 3;
        m.apply_pulses(true, 100);
        assert_eq!(m.encoder_steps, 103);
        m.apply_pulses(true, 10);
        assert_eq!(m.encoder_steps, 110);
    }

    #[test]
    fn limit_min_trips_at_threshold() {
        let mut m = SimMotor::new();
        m.set_limit_thresholds(Some(-50), None);
        m.apply_pulses(false, 60);
        let mut bank = SwitchBank::new();
        m.publish_switches(0, &mut bank);
        assert_eq!(bank.read(&IoRole::LimitMin(0)), Some(true));
        assert_eq!(bank.read(&IoRole::LimitMax(0)), Some(false));
    }

    #[test]
    fn faults_clear() {
        let mut m = SimMotor::new();
        m.inject_fault(MotorFaultFlags::STALL);
        assert!(!m.faults().is_empty());
        m.clear_faults();
        assert!(m.faults().is_empty());
    }
}
