//! Motor data model (§3 Motor).
//!
//! Grounded on `evo_control_unit/src/config.rs`'s validate-on-`TryFrom`
//! pattern and `evo_control_unit/src/state/power.rs`'s power-mode enum
//! shape (kept, reinterpreted for stepper power gating rather than
//! servo drive-enable sequencing).

use mc_common::consts::MAX_MICROSTEPS;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorPolarity {
    Normal,
    Reversed,
}

/// When the motor's driver is energized (§3 Motor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorPowerMode {
    Disabled,
    Always,
    InCycle,
    OnlyWhenMoving,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotorConfig {
    pub step_angle: f64,
    pub travel_per_rev: f64,
    pub microsteps: u16,
    pub polarity: MotorPolarity,
    pub power_mode: MotorPowerMode,
    /// Mapped axis index, or `None` for unmapped (§3: "−1 = unmapped").
    #[serde(default)]
    pub axis: Option<usize>,
}

/// A validated, ready-to-use motor (§3 Motor).
#[derive(Debug, Clone)]
pub struct Motor {
    pub step_angle: f64,
    pub travel_per_rev: f64,
    pub microsteps: u16,
    pub polarity: MotorPolarity,
    pub power_mode: MotorPowerMode,
    pub axis: Option<usize>,
    steps_per_unit: f64,
}

impl Motor {
    #[inline]
    pub fn steps_per_unit(&self) -> f64 {
        self.steps_per_unit
    }

    #[inline]
    pub fn invert_direction(&self) -> bool {
        matches!(self.polarity, MotorPolarity::Reversed)
    }
}

impl TryFrom<MotorConfig> for Motor {
    type Error = ConfigError;

    fn try_from(c: MotorConfig) -> Result<Self, ConfigError> {
        if c.microsteps == 0 || !c.microsteps.is_power_of_two() || c.microsteps > MAX_MICROSTEPS {
            return Err(ConfigError::Validation(format!(
                "microsteps must be a power of two in [1, {MAX_MICROSTEPS}], got {}",
                c.microsteps
            )));
        }
        if !(c.step_angle > 0.0) || !(c.travel_per_rev > 0.0) {
            return Err(ConfigError::Validation(
                "step_angle and travel_per_rev must be strictly positive".into(),
            ));
        }
        let steps_per_unit = 360.0 * c.microsteps as f64 / (c.travel_per_rev * c.step_angle);
        Ok(Self {
            step_angle: c.step_angle,
            travel_per_rev: c.travel_per_rev,
            microsteps: c.microsteps,
            polarity: c.polarity,
            power_mode: c.power_mode,
            axis: c.axis,
            steps_per_unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(microsteps: u16) -> MotorConfig {
        MotorConfig {
            step_angle: 1.8,
            travel_per_rev: 5.0,
            microsteps,
            polarity: MotorPolarity::Normal,
            power_mode: MotorPowerMode::InCycle,
            axis: Some(0),
        }
    }

    #[test]
    fn steps_per_unit_matches_formula() {
        let m = Motor::try_from(cfg(16)).unwrap();
        let expected = 360.0 * 16.0 / (5.0 * 1.8);
        assert!((m.steps_per_unit() - expected).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_power_of_two_microsteps() {
        assert!(Motor::try_from(cfg(3)).is_err());
    }

    #[test]
    fn rejects_zero_microsteps() {
        assert!(Motor::try_from(cfg(0)).is_err());
    }

    #[test]
    fn rejects_microsteps_over_max() {
        let mut c = cfg(16);
        c.microsteps = MAX_MICROSTEPS * 2;
        assert!(Motor::try_from(c).is_err());
    }

    #[test]
    fn reversed_polarity_inverts_direction() {
        let mut c = cfg(16);
        c.polarity = MotorPolarity::Reversed;
        let m = Motor::try_from(c).unwrap();
        assert!(m.invert_direction());
    }

    #[test]
    fn unmapped_axis_is_none() {
        let mut c = cfg(16);
        c.axis = None;
        let m = Motor::try_from(c).unwrap();
        assert!(m.axis.is_none());
    }
}
