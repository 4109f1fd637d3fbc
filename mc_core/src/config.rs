//! TOML configuration loader with validation (§13).
//!
//! Grounded on `evo_control_unit/src/config.rs`'s `load_config`/
//! `load_config_from_strings` split (a file-path entry point plus a
//! string entry point used by tests) and its parse-then-validate
//! structure; the validation rules themselves are new (axis/motor
//! arrays instead of coupling-graph acyclicity).

use std::path::Path;

use mc_common::consts::NUM_AXES;
use mc_hal::MotorMapping;

use crate::axis::{Axis, AxisConfig};
use crate::error::ConfigError;
use crate::motor::{Motor, MotorConfig};

/// Raw on-disk machine configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MachineConfigToml {
    pub axes: Vec<AxisConfig>,
    pub motors: Vec<MotorConfig>,
}

/// Validated axis + motor configuration, ready for the machine model
/// and the stepper scheduler.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub axes: Vec<Axis>,
    pub motors: Vec<Motor>,
}

impl MachineConfig {
    /// Build the `mc_hal::MotorMapping` table the scheduler needs from
    /// the kept motor list, one mapping per motor slot up to
    /// [`mc_hal::NUM_MOTORS`].
    pub fn motor_mappings(&self) -> [MotorMapping; mc_hal::NUM_MOTORS] {
        let mut mappings = [MotorMapping::UNMAPPED; mc_hal::NUM_MOTORS];
        for (i, motor) in self.motors.iter().enumerate().take(mc_hal::NUM_MOTORS) {
            mappings[i] = MotorMapping {
                axis: motor.axis.map(|a| a as u8),
                steps_per_unit: motor.steps_per_unit(),
                invert_direction: motor.invert_direction(),
            };
        }
        mappings
    }
}

fn validate(raw: MachineConfigToml) -> Result<MachineConfig, ConfigError> {
    if raw.axes.len() > NUM_AXES {
        return Err(ConfigError::Validation(format!(
            "at most {NUM_AXES} axes are supported, got {}",
            raw.axes.len()
        )));
    }
    if raw.motors.len() > mc_hal::NUM_MOTORS {
        return Err(ConfigError::Validation(format!(
            "at most {} motors are supported, got {}",
            mc_hal::NUM_MOTORS,
            raw.motors.len()
        )));
    }

    let axes = raw
        .axes
        .into_iter()
        .map(Axis::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let motors = raw
        .motors
        .into_iter()
        .map(Motor::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    for motor in &motors {
        if let Some(axis) = motor.axis {
            if axis >= axes.len() {
                return Err(ConfigError::Validation(format!(
                    "motor maps to axis index {axis}, but only {} axes are configured",
                    axes.len()
                )));
            }
        }
    }

    Ok(MachineConfig { axes, motors })
}

/// Load and validate machine configuration from a TOML file on disk.
pub fn load_config(path: &Path) -> Result<MachineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    load_config_from_str(&text)
}

/// Load and validate machine configuration from a TOML string (used by
/// tests and by the demonstration binary's embedded default config).
pub fn load_config_from_str(text: &str) -> Result<MachineConfig, ConfigError> {
    let raw: MachineConfigToml =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[[axes]]
mode = "standard"
max_velocity = 6000.0
jerk = 20.0
junction_deviation = 0.01
travel_min = 0.0
travel_max = 300.0
[axes.homing]
search_velocity = 500.0
latch_velocity = 50.0
latch_backoff = 5.0
zero_backoff = 1.0
jerk = 10.0
mode = "switch_min"

[[motors]]
step_angle = 1.8
travel_per_rev = 5.0
microsteps = 16
polarity = "normal"
power_mode = "in_cycle"
axis = 0
"#
    }

    #[test]
    fn loads_valid_config() {
        let cfg = load_config_from_str(minimal_toml()).unwrap();
        assert_eq!(cfg.axes.len(), 1);
        assert_eq!(cfg.motors.len(), 1);
    }

    #[test]
    fn motor_mapping_carries_steps_per_unit() {
        let cfg = load_config_from_str(minimal_toml()).unwrap();
        let mappings = cfg.motor_mappings();
        assert_eq!(mappings[0].axis, Some(0));
        assert!(mappings[0].steps_per_unit > 0.0);
    }

    #[test]
    fn rejects_motor_mapped_to_missing_axis() {
        let toml = minimal_toml().replace("axis = 0", "axis = 4");
        assert!(load_config_from_str(&toml).is_err());
    }

    #[test]
    fn rejects_too_many_axes() {
        let mut toml = String::new();
        for _ in 0..(NUM_AXES + 1) {
            toml.push_str(
                r#"
[[axes]]
mode = "standard"
max_velocity = 6000.0
jerk = 20.0
junction_deviation = 0.01
travel_min = 0.0
travel_max = 300.0
[axes.homing]
search_velocity = 500.0
latch_velocity = 50.0
latch_backoff = 5.0
zero_backoff = 1.0
jerk = 10.0
mode = "disabled"
"#,
            );
        }
        assert!(load_config_from_str(&toml).is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(load_config_from_str("not valid @@@").is_err());
    }
}
