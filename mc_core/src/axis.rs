//! Axis data model (§3 Axis).
//!
//! Grounded on `evo_control_unit/src/config.rs`'s raw-config/validated
//! split (parse into a `*Config` struct, then `TryFrom` into the
//! validated runtime type) and `evo_control_unit/src/state/axis.rs`'s
//! per-axis field shape, reinterpreted for CNC axis kinematics rather
//! than torque-loop axis state.

use mc_common::consts::{JERK_SCALE, TRAVEL_LIMIT_DISABLED};
use serde::Deserialize;

use crate::error::ConfigError;

/// Axis operating mode (§3 Axis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisMode {
    Disabled,
    Standard,
    Inhibited,
    /// Rotary axis whose target is expressed in linear units and must
    /// be rewritten through `rotary_radius` (§4.3 target resolution).
    Radius,
}

/// Which switch a homing cycle expects to find the axis's reference at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomingMode {
    Disabled,
    StallMin,
    StallMax,
    SwitchMin,
    SwitchMax,
}

impl HomingMode {
    /// Whether this mode homes toward the minimum-side switch/stall.
    pub fn is_min_side(self) -> bool {
        matches!(self, HomingMode::StallMin | HomingMode::SwitchMin)
    }

    pub fn is_disabled(self) -> bool {
        matches!(self, HomingMode::Disabled)
    }
}

/// Per-axis homing parameters (§3 Axis, §4.7 Homing cycle).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HomingParams {
    pub search_velocity: f64,
    pub latch_velocity: f64,
    pub latch_backoff: f64,
    pub zero_backoff: f64,
    pub jerk: f64,
    pub mode: HomingMode,
}

/// Raw, unvalidated axis configuration as it appears in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    pub mode: AxisMode,
    pub max_velocity: f64,
    pub jerk: f64,
    pub junction_deviation: f64,
    pub travel_min: f64,
    pub travel_max: f64,
    pub homing: HomingParams,
    #[serde(default)]
    pub rotary_radius: f64,
}

/// A validated, ready-to-use axis (§3 Axis).
///
/// Invariant: `travel_min < travel_max` unless soft limits are
/// disabled; `jerk` is strictly positive; `recip_jerk` is cached
/// alongside it so the planner never recomputes a division per block.
#[derive(Debug, Clone)]
pub struct Axis {
    pub mode: AxisMode,
    pub max_velocity: f64,
    jerk: f64,
    recip_jerk: f64,
    pub junction_deviation: f64,
    pub travel_min: f64,
    pub travel_max: f64,
    pub homing: HomingParams,
    pub rotary_radius: f64,
    pub homed: bool,
}

impl Axis {
    #[inline]
    pub fn jerk(&self) -> f64 {
        self.jerk
    }

    #[inline]
    pub fn recip_jerk(&self) -> f64 {
        self.recip_jerk
    }

    /// §4.3 soft-limit test precondition: bounds are real and ordered.
    pub fn soft_limits_enabled(&self) -> bool {
        self.travel_min < self.travel_max
            && self.travel_min != TRAVEL_LIMIT_DISABLED
            && self.travel_max != TRAVEL_LIMIT_DISABLED
    }

    /// §4.3 soft-limit test: only checked for a homed axis with real bounds.
    pub fn within_soft_limits(&self, target: f64) -> bool {
        if !self.homed || !self.soft_limits_enabled() {
            return true;
        }
        target >= self.travel_min && target <= self.travel_max
    }
}

impl TryFrom<AxisConfig> for Axis {
    type Error = ConfigError;

    fn try_from(c: AxisConfig) -> Result<Self, ConfigError> {
        if !(c.jerk > 0.0) {
            return Err(ConfigError::Validation(format!(
                "axis jerk must be strictly positive, got {}",
                c.jerk
            )));
        }
        if c.travel_min != TRAVEL_LIMIT_DISABLED
            && c.travel_max != TRAVEL_LIMIT_DISABLED
            && c.travel_min >= c.travel_max
        {
            return Err(ConfigError::Validation(format!(
                "axis travel_min ({}) must be < travel_max ({})",
                c.travel_min, c.travel_max
            )));
        }
        if matches!(c.mode, AxisMode::Radius) && !(c.rotary_radius > 0.0) {
            return Err(ConfigError::Validation(
                "radius-mode axis requires a positive rotary_radius".into(),
            ));
        }
        Ok(Self {
            mode: c.mode,
            max_velocity: c.max_velocity,
            jerk: c.jerk,
            recip_jerk: 1.0 / (c.jerk * JERK_SCALE),
            junction_deviation: c.junction_deviation,
            travel_min: c.travel_min,
            travel_max: c.travel_max,
            homing: c.homing,
            rotary_radius: c.rotary_radius,
            homed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn homing() -> HomingParams {
        HomingParams {
            search_velocity: 100.0,
            latch_velocity: 10.0,
            latch_backoff: 5.0,
            zero_backoff: 1.0,
            jerk: 50.0,
            mode: HomingMode::SwitchMin,
        }
    }

    fn cfg(jerk: f64, min: f64, max: f64) -> AxisConfig {
        AxisConfig {
            mode: AxisMode::Standard,
            max_velocity: 6000.0,
            jerk,
            junction_deviation: 0.01,
            travel_min: min,
            travel_max: max,
            homing: homing(),
            rotary_radius: 0.0,
        }
    }

    #[test]
    fn recip_jerk_is_cached_scaled() {
        let axis = Axis::try_from(cfg(20.0, 0.0, 100.0)).unwrap();
        assert!((axis.recip_jerk() - 1.0 / (20.0 * JERK_SCALE)).abs() < 1e-20);
    }

    #[test]
    fn rejects_nonpositive_jerk() {
        assert!(Axis::try_from(cfg(0.0, 0.0, 100.0)).is_err());
        assert!(Axis::try_from(cfg(-1.0, 0.0, 100.0)).is_err());
    }

    #[test]
    fn rejects_inverted_travel_window() {
        assert!(Axis::try_from(cfg(20.0, 100.0, 0.0)).is_err());
    }

    #[test]
    fn disabled_sentinel_travel_skips_ordering_check() {
        let axis = Axis::try_from(cfg(20.0, TRAVEL_LIMIT_DISABLED, TRAVEL_LIMIT_DISABLED)).unwrap();
        assert!(!axis.soft_limits_enabled());
    }

    #[test]
    fn soft_limit_only_enforced_when_homed() {
        let mut axis = Axis::try_from(cfg(20.0, 0.0, 100.0)).unwrap();
        assert!(axis.within_soft_limits(150.0)); // not homed yet
        axis.homed = true;
        assert!(!axis.within_soft_limits(150.0));
        assert!(axis.within_soft_limits(50.0));
    }

    #[test]
    fn radius_mode_requires_positive_radius() {
        let mut c = cfg(20.0, 0.0, 100.0);
        c.mode = AxisMode::Radius;
        c.rotary_radius = 0.0;
        assert!(Axis::try_from(c).is_err());
    }
}
