//! Unit conversion helpers (§4.3, §8 round-trip invariant).

use serde::{Deserialize, Serialize};

use crate::consts::MM_PER_INCH;

/// Linear unit a G-code value is expressed in (§3 G-code state `units`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Inch,
    Mm,
}

impl Units {
    /// Convert a value expressed in `self` into canonical millimeters.
    #[inline]
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            Units::Mm => value,
            Units::Inch => value * MM_PER_INCH,
        }
    }

    /// Convert a canonical-mm value back into `self`'s unit.
    #[inline]
    pub fn from_mm(self, value_mm: f64) -> f64 {
        match self {
            Units::Mm => value_mm,
            Units::Inch => value_mm / MM_PER_INCH,
        }
    }
}

/// Convert a rotary-axis value expressed in radius mode (linear units)
/// into degrees of rotation, per §4.3:
/// `target = to_mm(value) * 360 / (2*pi*radius)`.
#[inline]
pub fn radius_mode_to_degrees(value_mm: f64, radius: f64) -> f64 {
    if radius.abs() < f64::EPSILON {
        return 0.0;
    }
    value_mm * 360.0 / (2.0 * std::f64::consts::PI * radius)
}
