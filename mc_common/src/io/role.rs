//! I/O role vocabulary (§4.7, §6).
//!
//! `IoRole` maps a string like `"LimitMin1"` to a typed enum variant
//! with axis-number extraction, so the homing/probe/calibration cycles
//! can resolve switches by function rather than by pin number.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Digital input logic interpretation: does the signal read active-high
/// (normally open) or active-low (normally closed)?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DiLogic {
    /// Normally Open — true when the switch is engaged.
    #[serde(rename = "NO")]
    NO = 0,
    /// Normally Closed — inverted (wire break reads as active).
    #[serde(rename = "NC")]
    NC = 1,
}

impl Default for DiLogic {
    fn default() -> Self {
        Self::NO
    }
}

impl FromStr for DiLogic {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO" => Ok(Self::NO),
            "NC" => Ok(Self::NC),
            _ => Err(format!("unknown DiLogic: {s:?}, expected \"NO\" or \"NC\"")),
        }
    }
}

/// Functional I/O role, following the **FunctionAxisNumber** string
/// convention. Global roles have no axis parameter; per-axis roles
/// carry a `u8` axis index (0-based, matching §3's X=0..C=5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoRole {
    /// Emergency-stop input (§7 E-stop).
    EStop,
    /// Probe switch input (G38.2, §4.7).
    Probe,
    /// Per-axis minimum-side limit/homing switch.
    LimitMin(u8),
    /// Per-axis maximum-side limit/homing switch.
    LimitMax(u8),
    /// Per-axis stall-guard digital output from the driver (§4.7 Calibration).
    Stall(u8),
    /// Project-specific extension; unknown strings fall back here.
    Custom(String),
}

impl IoRole {
    /// Return the axis number if this is a per-axis role, else `None`.
    pub fn axis(&self) -> Option<u8> {
        match self {
            Self::LimitMin(n) | Self::LimitMax(n) | Self::Stall(n) => Some(*n),
            _ => None,
        }
    }
}

/// Split a role string into `(prefix, optional_axis_number)`.
///
/// `"LimitMin1"` → `("LimitMin", Some(1))`; `"EStop"` → `("EStop", None)`.
fn split_role_str(s: &str) -> (&str, Option<u8>) {
    let digit_start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    match digit_start {
        Some(i) if i > 0 => {
            let prefix = &s[..i];
            let num_str = &s[i..];
            match num_str.parse::<u8>() {
                Ok(n) => (prefix, Some(n)),
                Err(_) => (s, None),
            }
        }
        _ => (s, None),
    }
}

impl FromStr for IoRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, axis) = split_role_str(s);

        match prefix {
            "EStop" if axis.is_none() => return Ok(Self::EStop),
            "Probe" if axis.is_none() => return Ok(Self::Probe),
            _ => {}
        }

        if let Some(n) = axis {
            match prefix {
                "LimitMin" => return Ok(Self::LimitMin(n)),
                "LimitMax" => return Ok(Self::LimitMax(n)),
                "Stall" => return Ok(Self::Stall(n)),
                _ => {}
            }
        }

        Ok(Self::Custom(s.to_string()))
    }
}

impl fmt::Display for IoRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EStop => write!(f, "EStop"),
            Self::Probe => write!(f, "Probe"),
            Self::LimitMin(n) => write!(f, "LimitMin{n}"),
            Self::LimitMax(n) => write!(f, "LimitMax{n}"),
            Self::Stall(n) => write!(f, "Stall{n}"),
            Self::Custom(s) => write!(f, "{s}"),
        }
    }
}
