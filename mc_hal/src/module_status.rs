//! Per-motor hardware fault flags (§7 "Hardware errors").
//!
//! A stall during homing is signalling, not a fault — callers
//! distinguish that case themselves by checking the active cycle state
//! before treating [`MotorFaultFlags::STALL`] as an alarm.

use bitflags::bitflags;

bitflags! {
    /// Latched, motor-originated hardware fault bits. Driver backends
    /// OR bits in as they observe them; `safety.rs` in `mc_core` decides
    /// which bits alarm and which are informational.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MotorFaultFlags: u8 {
        /// Generic driver fault line asserted.
        const DRIVER_FAULT       = 0b0000_0001;
        /// Over-temperature warning (pre-shutdown).
        const OVER_TEMP_WARNING  = 0b0000_0010;
        /// Over-temperature shutdown (driver disabled itself).
        const OVER_TEMP_SHUTDOWN = 0b0000_0100;
        /// A motor phase is shorted to ground.
        const SHORT_TO_GROUND    = 0b0000_1000;
        /// A motor phase has no detectable load (broken wire/coil).
        const OPEN_LOAD          = 0b0001_0000;
        /// Stall-guard threshold exceeded.
        const STALL              = 0b0010_0000;
    }
}

impl MotorFaultFlags {
    /// Bits that are always an alarm regardless of the active cycle.
    pub fn hard_faults(self) -> Self {
        self & (Self::DRIVER_FAULT
            | Self::OVER_TEMP_SHUTDOWN
            | Self::SHORT_TO_GROUND
            | Self::OPEN_LOAD)
    }
}
