//! Status message envelope and position/state report (§6 External
//! interfaces).
//!
//! `StatusLevel` is the teacher's `evo_common::config::LogLevel`
//! (trace/debug/info/warn/error, lowercase-serialized) narrowed to the
//! four levels §6 names; `StatusMessage` pairs it with an optional
//! stable code and source location the way a `tracing` event does,
//! and [`emit`] forwards it to `tracing` at the matching level so a
//! subscriber (console, file, whatever the demo binary wires up)
//! renders it uniformly with everything else this crate logs.

use serde::{Deserialize, Serialize};

use mc_common::consts::NUM_AXES;

use crate::cycle::{Cycle, PlanState};

/// Severity of an asynchronous status record (§6 Status message envelope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Debug,
    Warning,
    Error,
}

/// One asynchronous status record (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub code: Option<u32>,
    pub source: Option<&'static str>,
    pub message: String,
}

impl StatusMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: StatusLevel::Info, code: None, source: None, message: message.into() }
    }

    pub fn error(code: u32, source: &'static str, message: impl Into<String>) -> Self {
        Self { level: StatusLevel::Error, code: Some(code), source: Some(source), message: message.into() }
    }

    /// Emit through `tracing` at the level matching `self.level`, with
    /// `code`/`source` attached as structured fields when present.
    pub fn emit(&self) {
        match self.level {
            StatusLevel::Info => tracing::info!(code = ?self.code, source = ?self.source, "{}", self.message),
            StatusLevel::Debug => tracing::debug!(code = ?self.code, source = ?self.source, "{}", self.message),
            StatusLevel::Warning => tracing::warn!(code = ?self.code, source = ?self.source, "{}", self.message),
            StatusLevel::Error => tracing::error!(code = ?self.code, source = ?self.source, "{}", self.message),
        }
    }
}

/// Position and plan/cycle-state report (§6 "Position and state report").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub position_mm: [f64; NUM_AXES],
    pub velocity: f64,
    pub line_number: u32,
    pub plan_state: PlanState,
    pub cycle: Cycle,
}

impl StatusReport {
    pub fn new(
        position_mm: [f64; NUM_AXES],
        velocity: f64,
        line_number: u32,
        plan_state: PlanState,
        cycle: Cycle,
    ) -> Self {
        Self { position_mm, velocity, line_number, plan_state, cycle }
    }

    /// Emit this report as a debug-level status message; reports are
    /// frequent and routine, unlike the warning/error messages raised
    /// by the parser or safety layer.
    pub fn emit(&self) {
        tracing::debug!(
            line = self.line_number,
            velocity = self.velocity,
            plan_state = ?self.plan_state,
            cycle = ?self.cycle,
            position = ?self.position_mm,
            "status report"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_carries_level_and_code() {
        let msg = StatusMessage::error(7, "gcode::parser", "unknown G-code G999");
        assert_eq!(msg.level, StatusLevel::Error);
        assert_eq!(msg.code, Some(7));
    }

    #[test]
    fn info_message_has_no_code() {
        let msg = StatusMessage::info("cycle start");
        assert_eq!(msg.level, StatusLevel::Info);
        assert_eq!(msg.code, None);
    }

    #[test]
    fn status_report_construction_round_trips_fields() {
        let position = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0];
        let report = StatusReport::new(position, 42.5, 17, PlanState::Running, Cycle::Machining);
        assert_eq!(report.position_mm, position);
        assert_eq!(report.line_number, 17);
        assert_eq!(report.velocity, 42.5);
    }
}
