//! Error vocabulary (§7): one enum family per propagation class.
//!
//! Input and geometric errors bounce straight back to the parser's
//! caller — one block, one status. Runtime-arithmetic errors never
//! reach a caller at all: the offending segment is skipped and the
//! step-error ledger (`mc_hal::scheduler`) makes up the position on
//! later segments. Hardware and limit-switch errors are latched per
//! motor/axis by [`crate::safety`] and drive the plan-state machine
//! toward `Estopped`.

use thiserror::Error;

/// Rejects a block; the machine model is left unchanged (§7 Input errors).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("malformed number at column {0}")]
    BadNumber(usize),
    #[error("unterminated variable reference")]
    UnterminatedVariable,
    #[error("unsupported function")]
    UnsupportedFunction,
    #[error("malformed command")]
    MalformedCommand,
    #[error("unknown G-code G{0}")]
    UnknownGCode(u32),
    #[error("unknown M-code M{0}")]
    UnknownMCode(u32),
    #[error("repeated modal group member in one block")]
    ModalGroupConflict,
    #[error("axis word missing for probe")]
    ProbeAxisMissing,
    #[error("feed rate not specified")]
    FeedRateNotSpecified,
    #[error(transparent)]
    Expression(#[from] crate::gcode::expr::ExprError),
}

/// Rejects a block; the machine model is left unchanged (§7 Geometric errors).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometricError {
    #[error("soft limit exceeded on axis {axis}")]
    SoftLimitExceeded { axis: usize },
    #[error("probe destination is within the minimum travel of the current position")]
    InvalidProbeDestination,
    #[error("probe switch already asserted before motion began")]
    MovedDuringProbe,
    #[error("arc radius is degenerate (I/J/K resolve to ~zero)")]
    DegenerateArc,
}

/// One block's parse/dispatch result: input and geometric errors share
/// a propagation policy (§7), so the parser's public entry point
/// returns this combined type rather than two separate `Result`s.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Geometric(#[from] GeometricError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Non-fatal; the offending segment is skipped (§7 Runtime-arithmetic errors).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("segment time is zero, subnormal, NaN or infinite")]
    NonFiniteSegmentTime,
    #[error("step-correction threshold exceeded on motor {0}")]
    StepCorrectionExceeded(u8),
}

/// Alarm: indicates a scheduling bug upstream (§7 Queue errors).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("planner buffer full with headroom assumed by the caller")]
    BufferFull,
}

/// Raised by a cycle FSM (§4.7 homing/probe/jog/calibrate) when it
/// cannot proceed; distinct from `InputError`/`GeometricError` since it
/// aborts a whole multi-move cycle rather than a single block.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    #[error("axis {0} has no homing switch configured")]
    NoHomingSwitch(usize),
    #[error("axis {0} homing switch never triggered within the search travel")]
    SwitchNotFound(usize),
    #[error("axis {0} homing switch never cleared during the latch move")]
    SwitchDidNotClear(usize),
    #[error("a cycle is already active")]
    CycleBusy,
}

/// Configuration load/validate error (§13), returned by [`crate::config`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}
