//! One planner ring entry (§3 Planner buffer).
//!
//! Grounded on `original_source/src/plan/buffer.c`'s field list, kept
//! as a single flat struct rather than a linked node — the ring itself
//! is a fixed-capacity array (§9's recommended re-architecture), so
//! `previous`/`next` linkage collapses to index arithmetic in
//! [`crate::planner::Planner`].

use mc_common::consts::NUM_AXES;

/// A buffer's place in the `empty -> new -> init -> active -> empty`
/// lifecycle, with an optional `restart` detour for hold splits (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Empty,
    New,
    Init,
    Active,
    Restart,
}

impl Default for BufferState {
    fn default() -> Self {
        Self::Empty
    }
}

/// What a buffer's callback does (§9: "a small tagged variant rather
/// than a raw function pointer").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferKind {
    Aline,
    Dwell,
    /// Opaque token for `mc_hal::scheduler::SegmentKind::Command`.
    Command(u64),
}

impl Default for BufferKind {
    fn default() -> Self {
        Self::Aline
    }
}

/// One queued action (§3 Planner buffer).
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub state: BufferState,
    pub kind: BufferKind,
    /// Set when the buffer transitions to `New`; used by the executor's
    /// startup-delay check (§4.5).
    pub arrival_time: f64,

    pub target: [f64; NUM_AXES],
    pub unit: [f64; NUM_AXES],
    pub work_offset: [f64; NUM_AXES],
    pub length: f64,
    pub head_length: f64,
    pub body_length: f64,
    pub tail_length: f64,

    pub entry_velocity: f64,
    pub cruise_velocity: f64,
    pub exit_velocity: f64,
    pub entry_vmax: f64,
    pub cruise_vmax: f64,
    pub exit_vmax: f64,
    pub delta_vmax: f64,
    pub braking_velocity: f64,
    pub jerk: f64,
    pub recip_jerk: f64,
    pub cbrt_jerk: f64,

    /// Naive (pre-trapezoid) move time, from the move-time calculation
    /// (§4.4); not itself named as a buffer field by the spec but
    /// required by `calculate_trapezoid`'s rules 1 and 2.
    pub naive_move_time: f64,

    pub replannable: bool,
    /// Stop-at-end flag: plan this buffer's exit to zero regardless of
    /// backplanner convergence (feedhold / exact-stop path control).
    pub hold: bool,

    pub line_number: u32,
    pub value: f64,
    pub dwell_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buffer_is_empty() {
        let b = Buffer::default();
        assert_eq!(b.state, BufferState::Empty);
        assert_eq!(b.kind, BufferKind::Aline);
    }
}
