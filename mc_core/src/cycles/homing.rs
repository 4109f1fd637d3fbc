//! Homing cycle (§4.7, G28.2/G28.4): drives each requested axis, in the
//! fixed order Z, X, Y, A, B, C, through clear/search/latch/zero-backoff
//! moves until a machine-zero reference is established.
//!
//! Grounded on the phase-enum/tick shape of
//! `evo_control_unit/src/command/homing.rs`'s `HomingSupervisor`,
//! generalized from a single axis to the multi-axis sequence of
//! `original_source/src/cycle_homing.c`'s `cm_homing_cycle_start` /
//! `_homing_axis_search` / `_homing_axis_latch` / `_homing_axis_zero_backoff`.
//! Because this crate has no interrupt-driven feedhold path to hand a
//! switch-triggered abort to, the cycle is driven explicitly: the
//! caller issues [`HomingCycle::next_move`]'s move, polls the switch
//! bank each tick, and reports back with [`HomingCycle::advance`].

use mc_common::consts::NUM_AXES;
use mc_common::io::role::IoRole;
use mc_common::io::switches::SwitchBank;

use crate::axis::{Axis, HomingMode};
use crate::error::CycleError;

/// Fixed homing order (§4.7): Z, X, Y, A, B, C, filtered down to the
/// axes actually requested by the G28.2/G28.4 block.
const HOMING_ORDER: [usize; NUM_AXES] = [2, 0, 1, 3, 4, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Backing off an already-active switch before the real search.
    ClearSwitch,
    /// Driving toward the homing switch at search velocity.
    Search,
    /// Backing away from the (now active) switch at latch velocity.
    Latch,
    /// Final clearance move at search velocity before zeroing.
    ZeroBackoff,
}

/// What happened to the move just reported to [`HomingCycle::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingEvent {
    /// The programmed move ran to completion without the switch firing.
    MoveComplete,
    /// The homing switch's engaged/disengaged state just changed.
    SwitchChanged(bool),
}

/// A relative move the caller must queue on the planner next, plus the
/// jerk it should be planned with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomingMove {
    pub axis: usize,
    pub distance: f64,
    pub velocity: f64,
    pub jerk: f64,
}

/// Result of starting or advancing the cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HomingOutcome {
    /// Queue this move and keep calling `advance` as it progresses.
    Move(HomingMove),
    /// `axis` just finished homing; position should be set to zero on
    /// it (only when the cycle was started with `set_coordinates`) and
    /// `Axis::homed` set. Call `next_move` again to continue.
    AxisHomed { axis: usize, zero_position: bool },
    /// Every requested axis is homed.
    Complete,
}

/// Per-axis homing cycle sequencer (§4.7).
pub struct HomingCycle {
    remaining: Vec<usize>,
    current: Option<usize>,
    phase: Phase,
    min_side: bool,
    set_coordinates: bool,
}

fn homing_role(axis: usize, min_side: bool) -> IoRole {
    if min_side {
        IoRole::LimitMin(axis as u8)
    } else {
        IoRole::LimitMax(axis as u8)
    }
}

fn opposing_role(axis: usize, min_side: bool) -> IoRole {
    homing_role(axis, !min_side)
}

impl HomingCycle {
    /// `requested[axis]` selects which axes to home; `set_coordinates`
    /// is the G28.2 (true) vs G28.4 (false, "set reference only")
    /// distinction (step 7).
    pub fn new(requested: [bool; NUM_AXES], set_coordinates: bool) -> Self {
        let remaining = HOMING_ORDER.iter().copied().filter(|&a| requested[a]).collect();
        Self {
            remaining,
            current: None,
            phase: Phase::ClearSwitch,
            min_side: true,
            set_coordinates,
        }
    }

    pub fn current_axis(&self) -> Option<usize> {
        self.current
    }

    /// Step 1-3: pop the next requested axis, determine its homing
    /// switch, and either back off an already-engaged switch or go
    /// straight to the search move.
    pub fn next_move(&mut self, axes: &[Axis], switches: &SwitchBank) -> Result<HomingOutcome, CycleError> {
        let Some(axis) = self.remaining.first().copied() else {
            return Ok(HomingOutcome::Complete);
        };
        self.remaining.remove(0);
        self.current = Some(axis);

        let mode = axes[axis].homing.mode;
        if mode.is_disabled() {
            return Ok(HomingOutcome::AxisHomed { axis, zero_position: false });
        }
        self.min_side = mode.is_min_side();

        let role = homing_role(axis, self.min_side);
        let opposing = opposing_role(axis, self.min_side);
        let Some(home_engaged) = switches.read(&role) else {
            return Err(CycleError::NoHomingSwitch(axis));
        };
        let opposing_engaged = switches.read(&opposing).unwrap_or(false);

        let homing = &axes[axis].homing;
        if home_engaged || opposing_engaged {
            self.phase = Phase::ClearSwitch;
            let sign = if self.min_side { 1.0 } else { -1.0 };
            return Ok(HomingOutcome::Move(HomingMove {
                axis,
                distance: sign * homing.latch_backoff,
                velocity: homing.search_velocity,
                jerk: homing.jerk,
            }));
        }

        self.phase = Phase::Search;
        Ok(HomingOutcome::Move(self.search_move(axis, &axes[axis])))
    }

    fn search_move(&self, axis: usize, a: &Axis) -> HomingMove {
        let sign = if self.min_side { -1.0 } else { 1.0 };
        let travel = (a.travel_max - a.travel_min + a.homing.latch_backoff).abs();
        HomingMove { axis, distance: sign * travel, velocity: a.homing.search_velocity, jerk: a.homing.jerk }
    }

    /// Report what happened to the in-flight move and get either the
    /// next move in this axis's sequence or a homed/complete signal.
    pub fn advance(
        &mut self,
        event: HomingEvent,
        axes: &[Axis],
        switches: &SwitchBank,
    ) -> Result<HomingOutcome, CycleError> {
        let axis = self.current.ok_or(CycleError::CycleBusy)?;
        let a = &axes[axis];

        match (self.phase, event) {
            (Phase::ClearSwitch, _) => {
                self.phase = Phase::Search;
                Ok(HomingOutcome::Move(self.search_move(axis, a)))
            }
            (Phase::Search, HomingEvent::SwitchChanged(true)) => {
                self.phase = Phase::Latch;
                let sign = if self.min_side { 1.0 } else { -1.0 };
                Ok(HomingOutcome::Move(HomingMove {
                    axis,
                    distance: sign * a.homing.latch_backoff,
                    velocity: a.homing.latch_velocity,
                    jerk: a.homing.jerk,
                }))
            }
            (Phase::Search, _) => Err(CycleError::SwitchNotFound(axis)),
            (Phase::Latch, HomingEvent::SwitchChanged(false)) => {
                self.phase = Phase::ZeroBackoff;
                let sign = if self.min_side { 1.0 } else { -1.0 };
                Ok(HomingOutcome::Move(HomingMove {
                    axis,
                    distance: sign * a.homing.zero_backoff,
                    velocity: a.homing.search_velocity,
                    jerk: a.homing.jerk,
                }))
            }
            (Phase::Latch, _) => Err(CycleError::SwitchDidNotClear(axis)),
            (Phase::ZeroBackoff, _) => {
                self.current = None;
                let _ = switches;
                Ok(HomingOutcome::AxisHomed { axis, zero_position: self.set_coordinates })
            }
        }
    }
}
