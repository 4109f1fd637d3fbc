//! Plan-state machine (§4.8): run/hold/flush/resume cooperative FSM and
//! cycle-kind arbitration, serviced once per main-loop iteration.
//!
//! Grounded on `original_source/src/plan/state.c` (`mp_state_callback`,
//! `mp_set_cycle`, `mp_is_quiescent`). Request flags are set
//! asynchronously (from a switch debounce handler, a command byte, a
//! jog key) and resolved synchronously by [`StateMachine::tick`], per
//! the exact rules documented on that function.

use mc_hal::scheduler::StepperScheduler;
use tracing::instrument;

use crate::executor::Runtime;
use crate::machine::Machine;
use crate::planner::Planner;

/// Overall run state (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Ready,
    Running,
    /// Decelerating toward a hold point; not yet stopped.
    Stopping,
    Holding,
    /// Unrecoverable without an external acknowledgement (§7 E-stop).
    Estopped,
}

/// Which higher-level cycle owns the planner queue right now (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Machining,
    Homing,
    Probing,
    Calibrating,
    Jogging,
}

/// Raised by [`StateMachine::set_cycle`] when a cycle switch would
/// collide with one already in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CycleTransitionError {
    #[error("cannot start a cycle while not ready")]
    NotReady,
    #[error("another cycle is already active")]
    CycleBusy,
}

/// Cooperative plan-state FSM (§4.8, §5). Owns only the state/cycle and
/// the four request flags; the queue it arbitrates lives in
/// [`Planner`], the position it resyncs on flush lives in [`Machine`].
pub struct StateMachine {
    state: PlanState,
    cycle: Cycle,
    hold_requested: bool,
    flush_requested: bool,
    start_requested: bool,
    resume_requested: bool,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: PlanState::Ready,
            cycle: Cycle::Machining,
            hold_requested: false,
            flush_requested: false,
            start_requested: false,
            resume_requested: false,
        }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    fn set_state(&mut self, state: PlanState) {
        if self.state == state || self.state == PlanState::Estopped {
            return;
        }
        self.state = state;
    }

    /// `mp_set_cycle`: a non-machining cycle may only start from
    /// `Ready`, and cycles may not nest.
    pub fn set_cycle(&mut self, cycle: Cycle) -> Result<(), CycleTransitionError> {
        if self.cycle == cycle {
            return Ok(());
        }
        if self.state != PlanState::Ready && cycle != Cycle::Machining {
            return Err(CycleTransitionError::NotReady);
        }
        if self.cycle != Cycle::Machining && cycle != Cycle::Machining {
            return Err(CycleTransitionError::CycleBusy);
        }
        self.cycle = cycle;
        Ok(())
    }

    pub fn is_flushing(&self) -> bool {
        self.flush_requested && !self.resume_requested
    }

    pub fn is_resuming(&self) -> bool {
        self.resume_requested
    }

    /// `mp_is_quiescent`: safe to flush or re-sync position.
    pub fn is_quiescent(&self, scheduler: &StepperScheduler, runtime: &Runtime) -> bool {
        matches!(self.state, PlanState::Ready | PlanState::Holding) && !scheduler.is_busy() && !runtime.is_busy()
    }

    /// Called by the executor once the runtime velocity reaches zero
    /// during a `Stopping` decel.
    pub fn enter_holding(&mut self) {
        self.set_state(PlanState::Holding);
    }

    pub fn enter_running(&mut self) {
        if self.state == PlanState::Ready {
            self.set_state(PlanState::Running);
        }
    }

    pub fn enter_idle(&mut self) {
        if self.state == PlanState::Running {
            self.set_state(PlanState::Ready);
        }
    }

    /// `mp_state_estop`: immediate, from any state, latched until an
    /// external reset rebuilds a fresh `StateMachine`.
    pub fn enter_estop(&mut self) {
        self.state = PlanState::Estopped;
    }

    pub fn request_hold(&mut self) {
        self.hold_requested = true;
    }

    pub fn request_start(&mut self) {
        self.start_requested = true;
    }

    pub fn request_flush(&mut self) {
        self.flush_requested = true;
    }

    /// A resume only has an effect once a flush has actually been
    /// requested (`mp_request_resume`): resuming without flushing is
    /// meaningless, there is nothing to resume past.
    pub fn request_resume(&mut self) {
        if self.flush_requested {
            self.resume_requested = true;
        }
    }

    /// Whether the executor should currently be decelerating the head
    /// buffer toward a stop (fed into `executor::exec_move`'s
    /// `stopping` argument).
    pub fn is_stopping(&self) -> bool {
        self.state == PlanState::Stopping
    }

    /// One state-machine tick per main loop iteration (§5). Resolves
    /// the `hold`/`flush`/`start`/`resume` request flags against the
    /// rules in this module's doc comment. `on_flush` runs exactly
    /// once, only when a flush is actually committed, so a caller can
    /// cancel any in-progress arc subdivision before the queue and
    /// machine position are reset.
    #[instrument(skip(self, planner, machine, scheduler, runtime, on_flush), fields(state = ?self.state))]
    pub fn tick(
        &mut self,
        planner: &mut Planner,
        machine: &mut Machine,
        scheduler: &StepperScheduler,
        runtime: &Runtime,
        mut on_flush: impl FnMut(),
    ) {
        // A hold request received during motion is honored; during a
        // feedhold or while already stopped it is ignored and reset.
        // A flush request received during motion is ignored (it isn't
        // reset here) until the feedhold it implies reaches HOLDING.
        if self.hold_requested || self.flush_requested {
            self.hold_requested = false;
            if self.state == PlanState::Running {
                self.set_state(PlanState::Stopping);
            }
        }

        // Only flush the queue once idle or holding.
        if self.flush_requested && self.is_quiescent(scheduler, runtime) {
            on_flush();

            if !planner.is_empty() {
                planner.flush_planner();
                // Re-sync to the runtime's actual position rather than
                // the position of the last queued (now-discarded) move.
                machine.sync_position(runtime.position);
            }

            if self.resume_requested {
                self.flush_requested = false;
                self.resume_requested = false;
                self.set_state(PlanState::Ready);
            }
        }

        // Don't start while flushing or still decelerating.
        if self.start_requested && !self.flush_requested && self.state != PlanState::Stopping {
            self.start_requested = false;

            if self.state == PlanState::Holding {
                if !planner.is_empty() {
                    planner.replan_blocks();
                    self.set_state(PlanState::Running);
                } else {
                    self.set_state(PlanState::Ready);
                }
            }
        }
    }
}
