//! Segment generator (§4.5): dequeues the head planner buffer, advances
//! its state machine, and feeds the stepper scheduler one segment per
//! call. Grounded on `original_source/src/plan/exec.c` — `mp_exec_move`,
//! `mp_exec_aline`, the quintic-Bezier forward-differencing math, and
//! `_plan_hold`.

use std::array;

use mc_common::consts::{
    BUFFER_STARTUP_DELAY_S, BUFFER_STARTUP_FILL_THRESHOLD, EPSILON, HOLD_DECELERATION_TOLERANCE,
    NUM_AXES, PLANNER_QUEUE_LEN,
};
use mc_hal::scheduler::{MotorMapping, SchedulerError, StepperScheduler};
use tracing::{instrument, warn};

use crate::error::RuntimeError;
use crate::planner::trapezoid::{target_length, target_velocity};
use crate::planner::{BufferKind, BufferState, Planner};

/// Which third of the trapezoid is currently generating segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Head,
    Body,
    Tail,
}

/// What the caller should do after one `exec_move` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    /// A segment was emitted; call again to emit the next one.
    Running,
    /// The head buffer finished; it has been popped from the planner.
    BlockComplete,
    /// Nothing runnable right now (empty queue, e-stop, holding, or the
    /// startup delay is still pending).
    Idle,
    /// A section was too short to emit even one segment and was skipped
    /// without advancing position.
    MinimumTimeMove,
}

/// Runtime position/velocity, separate from the planned buffers (§4.5:
/// "the currently-running buffer" vs. the plan).
#[derive(Debug, Clone)]
pub struct Runtime {
    pub position: [f64; NUM_AXES],
    pub velocity: f64,
    busy: bool,
}

impl Runtime {
    pub fn new(position: [f64; NUM_AXES]) -> Self {
        Self { position, velocity: 0.0, busy: false }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

/// Forward-difference accumulator state for one trapezoid section.
#[derive(Debug, Clone, Copy, Default)]
struct ForwardDiff {
    f: [f64; 5],
}

impl ForwardDiff {
    /// `mp_init_forward_diffs`: seeds the five forward-difference levels
    /// and returns the velocity at `t = h/2` (§4.5).
    fn init(vi: f64, vt: f64, segments: f64) -> (Self, f64) {
        let h = 1.0 / segments;
        let s = segments;
        let s2 = s * s;
        let vdxh5 = (vt - vi) * h.powi(5);

        let mut fd = ForwardDiff::default();
        fd.f[4] = (32.5 * s2 - 75.0 * s + 45.375) * vdxh5;
        fd.f[3] = (90.0 * s2 - 435.0 * s + 495.0) * vdxh5;
        fd.f[2] = (60.0 * s2 - 720.0 * s + 1530.0) * vdxh5;
        fd.f[1] = (-360.0 * s + 1800.0) * vdxh5;
        fd.f[0] = 720.0 * vdxh5;

        let v0 = (vt - vi) * 0.5 * h.powi(8) + vi;
        (fd, v0)
    }

    /// `mp_next_forward_diff`: returns the next velocity delta and
    /// cascades the accumulator forward.
    fn next(&mut self) -> f64 {
        let delta = self.f[4];
        self.f[4] += self.f[3];
        self.f[3] += self.f[2];
        self.f[2] += self.f[1];
        self.f[1] += self.f[0];
        delta
    }
}

/// Per-move executor state (§4.5 `mp_exec_t`), reset each time a new
/// head buffer is taken over.
pub struct Executor {
    unit: [f64; NUM_AXES],
    final_target: [f64; NUM_AXES],
    waypoint: [[f64; NUM_AXES]; 3],

    head_length: f64,
    body_length: f64,
    tail_length: f64,
    entry_velocity: f64,
    cruise_velocity: f64,
    exit_velocity: f64,
    recip_jerk: f64,

    segment_count: u32,
    segment_velocity: f64,
    segment_time: f64,
    diff: ForwardDiff,

    section: Section,
    section_new: bool,
    hold_planned: bool,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            unit: [0.0; NUM_AXES],
            final_target: [0.0; NUM_AXES],
            waypoint: [[0.0; NUM_AXES]; 3],
            head_length: 0.0,
            body_length: 0.0,
            tail_length: 0.0,
            entry_velocity: 0.0,
            cruise_velocity: 0.0,
            exit_velocity: 0.0,
            recip_jerk: 0.0,
            segment_count: 0,
            segment_velocity: 0.0,
            segment_time: 0.0,
            diff: ForwardDiff::default(),
            section: Section::Head,
            section_new: true,
            hold_planned: false,
        }
    }
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// §4.5 `_exec_aline_init`: adopt a freshly-activated buffer's
    /// geometry and compute its section waypoints.
    fn init_from_buffer(&mut self, buf: &crate::planner::Buffer, position: &[f64; NUM_AXES]) {
        self.unit = buf.unit;
        self.final_target = buf.target;
        self.head_length = buf.head_length;
        self.body_length = buf.body_length;
        self.tail_length = buf.tail_length;
        self.entry_velocity = buf.entry_velocity;
        self.cruise_velocity = buf.cruise_velocity;
        self.exit_velocity = buf.exit_velocity;
        self.recip_jerk = buf.recip_jerk;

        self.waypoint[0] = array::from_fn(|i| position[i] + self.unit[i] * self.head_length);
        self.waypoint[1] = array::from_fn(|i| {
            position[i] + self.unit[i] * (self.head_length + self.body_length)
        });
        self.waypoint[2] = self.final_target;

        self.section = Section::Head;
        self.section_new = true;
        self.hold_planned = false;
    }

    /// Peek at the velocity the *next* forward-difference step would
    /// produce, without consuming it (§4.5 `_compute_next_segment_velocity`).
    fn peek_next_segment_velocity(&self, current_velocity: f64) -> f64 {
        if self.section_new {
            return match self.section {
                Section::Head => current_velocity,
                _ => self.cruise_velocity,
            };
        }
        if self.section == Section::Body {
            self.segment_velocity
        } else {
            self.segment_velocity + self.diff.f[4]
        }
    }
}

/// One segment's worth of work handed to the stepper scheduler.
struct SegmentOutcome {
    status: ExecStatus,
}

/// `mp_exec_move`: the top-level dispatcher, called once per segment
/// completion. `stopping` mirrors the plan-state machine's `Stopping`
/// state; `holding`/`estopped` suppress execution entirely.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(exec, runtime, planner, scheduler, mappings, inhibited), fields(queue_len = planner.len()))]
pub fn exec_move(
    exec: &mut Executor,
    runtime: &mut Runtime,
    planner: &mut Planner,
    scheduler: &mut StepperScheduler,
    mappings: &[MotorMapping; NUM_AXES],
    inhibited: &[bool; NUM_AXES],
    estopped: bool,
    holding: bool,
    stopping: bool,
    now: f64,
) -> Result<ExecStatus, RuntimeError> {
    if estopped || holding || planner.is_empty() {
        runtime.velocity = 0.0;
        runtime.busy = false;
        return Ok(ExecStatus::Idle);
    }

    let is_new = planner.head().map(|b| b.state) == Some(BufferState::New);
    if is_new {
        let fill = planner.len() as f64 / PLANNER_QUEUE_LEN as f64;
        let arrival_time = planner.head().expect("checked non-empty above").arrival_time;
        let elapsed = now - arrival_time;
        if !runtime.busy && fill < BUFFER_STARTUP_FILL_THRESHOLD && elapsed < BUFFER_STARTUP_DELAY_S {
            return Ok(ExecStatus::Idle);
        }

        let kind = planner.head().expect("checked non-empty above").kind;
        let length = planner.head().expect("checked non-empty above").length;
        let position = runtime.position;

        let head_mut = planner.head_mut().expect("checked non-empty above");
        head_mut.state = BufferState::Active;
        head_mut.replannable = false;

        if kind == BufferKind::Aline {
            if length < EPSILON {
                planner.advance_head();
                return Ok(ExecStatus::BlockComplete);
            }
            let head_ref = planner.head().expect("checked non-empty above");
            exec.init_from_buffer(head_ref, &position);
        }
    }

    if stopping && !exec.hold_planned {
        plan_hold(exec, planner, runtime);
    }

    let kind = planner.head().expect("checked non-empty above").kind;
    let before = runtime.position;
    let outcome = match kind {
        BufferKind::Aline => exec_aline(exec, runtime),
        BufferKind::Dwell => exec_dwell(runtime),
        BufferKind::Command(_) => exec_command(runtime),
    };

    if let BufferKind::Aline = kind {
        if matches!(outcome.status, ExecStatus::Running | ExecStatus::BlockComplete) {
            let delta: [f64; NUM_AXES] = array::from_fn(|i| runtime.position[i] - before[i]);
            if delta.iter().any(|d| d.abs() > EPSILON) {
                let travel_steps = StepperScheduler::kinematics(mappings, inhibited, &delta);
                let seg_time = exec.segment_time.max(mc_common::consts::MIN_SEGMENT_TIME_S);
                if let Err(err) = scheduler.prep_line(mappings, &travel_steps, seg_time) {
                    match err {
                        SchedulerError::InvalidSegmentTime(_) => return Err(RuntimeError::NonFiniteSegmentTime),
                        other => warn!(%other, "segment prep failed, skipping without advancing ledger"),
                    }
                }
            }
        }
    }

    match outcome.status {
        ExecStatus::Running => runtime.busy = true,
        ExecStatus::BlockComplete => {
            runtime.busy = true;
            match kind {
                BufferKind::Dwell => {
                    let seconds = planner.head().map(|b| b.dwell_seconds).unwrap_or(0.0);
                    let _ = scheduler.prep_dwell(seconds);
                }
                BufferKind::Command(token) => scheduler.prep_command(token),
                BufferKind::Aline => {}
            }

            let should_restart = planner.head().map(|b| b.state == BufferState::Restart);
            if should_restart == Some(true) {
                let head = planner.head_mut().expect("just matched Some");
                head.state = BufferState::New;
            } else {
                planner.advance_head();
                if planner.is_empty() {
                    runtime.busy = false;
                }
            }
        }
        ExecStatus::Idle | ExecStatus::MinimumTimeMove => {}
    }

    Ok(outcome.status)
}

fn exec_dwell(runtime: &mut Runtime) -> SegmentOutcome {
    runtime.velocity = 0.0;
    SegmentOutcome { status: ExecStatus::BlockComplete }
}

fn exec_command(runtime: &mut Runtime) -> SegmentOutcome {
    runtime.velocity = 0.0;
    SegmentOutcome { status: ExecStatus::BlockComplete }
}

/// `mp_exec_aline`: dispatch to the current section, cascading into the
/// next section on completion (head -> body -> tail -> block complete).
fn exec_aline(exec: &mut Executor, runtime: &mut Runtime) -> SegmentOutcome {
    let status = loop {
        let section_status = match exec.section {
            Section::Head => exec_section(exec, runtime, exec.head_length, exec.entry_velocity, exec.cruise_velocity),
            Section::Body => exec_section(exec, runtime, exec.body_length, exec.cruise_velocity, exec.cruise_velocity),
            Section::Tail => exec_section(exec, runtime, exec.tail_length, exec.cruise_velocity, exec.exit_velocity),
        };

        match section_status {
            SectionStatus::NoOp => match exec.section {
                Section::Head => {
                    exec.section = Section::Body;
                    exec.section_new = true;
                    continue;
                }
                Section::Body => {
                    exec.section = Section::Tail;
                    exec.section_new = true;
                    continue;
                }
                Section::Tail => break ExecStatus::BlockComplete,
            },
            SectionStatus::SegmentEmitted { last } => {
                if last {
                    break match exec.section {
                        Section::Head => {
                            exec.section = Section::Body;
                            exec.section_new = true;
                            ExecStatus::Running
                        }
                        Section::Body => {
                            exec.section = Section::Tail;
                            exec.section_new = true;
                            ExecStatus::Running
                        }
                        Section::Tail => ExecStatus::BlockComplete,
                    };
                }
                break ExecStatus::Running;
            }
            SectionStatus::MinimumTimeMove => break ExecStatus::MinimumTimeMove,
        };
    };

    if status != ExecStatus::Running {
        runtime.velocity = exec.exit_velocity;
    }
    SegmentOutcome { status }
}

enum SectionStatus {
    /// The section has zero length; move on to the next one.
    NoOp,
    SegmentEmitted { last: bool },
    MinimumTimeMove,
}

/// `_exec_aline_section` + `_exec_aline_segment`: run one segment of a
/// head/body/tail section, (re)initialising forward-difference state on
/// the section's first call.
fn exec_section(exec: &mut Executor, runtime: &mut Runtime, length: f64, vin: f64, vout: f64) -> SectionStatus {
    if exec.section_new {
        if length < EPSILON {
            return SectionStatus::NoOp;
        }

        let move_time = 2.0 * length / (vin + vout).max(EPSILON);
        let segments = (move_time / mc_common::consts::NOMINAL_SEGMENT_TIME_S).ceil().max(1.0);
        let segment_time = move_time / segments;
        exec.segment_count = segments as u32;
        exec.segment_time = segment_time;

        if (vin - vout).abs() < EPSILON {
            exec.segment_velocity = vin;
        } else {
            let (diff, v0) = ForwardDiff::init(vin, vout, segments);
            exec.diff = diff;
            exec.segment_velocity = v0;
        }

        if segment_time < mc_common::consts::MIN_SEGMENT_TIME_S {
            return SectionStatus::MinimumTimeMove;
        }

        exec.section_new = false;
        emit_segment(exec, runtime);
        exec.segment_count -= 1;
        return SectionStatus::SegmentEmitted { last: exec.segment_count == 0 };
    }

    if (vin - vout).abs() >= EPSILON {
        exec.segment_velocity += exec.diff.next();
    }
    emit_segment(exec, runtime);
    exec.segment_count -= 1;
    SectionStatus::SegmentEmitted { last: exec.segment_count == 0 }
}

/// Sets the segment's target position, applying waypoint snapping on a
/// section's final segment (unless a hold was planned this segment).
fn emit_segment(exec: &mut Executor, runtime: &mut Runtime) {
    let is_last = exec.segment_count == 1;
    let target: [f64; NUM_AXES] = if is_last && !exec.hold_planned {
        exec.waypoint[exec.section as usize]
    } else {
        let segment_length = exec.segment_velocity * exec.segment_time;
        array::from_fn(|i| runtime.position[i] + exec.unit[i] * segment_length)
    };

    runtime.velocity = exec.segment_velocity;
    runtime.position = target;
}

/// `_plan_hold`: replan the currently-running buffer to decelerate
/// toward the plan-state machine's hold point (§4.5).
fn plan_hold(exec: &mut Executor, planner: &mut Planner, runtime: &Runtime) {
    let Some(head) = planner.head() else { return };

    let available_length = distance(&exec.final_target, &runtime.position);
    let braking_velocity = exec.peek_next_segment_velocity(runtime.velocity);
    let mut braking_length = target_length(braking_velocity, 0.0, exec.recip_jerk);

    // Perfect-fit decels (common when a homing switch trips exactly at
    // the planned stop) would otherwise spill into case 2.
    if available_length < braking_length && head.exit_velocity < EPSILON {
        braking_length = available_length;
    }

    exec.section = Section::Tail;
    exec.section_new = true;
    exec.cruise_velocity = braking_velocity;
    exec.hold_planned = true;

    if (available_length - braking_length).abs() < HOLD_DECELERATION_TOLERANCE {
        exec.exit_velocity = 0.0;
        exec.tail_length = available_length;
    } else if braking_length <= available_length {
        exec.exit_velocity = 0.0;
        exec.tail_length = braking_length;

        let remaining = available_length - braking_length;
        let recip_jerk = head.recip_jerk;
        let head = planner.head_mut().expect("checked non-empty above");
        head.length = remaining;
        head.delta_vmax = target_velocity(0.0, remaining, head.jerk, recip_jerk);
        head.entry_vmax = 0.0;
        head.state = BufferState::Restart;
    } else {
        exec.tail_length = available_length;
        exec.exit_velocity = braking_velocity - target_velocity(0.0, available_length, head.jerk, head.recip_jerk);
    }
}

fn distance(a: &[f64; NUM_AXES], b: &[f64; NUM_AXES]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}
