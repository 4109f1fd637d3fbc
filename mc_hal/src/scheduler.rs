//! The stepper scheduler (§4.6).
//!
//! Owns the double-buffered prep/run segment handoff and the per-motor
//! step-error ledger. Runs conceptually at LO priority (`prep_*`,
//! `load_move`) with the actual pulse generation delegated to a
//! [`StepperDriver`](crate::driver::StepperDriver) implementation —
//! this module never touches a timer register directly, matching §5's
//! rule that HI-priority code must never touch planner/queue state.
//!
//! New code; prescaler selection and the step-error ledger formulas are
//! grounded on the stepper timer-programming logic of the original
//! firmware's `stepper.c`. Module shape (doc density, `thiserror` error
//! enum, one state struct with narrow public methods) follows the
//! teacher's `evo_control_unit` modules.

use mc_common::consts::{
    DWELL_TICK_S, EPSILON, NUM_AXES, STEPPER_MAX_PERIOD_TICKS, STEPPER_PRESCALERS, STEPPER_TIMER_HZ,
};
use thiserror::Error;

use crate::driver::{DriverError, MotorPulseTrain, StepperDriver};

/// Number of motors the scheduler drives — one per axis slot (§3 Motor:
/// a motor maps to one axis, or none).
pub const NUM_MOTORS: usize = NUM_AXES;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SchedulerError {
    #[error("segment time {0} is non-positive, NaN or infinite")]
    InvalidSegmentTime(f64),
    #[error("motor {motor} requires a period of {ticks_per_step} ticks/step, which overflows every available prescaler")]
    PeriodOverflow { motor: u8, ticks_per_step: f64 },
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// A motor's static mapping, supplied by `mc_core`'s axis/motor config
/// (§3 Motor: `steps_per_unit`, axis index, polarity).
#[derive(Debug, Clone, Copy)]
pub struct MotorMapping {
    /// Axis this motor drives, or `None` if unmapped (§3: "-1 = unmapped").
    pub axis: Option<u8>,
    pub steps_per_unit: f64,
    pub invert_direction: bool,
}

impl MotorMapping {
    pub const UNMAPPED: Self = Self {
        axis: None,
        steps_per_unit: 1.0,
        invert_direction: false,
    };
}

/// What a prepared segment will do once loaded (§3 buffer callback kinds,
/// §9's "small tagged variant" recommendation).
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentKind {
    Line,
    /// Number of 1 ms dwell ticks remaining.
    Dwell(u32),
    /// Opaque token identifying the synchronous command to fire; the
    /// command's actual effect (tool change, coolant, …) is `mc_core`'s
    /// concern, not the scheduler's.
    Command(u64),
}

#[derive(Debug, Clone)]
pub struct PreparedSegment {
    pub trains: [MotorPulseTrain; NUM_MOTORS],
    pub kind: SegmentKind,
    pub seg_time: f64,
}

/// Per-motor step-error ledger (§4.6, §9: "keep three arrays per motor
/// rather than a ring").
#[derive(Debug, Default, Clone, Copy)]
struct MotorLedger {
    target: i64,
    position: i64,
    commanded: i64,
    encoder: i64,
    error: i64,
}

/// The stepper scheduler: prep/run double buffer plus the step-error ledger.
pub struct StepperScheduler {
    ledgers: [MotorLedger; NUM_MOTORS],
    prep: Option<PreparedSegment>,
    run: Option<PreparedSegment>,
    exec_requested: bool,
}

impl StepperScheduler {
    pub fn new() -> Self {
        Self {
            ledgers: [MotorLedger::default(); NUM_MOTORS],
            prep: None,
            run: None,
            exec_requested: false,
        }
    }

    /// `kinematics(travel[AXES]) -> steps[MOTORS]` (§4.6).
    pub fn kinematics(
        mappings: &[MotorMapping; NUM_MOTORS],
        inhibited: &[bool; NUM_AXES],
        travel: &[f64; NUM_AXES],
    ) -> [i64; NUM_MOTORS] {
        let mut steps = [0i64; NUM_MOTORS];
        for (i, mapping) in mappings.iter().enumerate() {
            steps[i] = match mapping.axis {
                Some(axis) if !inhibited[axis as usize] => {
                    (travel[axis as usize] * mapping.steps_per_unit).round() as i64
                }
                _ => 0,
            };
        }
        steps
    }

    /// Register one motion segment. `travel_steps` is the *requested*
    /// per-motor step delta for this segment, before step-error
    /// correction; the ledger's carried error is subtracted here.
    pub fn prep_line(
        &mut self,
        mappings: &[MotorMapping; NUM_MOTORS],
        travel_steps: &[i64; NUM_MOTORS],
        seg_time: f64,
    ) -> Result<(), SchedulerError> {
        if !(seg_time > EPSILON) || seg_time.is_nan() || seg_time.is_infinite() {
            return Err(SchedulerError::InvalidSegmentTime(seg_time));
        }

        let total_ticks = STEPPER_TIMER_HZ * seg_time;
        let mut trains = [MotorPulseTrain::IDLE; NUM_MOTORS];

        for (i, mapping) in mappings.iter().enumerate() {
            let corrected = travel_steps[i] - self.ledgers[i].error;
            let steps_abs = corrected.unsigned_abs();
            if steps_abs == 0 {
                self.ledgers[i].target = self.ledgers[i].position;
                continue;
            }

            let ticks_per_step = total_ticks / steps_abs as f64;
            let (prescaler, period) = select_prescaler(ticks_per_step).ok_or(
                SchedulerError::PeriodOverflow {
                    motor: i as u8,
                    ticks_per_step,
                },
            )?;

            let produced = ((total_ticks / (period as f64 * prescaler as f64)).round() as i64)
                .min(steps_abs as i64)
                .max(0);
            let signed_produced = if corrected >= 0 { produced } else { -produced };

            trains[i] = MotorPulseTrain {
                period_ticks: period,
                prescaler,
                direction_positive: (corrected >= 0) ^ mapping.invert_direction,
                step_count: produced as u32,
            };
            self.ledgers[i].target = self.ledgers[i].position + signed_produced;
        }

        self.prep = Some(PreparedSegment {
            trains,
            kind: SegmentKind::Line,
            seg_time,
        });
        Ok(())
    }

    /// Register a 1 ms-tick dwell segment (§4.6).
    pub fn prep_dwell(&mut self, seconds: f64) -> Result<(), SchedulerError> {
        if seconds < 0.0 || seconds.is_nan() || seconds.is_infinite() {
            return Err(SchedulerError::InvalidSegmentTime(seconds));
        }
        let ticks = (seconds / DWELL_TICK_S).round().max(1.0) as u32;
        self.prep = Some(PreparedSegment {
            trains: [MotorPulseTrain::IDLE; NUM_MOTORS],
            kind: SegmentKind::Dwell(ticks),
            seg_time: seconds,
        });
        Ok(())
    }

    /// Register a synchronous, zero-motion command to fire at the
    /// scheduled moment (§4.6).
    pub fn prep_command(&mut self, token: u64) {
        self.prep = Some(PreparedSegment {
            trains: [MotorPulseTrain::IDLE; NUM_MOTORS],
            kind: SegmentKind::Command(token),
            seg_time: 0.0,
        });
    }

    /// Swap the prepped segment into the run state: program each
    /// motor's pulse train on `driver`, and roll the step-error ledger
    /// forward (§4.6, §9 "loader runs with HI masked").
    pub fn load_move(
        &mut self,
        driver: &mut dyn StepperDriver,
    ) -> Result<Option<SegmentKind>, SchedulerError> {
        let Some(prep) = self.prep.take() else {
            return Ok(None);
        };

        for (i, ledger) in self.ledgers.iter_mut().enumerate() {
            ledger.commanded = ledger.position;
            ledger.position = ledger.target;
            ledger.encoder = driver.read_encoder(i as u8)?;
            ledger.error = ledger.encoder - ledger.commanded;
        }

        for (i, train) in prep.trains.iter().enumerate() {
            driver.program_motor(i as u8, *train)?;
        }

        let kind = prep.kind.clone();
        self.run = Some(prep);
        Ok(Some(kind))
    }

    /// Request the exec software interrupt (§4.6 `request_exec_move`).
    pub fn request_exec_move(&mut self) {
        self.exec_requested = true;
    }

    /// Consume a pending exec request, if any.
    pub fn take_exec_request(&mut self) -> bool {
        std::mem::take(&mut self.exec_requested)
    }

    /// Current step-error for a motor (§8 invariant 4: step ledger closure).
    pub fn error(&self, motor: usize) -> i64 {
        self.ledgers[motor].error
    }

    pub fn position(&self, motor: usize) -> i64 {
        self.ledgers[motor].position
    }

    pub fn is_busy(&self) -> bool {
        self.run.is_some()
    }

    /// Mark the loaded segment as finished executing. The original
    /// firmware clears `st.busy` from the HI-priority step-timer ISR once
    /// the last pulse of the segment has fired (`stepper.c`'s
    /// `_load_move`/ISR pair); this crate has no timer ISR, so the
    /// driver-tick caller calls this once it has advanced the world past
    /// the segment's `seg_time`.
    pub fn complete_run(&mut self) {
        self.run = None;
    }
}

impl Default for StepperScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the smallest prescaler (in `STEPPER_PRESCALERS` order) that
/// keeps the resulting period within 16 bits.
fn select_prescaler(ticks_per_step: f64) -> Option<(u8, u16)> {
    for &p in &STEPPER_PRESCALERS {
        let period = ticks_per_step / p as f64;
        if (1.0..=STEPPER_MAX_PERIOD_TICKS as f64).contains(&period) {
            return Some((p as u8, period.round() as u16));
        }
    }
    None
}
