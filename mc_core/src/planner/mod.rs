//! The planner (§4.4): move queue, junction-velocity analysis,
//! trapezoidal velocity-profile fitting, two-pass backplanning.
//!
//! Grounded on `original_source/src/plan/{buffer,planner,line,zoid}.c`.
//! The ring is a fixed-capacity array with head/tail/count indices
//! rather than a doubly-linked list (§9's recommended re-architecture),
//! eliminating the pointer-graph hazards the spec calls out.

mod backplan;
pub mod buffer;
pub mod junction;
pub mod trapezoid;

use std::array;

use mc_common::consts::{
    EPSILON, JERK_SCALE, JUNCTION_ACCELERATION, JUNCTION_VELOCITY_STRAIGHT, MIN_SEGMENT_TIME_S,
    NUM_AXES, NUM_LINEAR_AXES, PLANNER_QUEUE_LEN,
};

use crate::axis::Axis;
use crate::error::QueueError;

pub use buffer::{Buffer, BufferKind, BufferState};

/// Feed mode affecting the naive move-time calculation (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTimeMode {
    UnitsPerMinute,
    InverseTime,
    /// Rapid traverse: no feed rate applies, the move runs at each
    /// axis's own maximum velocity.
    Rapid,
}

/// Fixed-capacity ring of planner buffers (§3, §9).
pub struct Planner {
    ring: Vec<Buffer>,
    head: usize,
    count: usize,
}

impl Planner {
    pub fn new() -> Self {
        Self {
            ring: (0..PLANNER_QUEUE_LEN).map(|_| Buffer::default()).collect(),
            head: 0,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.ring.len()
    }

    fn index(&self, offset: usize) -> usize {
        (self.head + offset) % self.ring.len()
    }

    /// The buffer at the head of the queue (next to execute), if any.
    pub fn head(&self) -> Option<&Buffer> {
        (self.count > 0).then(|| &self.ring[self.head])
    }

    pub fn head_mut(&mut self) -> Option<&mut Buffer> {
        if self.count == 0 {
            return None;
        }
        let idx = self.head;
        Some(&mut self.ring[idx])
    }

    /// `queue_get_tail`: a writable buffer at the tail, or an error if
    /// the ring has no headroom (§4.4).
    pub fn queue_get_tail(&mut self) -> Result<&mut Buffer, QueueError> {
        if self.is_full() {
            return Err(QueueError::BufferFull);
        }
        let idx = self.index(self.count);
        Ok(&mut self.ring[idx])
    }

    /// `queue_push`: commit the tail buffer written via
    /// [`Planner::queue_get_tail`] as a new entry.
    pub fn queue_push(&mut self, kind: BufferKind, line: u32, now: f64) {
        let idx = self.index(self.count);
        let buf = &mut self.ring[idx];
        buf.kind = kind;
        buf.line_number = line;
        buf.arrival_time = now;
        buf.state = BufferState::New;
        buf.replannable = true;
        self.count += 1;
    }

    /// Drop the head buffer once the executor has fully consumed it.
    pub fn advance_head(&mut self) {
        if self.count == 0 {
            return;
        }
        self.ring[self.head] = Buffer::default();
        self.head = (self.head + 1) % self.ring.len();
        self.count -= 1;
    }

    /// `flush_planner`: discard all buffers (§4.4, §4.8).
    pub fn flush_planner(&mut self) {
        for b in &mut self.ring {
            *b = Buffer::default();
        }
        self.head = 0;
        self.count = 0;
    }

    /// The previous buffer's unit vector, for junction-velocity and
    /// incremental-target chaining, before a new one is appended.
    fn last_unit(&self) -> Option<[f64; NUM_AXES]> {
        (self.count > 0).then(|| self.ring[self.index(self.count - 1)].unit)
    }

    /// `aline`: the hot path (§4.4). Computes geometry and kinematics,
    /// the junction velocity against the previous buffer, populates the
    /// velocity maxima, runs the backplanner, then pushes.
    #[allow(clippy::too_many_arguments)]
    pub fn aline(
        &mut self,
        axes: &[Axis],
        from: [f64; NUM_AXES],
        target: [f64; NUM_AXES],
        feed_rate: f64,
        mode: MoveTimeMode,
        exact_stop: bool,
        line: u32,
        now: f64,
    ) -> Result<(), QueueError> {
        let delta: [f64; NUM_AXES] = array::from_fn(|i| target[i] - from[i]);
        let length = delta.iter().map(|d| d * d).sum::<f64>().sqrt();
        if length < EPSILON {
            return Ok(());
        }
        let unit: [f64; NUM_AXES] = array::from_fn(|i| delta[i] / length);

        let naive_time = naive_move_time(axes, &delta, feed_rate, mode);

        let (jerk, recip_jerk, cbrt_jerk) = jerk_limit_axis(axes, &delta, length, &unit);

        let prev_unit = self.last_unit();
        let v_junction = match prev_unit {
            Some(p) => junction::junction_velocity(axes, &p, &unit, JUNCTION_ACCELERATION),
            None => JUNCTION_VELOCITY_STRAIGHT,
        };
        let exact_stop_bound = if exact_stop { 0.0 } else { JUNCTION_VELOCITY_STRAIGHT };

        let cruise_vmax = if naive_time > EPSILON {
            length / naive_time
        } else {
            0.0
        };
        let entry_vmax = cruise_vmax.min(v_junction).min(exact_stop_bound);
        let delta_vmax = trapezoid::target_velocity(0.0, length, jerk, recip_jerk);

        let buf = self.queue_get_tail()?;
        buf.target = target;
        buf.unit = unit;
        buf.length = length;
        buf.naive_move_time = naive_time;
        buf.jerk = jerk;
        buf.recip_jerk = recip_jerk;
        buf.cbrt_jerk = cbrt_jerk;
        buf.entry_vmax = entry_vmax;
        buf.cruise_vmax = cruise_vmax;
        buf.exit_vmax = cruise_vmax;
        buf.delta_vmax = delta_vmax;
        buf.hold = exact_stop;
        buf.entry_velocity = entry_vmax;
        buf.exit_velocity = cruise_vmax;

        self.queue_push(BufferKind::Aline, line, now);
        self.plan_block_list();
        Ok(())
    }

    /// `queue_push` variant for a dwell buffer.
    pub fn dwell(&mut self, seconds: f64, line: u32, now: f64) -> Result<(), QueueError> {
        let buf = self.queue_get_tail()?;
        buf.dwell_seconds = seconds;
        self.queue_push(BufferKind::Dwell, line, now);
        Ok(())
    }

    /// `queue_push` variant for a synchronous, zero-motion command.
    pub fn command(&mut self, token: u64, line: u32, now: f64) -> Result<(), QueueError> {
        self.queue_get_tail()?;
        self.queue_push(BufferKind::Command(token), line, now);
        Ok(())
    }

    /// `replan_blocks`: mark every queued buffer replannable and rerun
    /// the backplanner (§4.4, invoked on resume).
    pub fn replan_blocks(&mut self) {
        for i in 0..self.count {
            let idx = self.index(i);
            self.ring[idx].replannable = true;
        }
        self.plan_block_list();
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

/// §4.4 move-time calculation, including the rate-limiting pass.
fn naive_move_time(axes: &[Axis], delta: &[f64; NUM_AXES], feed_rate: f64, mode: MoveTimeMode) -> f64 {
    let mut time = match mode {
        MoveTimeMode::InverseTime => {
            if feed_rate > EPSILON {
                1.0 / feed_rate
            } else {
                0.0
            }
        }
        MoveTimeMode::UnitsPerMinute => {
            let xyz: f64 = delta[..NUM_LINEAR_AXES].iter().map(|d| d * d).sum::<f64>().sqrt();
            let basis = if xyz > EPSILON {
                xyz
            } else {
                delta[NUM_LINEAR_AXES..].iter().map(|d| d * d).sum::<f64>().sqrt()
            };
            if feed_rate > EPSILON {
                basis / feed_rate
            } else {
                0.0
            }
        }
        MoveTimeMode::Rapid => 0.0,
    };

    for (i, axis) in axes.iter().enumerate().take(NUM_AXES) {
        if delta[i].abs() < EPSILON || axis.max_velocity <= EPSILON {
            continue;
        }
        time = time.max(delta[i].abs() / axis.max_velocity);
    }

    time.max(MIN_SEGMENT_TIME_S)
}

/// §4.4 jerk-limit axis selection: `C[i] = (length[i]^2/total^2) *
/// recip_jerk[i]`, pick the largest, scale that axis's jerk by the
/// reciprocal of its own unit-vector component.
fn jerk_limit_axis(
    axes: &[Axis],
    delta: &[f64; NUM_AXES],
    length: f64,
    unit: &[f64; NUM_AXES],
) -> (f64, f64, f64) {
    let mut best_c = -1.0;
    let mut best_i = 0usize;
    for (i, axis) in axes.iter().enumerate().take(NUM_AXES) {
        if delta[i].abs() < EPSILON {
            continue;
        }
        let frac = delta[i] / length;
        let c = frac * frac * axis.recip_jerk();
        if c > best_c {
            best_c = c;
            best_i = i;
        }
    }
    let axis_jerk = axes.get(best_i).map(|a| a.jerk()).unwrap_or(1.0);
    let component = unit[best_i].abs().max(EPSILON);
    let jerk = axis_jerk * JERK_SCALE / component;
    (jerk, 1.0 / jerk, jerk.cbrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{AxisConfig, AxisMode, HomingMode, HomingParams};

    fn axis() -> Axis {
        Axis::try_from(AxisConfig {
            mode: AxisMode::Standard,
            max_velocity: 6000.0,
            jerk: 20.0,
            junction_deviation: 0.01,
            travel_min: 0.0,
            travel_max: 1000.0,
            homing: HomingParams {
                search_velocity: 100.0,
                latch_velocity: 10.0,
                latch_backoff: 5.0,
                zero_backoff: 1.0,
                jerk: 10.0,
                mode: HomingMode::Disabled,
            },
            rotary_radius: 0.0,
        })
        .unwrap()
    }

    fn axes() -> Vec<Axis> {
        (0..NUM_AXES).map(|_| axis()).collect()
    }

    #[test]
    fn queue_starts_empty() {
        let p = Planner::new();
        assert!(p.is_empty());
        assert!(!p.is_full());
    }

    #[test]
    fn aline_enqueues_one_buffer() {
        let mut p = Planner::new();
        let axes = axes();
        let from = [0.0; NUM_AXES];
        let mut target = [0.0; NUM_AXES];
        target[0] = 20.0;
        p.aline(&axes, from, target, 600.0, MoveTimeMode::UnitsPerMinute, false, 1, 0.0)
            .unwrap();
        assert_eq!(p.len(), 1);
        assert!((p.head().unwrap().length - 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_length_move_is_a_no_op() {
        let mut p = Planner::new();
        let axes = axes();
        let from = [0.0; NUM_AXES];
        p.aline(&axes, from, from, 600.0, MoveTimeMode::UnitsPerMinute, false, 1, 0.0)
            .unwrap();
        assert!(p.is_empty());
    }

    #[test]
    fn queue_full_is_rejected() {
        let mut p = Planner::new();
        let axes = axes();
        let from = [0.0; NUM_AXES];
        for i in 0..PLANNER_QUEUE_LEN {
            let mut target = [0.0; NUM_AXES];
            target[0] = (i as f64 + 1.0) * 10.0;
            p.aline(&axes, from, target, 600.0, MoveTimeMode::UnitsPerMinute, false, i as u32, 0.0)
                .unwrap();
        }
        assert!(p.is_full());
        let mut target = from;
        target[0] = 9999.0;
        assert!(p
            .aline(&axes, from, target, 600.0, MoveTimeMode::UnitsPerMinute, false, 99, 0.0)
            .is_err());
    }

    #[test]
    fn flush_empties_the_queue() {
        let mut p = Planner::new();
        let axes = axes();
        let from = [0.0; NUM_AXES];
        let mut target = [0.0; NUM_AXES];
        target[0] = 20.0;
        p.aline(&axes, from, target, 600.0, MoveTimeMode::UnitsPerMinute, false, 1, 0.0)
            .unwrap();
        p.flush_planner();
        assert!(p.is_empty());
    }

    #[test]
    fn rapid_then_feed_joins_at_a_shared_junction() {
        // §8 end-to-end scenario: G0 X10; G1 X20 F600.
        let mut p = Planner::new();
        let axes = axes();
        let mut mid = [0.0; NUM_AXES];
        mid[0] = 10.0;
        let mut end = [0.0; NUM_AXES];
        end[0] = 20.0;
        p.aline(&axes, [0.0; NUM_AXES], mid, 0.0, MoveTimeMode::Rapid, false, 1, 0.0)
            .unwrap();
        p.aline(&axes, mid, end, 600.0, MoveTimeMode::UnitsPerMinute, false, 2, 0.0)
            .unwrap();
        assert_eq!(p.len(), 2);
    }
}
