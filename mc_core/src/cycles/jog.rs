//! Jog cycle (§4.7): interactive per-axis velocity jogging, driven by
//! targets set from outside (a pendant, a UI) rather than by G-code.
//!
//! New code — no direct `original_source` analog (the buildbotics
//! firmware's jogging lives in its UI layer, not the motion core) — but
//! the velocity-slew-per-tick shape follows the same "one queued
//! action per invocation" discipline as `cycle_homing.c` and the
//! teacher's `HomingSupervisor::tick`.

use mc_common::consts::NUM_AXES;

/// Per-axis jog velocity slew (§4.7 Jog).
pub struct JogCycle {
    target_velocity: [f64; NUM_AXES],
    current_velocity: [f64; NUM_AXES],
    acceleration: f64,
}

/// One tick's worth of motion to queue, or a signal that the jog has
/// come to a complete stop on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JogOutcome {
    Segment { velocity: [f64; NUM_AXES] },
    Stopped,
}

impl JogCycle {
    pub fn new(acceleration: f64) -> Self {
        Self { target_velocity: [0.0; NUM_AXES], current_velocity: [0.0; NUM_AXES], acceleration }
    }

    /// Update the commanded per-axis velocity; takes effect on the next `tick`.
    pub fn set_target(&mut self, target: [f64; NUM_AXES]) {
        self.target_velocity = target;
    }

    /// Advance one segment: slew `current_velocity` toward `target_velocity`
    /// by at most `acceleration * segment_time`, per axis independently.
    pub fn tick(&mut self, segment_time: f64) -> JogOutcome {
        let max_step = self.acceleration * segment_time;
        let mut moving = false;
        for axis in 0..NUM_AXES {
            let delta = self.target_velocity[axis] - self.current_velocity[axis];
            let step = delta.clamp(-max_step, max_step);
            self.current_velocity[axis] += step;
            if self.current_velocity[axis].abs() > f64::EPSILON {
                moving = true;
            }
        }
        if moving {
            JogOutcome::Segment { velocity: self.current_velocity }
        } else {
            JogOutcome::Stopped
        }
    }

    pub fn current_velocity(&self) -> [f64; NUM_AXES] {
        self.current_velocity
    }
}

/// On exit (§4.7 Jog): resolve the authoritative position from integer
/// encoder counts rather than trusting the commanded trajectory, so any
/// slew-limited drift during the jog doesn't accumulate into the model.
pub fn position_from_encoders(encoder_counts: &[i64; NUM_AXES], steps_per_unit: &[f64; NUM_AXES]) -> [f64; NUM_AXES] {
    let mut position = [0.0; NUM_AXES];
    for axis in 0..NUM_AXES {
        if steps_per_unit[axis] > 0.0 {
            position[axis] = (encoder_counts[axis] as f64 / steps_per_unit[axis]).trunc();
        }
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_slews_toward_target_and_stops() {
        let mut jog = JogCycle::new(1000.0);
        let mut target = [0.0; NUM_AXES];
        target[0] = 50.0;
        jog.set_target(target);

        let first = jog.tick(0.01);
        let JogOutcome::Segment { velocity } = first else { panic!("expected motion") };
        assert!((velocity[0] - 10.0).abs() < 1e-9);

        jog.set_target([0.0; NUM_AXES]);
        for _ in 0..10 {
            jog.tick(0.01);
        }
        assert_eq!(jog.tick(0.01), JogOutcome::Stopped);
    }

    #[test]
    fn encoder_position_uses_integer_division() {
        let mut counts = [0i64; NUM_AXES];
        counts[0] = 1234;
        let mut steps = [0.0; NUM_AXES];
        steps[0] = 100.0;
        let position = position_from_encoders(&counts, &steps);
        assert_eq!(position[0], 12.0);
    }
}
