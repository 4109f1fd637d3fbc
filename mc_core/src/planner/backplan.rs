//! Two-pass backplanner (§4.4 `plan_block_list`).
//!
//! Grounded on `original_source/src/plan/planner.c`'s backward/forward
//! sweep. The ring-of-indices re-architecture (§9) means both passes
//! walk the *entire* currently-queued range each time rather than
//! tracking a partial "first replannable" cursor — more work per call,
//! same fixed point, and it sidesteps a second piece of mutable cursor
//! state that the pointer-based original needed. Recorded in
//! `DESIGN.md`.

use mc_common::consts::EPSILON;

use super::trapezoid::calculate_trapezoid;
use super::Planner;

impl Planner {
    /// `plan_block_list`: backward braking-velocity sweep, then a
    /// forward entry/cruise/exit + trapezoid-fit sweep.
    pub fn plan_block_list(&mut self) {
        let n = self.count;
        if n == 0 {
            return;
        }
        let cap = self.ring.len();
        let idx = |i: usize| (self.head + i) % cap;

        // Backward pass: tail toward head. A block past the queue end
        // has no successor, so it plans to decelerate to a full stop.
        let mut next_entry_vmax = 0.0;
        let mut next_braking = 0.0;
        for i in (0..n).rev() {
            let at = idx(i);
            if !self.ring[at].replannable {
                next_entry_vmax = self.ring[at].entry_vmax;
                next_braking = self.ring[at].braking_velocity;
                continue;
            }
            let braking = next_entry_vmax.min(next_braking) + self.ring[at].delta_vmax;
            self.ring[at].braking_velocity = braking;
            next_entry_vmax = self.ring[at].entry_vmax;
            next_braking = braking;
        }

        // Forward pass: head toward tail.
        let mut prev_exit: Option<f64> = None;
        for i in 0..n {
            let at = idx(i);
            if !self.ring[at].replannable {
                prev_exit = Some(self.ring[at].exit_velocity);
                continue;
            }

            let entry = prev_exit.unwrap_or(self.ring[at].entry_vmax);
            let (next_entry_vmax, next_braking) = if i + 1 < n {
                let nat = idx(i + 1);
                (self.ring[nat].entry_vmax, self.ring[nat].braking_velocity)
            } else {
                (0.0, 0.0)
            };

            let delta_vmax = self.ring[at].delta_vmax;
            let exit_vmax = self.ring[at].exit_vmax;
            let exit = if self.ring[at].hold {
                0.0
            } else {
                exit_vmax
                    .min(next_entry_vmax)
                    .min(next_braking)
                    .min(entry + delta_vmax)
            };

            self.ring[at].entry_velocity = entry;
            self.ring[at].cruise_velocity = self.ring[at].cruise_vmax;
            self.ring[at].exit_velocity = exit;
            calculate_trapezoid(&mut self.ring[at]);

            let predecessor_fixed = i > 0 && !self.ring[idx(i - 1)].replannable;
            let constrained = (exit - exit_vmax).abs() < EPSILON
                || (exit - next_entry_vmax).abs() < EPSILON
                || (exit - next_braking).abs() < EPSILON
                || ((exit - (entry + delta_vmax)).abs() < EPSILON && predecessor_fixed);
            if constrained {
                self.ring[at].replannable = false;
            }

            prev_exit = Some(exit);
        }
    }
}
