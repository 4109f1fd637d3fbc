//! Trapezoid velocity-profile fit (§4.4 `calculate_trapezoid`) plus the
//! two length/velocity formulas it's built from. Grounded on
//! `original_source/src/plan/planner.c`'s `mp_calculate_trapezoid`
//! seven-rule decision tree (tolerances from the sibling `zoid.h`); the
//! exact `minimum_length` threshold used by rule 4 is under-documented
//! in that source (the spec flags a sibling ambiguity for the arc
//! generator) — here it is derived as `min(head_length, tail_length)`,
//! recorded in `DESIGN.md`.

use mc_common::consts::{
    EPSILON, HT_ASYMMETRIC_MAX_ITERS, HT_ASYMMETRIC_TOLERANCE, MIN_BODY_TIME_S,
    MIN_SEGMENT_TIME_MARGIN_S, MIN_SEGMENT_TIME_S, NOMINAL_SEGMENT_TIME_S,
};

use super::buffer::Buffer;

/// Distance needed to change velocity from `v0` to `v1` under a jerk
/// whose reciprocal is `recip_jerk` (§4.4 target-length formula).
pub fn target_length(v0: f64, v1: f64, recip_jerk: f64) -> f64 {
    let dv = (v1 - v0).abs();
    dv * (dv * recip_jerk).sqrt()
}

/// Velocity reachable after travelling `length` from `v0` under jerk
/// `jerk` (§4.4 target-velocity formula), refined by two Newton-Raphson
/// steps on `Z(x) = (x-v0)(v0+x)^2/L^2 - J`.
pub fn target_velocity(v0: f64, length: f64, jerk: f64, _recip_jerk: f64) -> f64 {
    if length <= EPSILON {
        return v0;
    }
    let mut x = length.powf(2.0 / 3.0) * jerk.cbrt() + v0;
    let l2 = length * length;
    for _ in 0..2 {
        let z = (x - v0) * (v0 + x).powi(2) / l2 - jerk;
        let dz = (v0 + x) * (3.0 * x - v0) / l2;
        if dz.abs() < EPSILON {
            break;
        }
        x -= z / dz;
    }
    x.max(0.0)
}

fn assign(buf: &mut Buffer, cruise: f64, exit: f64, head: f64, body: f64, tail: f64) {
    buf.cruise_velocity = cruise;
    buf.exit_velocity = exit;
    buf.head_length = head.max(0.0);
    buf.body_length = body.max(0.0);
    buf.tail_length = tail.max(0.0);
}

/// Assign head/body/tail lengths to `buf` without changing its total
/// length (§4.4, rules 1-7, first applicable wins).
pub fn calculate_trapezoid(buf: &mut Buffer) {
    let length = buf.length;
    let entry = buf.entry_velocity;
    let exit = buf.exit_velocity;
    let cruise_vmax = buf.cruise_vmax;
    let min_time_margin = MIN_SEGMENT_TIME_S + MIN_SEGMENT_TIME_MARGIN_S;

    // Rule 1: micro-block.
    if buf.naive_move_time < min_time_margin {
        let cruise = length / min_time_margin;
        let exit = (entry - buf.delta_vmax).max(0.0);
        assign(buf, cruise, exit, 0.0, length, 0.0);
        return;
    }

    // Rule 2: short-but-fits-one-segment.
    if buf.naive_move_time <= NOMINAL_SEGMENT_TIME_S {
        assign(buf, entry, entry, 0.0, length, 0.0);
        return;
    }

    // Rule 3: already at a matched velocity.
    if (entry - exit).abs() < EPSILON && (entry - cruise_vmax).abs() < EPSILON {
        assign(buf, entry, exit, 0.0, length, 0.0);
        return;
    }

    let head_len = target_length(entry, cruise_vmax, buf.recip_jerk);
    let tail_len = target_length(exit, cruise_vmax, buf.recip_jerk);
    let min_body_length = MIN_BODY_TIME_S * cruise_vmax.max(EPSILON);

    // Rule 4: head-only or tail-only, block too short for a cruise.
    if length <= head_len.min(tail_len) + min_body_length {
        if entry <= exit {
            let v = target_velocity(entry, length, buf.jerk, buf.recip_jerk).min(cruise_vmax);
            assign(buf, v, v.min(exit), length, 0.0, 0.0);
        } else {
            let v = target_velocity(exit, length, buf.jerk, buf.recip_jerk).min(cruise_vmax);
            assign(buf, v.max(entry), exit, 0.0, 0.0, length);
        }
        return;
    }

    // Rule 5: rate-limited symmetric head/tail.
    if (entry - exit).abs() < EPSILON && entry < cruise_vmax {
        let half = length / 2.0;
        let cruise = target_velocity(entry, half, buf.jerk, buf.recip_jerk).min(cruise_vmax);
        let half_len = target_length(entry, cruise, buf.recip_jerk);
        if half_len * 2.0 < min_body_length {
            let avg = (entry + exit) / 2.0;
            assign(buf, avg, exit, 0.0, length, 0.0);
        } else {
            assign(buf, cruise, exit, half_len, (length - 2.0 * half_len).max(0.0), half_len);
        }
        return;
    }

    // Rule 6: rate-limited asymmetric head/tail, iterate to convergence.
    if head_len + tail_len > length {
        let mut cruise = cruise_vmax;
        let (mut h, mut t) = (head_len, tail_len);
        for _ in 0..HT_ASYMMETRIC_MAX_ITERS {
            let total = h + t;
            if total <= EPSILON {
                break;
            }
            let h_frac = length * (h / total);
            let t_frac = length - h_frac;
            let new_cruise = if h >= t {
                target_velocity(entry, h_frac, buf.jerk, buf.recip_jerk)
            } else {
                target_velocity(exit, t_frac, buf.jerk, buf.recip_jerk)
            }
            .min(cruise_vmax);
            let converged = ((new_cruise - cruise) / cruise.max(EPSILON)).abs() < HT_ASYMMETRIC_TOLERANCE;
            cruise = new_cruise;
            h = target_length(entry, cruise, buf.recip_jerk);
            t = target_length(exit, cruise, buf.recip_jerk);
            if converged {
                break;
            }
        }
        assign(buf, cruise, exit, h, (length - h - t).max(0.0), t);
        return;
    }

    // Rule 7: full head-body-tail fit.
    let body = length - head_len - tail_len;
    let min_seg_head = min_time_margin * (cruise_vmax + entry);
    let min_seg_tail = min_time_margin * (cruise_vmax + exit);
    let mut h = if head_len < min_seg_head { 0.0 } else { head_len };
    let mut t = if tail_len < min_seg_tail { 0.0 } else { tail_len };
    let mut b = length - h - t;

    if b > 0.0 && b < min_body_length {
        match (h > 0.0, t > 0.0) {
            (true, true) => {
                h += b / 2.0;
                t += b / 2.0;
            }
            (true, false) => h += b,
            (false, true) => t += b,
            (false, false) => {}
        }
        b = 0.0;
    }

    if h == 0.0 && t == 0.0 {
        // No head or tail possible: forcing cruise to entry kills the
        // velocity discontinuity rather than leaving one unresolved.
        assign(buf, entry, exit, 0.0, length, 0.0);
        return;
    }

    assign(buf, cruise_vmax, exit, h, b.max(0.0), t);
}
