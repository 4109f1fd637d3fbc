//! Junction-velocity formulation (§4.4): Sonny Jeon's centripetal-
//! acceleration approach, as used by the original firmware's planner.
//! New code grounded numerically on `original_source/src/plan/line.c`'s
//! `_get_junction_vmax`.

use mc_common::consts::{
    COS_REVERSAL_THRESHOLD, COS_STRAIGHT_THRESHOLD, EPSILON, JUNCTION_VELOCITY_STRAIGHT, NUM_AXES,
};

use crate::axis::Axis;

/// Highest speed at which two consecutive unit-vector directions can be
/// traversed without exceeding `junction_acceleration` (§4.4).
pub fn junction_velocity(
    axes: &[Axis],
    prev_unit: &[f64; NUM_AXES],
    unit: &[f64; NUM_AXES],
    junction_acceleration: f64,
) -> f64 {
    let cos_theta: f64 = -prev_unit
        .iter()
        .zip(unit.iter())
        .map(|(a, b)| a * b)
        .sum::<f64>();

    if cos_theta < COS_STRAIGHT_THRESHOLD {
        return JUNCTION_VELOCITY_STRAIGHT;
    }
    if cos_theta > COS_REVERSAL_THRESHOLD {
        return 0.0;
    }

    let sum_a: f64 = prev_unit
        .iter()
        .enumerate()
        .map(|(i, a)| (a * axes.get(i).map(|x| x.junction_deviation).unwrap_or(0.0)).powi(2))
        .sum::<f64>()
        .sqrt();
    let sum_b: f64 = unit
        .iter()
        .enumerate()
        .map(|(i, b)| (b * axes.get(i).map(|x| x.junction_deviation).unwrap_or(0.0)).powi(2))
        .sum::<f64>()
        .sqrt();
    let delta = (sum_a + sum_b) / 2.0;

    let s = ((1.0 - cos_theta) / 2.0).max(0.0).sqrt();
    if (1.0 - s).abs() < EPSILON {
        return JUNCTION_VELOCITY_STRAIGHT;
    }
    let radius = delta * s / (1.0 - s);
    (radius * junction_acceleration).sqrt()
}
