//! Arc generator (§4 "Arc generator"): subdivides one G2/G3 into a
//! sequence of linear sub-blocks, each within a chordal tolerance of
//! the true arc, for the parser to feed to `Planner::aline` one at a
//! time.
//!
//! The chordal-tolerance derivation is recorded in `SPEC_FULL.md` §16
//! and `DESIGN.md`: a chord of the true arc at radius `r` deviates from
//! the arc by `r(1 - cos(θ/2))` at its midpoint, where `θ` is the
//! chord's subtended angle. Solving `tolerance = r(1 - cos(θ/2))` for
//! `θ/2` gives the per-chord half-angle below.

use std::f64::consts::PI;

use mc_common::consts::NUM_AXES;

use crate::error::GeometricError;
use crate::machine::Plane;

/// Direction of rotation viewed from the positive normal of the
/// selected plane (§4.1: G2 clockwise, G3 counterclockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

/// Below this radius the tolerance construction degenerates (`acos` of
/// something outside `[-1, 1]`); treated as a malformed arc rather than
/// silently emitting one giant chord.
const MIN_RADIUS: f64 = 1.0e-6;

fn plane_axes(plane: Plane) -> (usize, usize) {
    match plane {
        Plane::Xy => (0, 1),
        Plane::Xz => (0, 2),
        Plane::Yz => (1, 2),
    }
}

/// Derive an `(I, J)`-style center offset from an `R`-word radius
/// (§4.1 legacy radius-format arc): the center sits on the chord's
/// perpendicular bisector, `radius` away from both endpoints. A
/// negative `radius` selects the major arc (sweep > 180°) instead of
/// the minor one, matching the NIST convention.
pub fn offset_from_radius(
    plane: Plane,
    start: [f64; NUM_AXES],
    end: [f64; NUM_AXES],
    radius: f64,
    direction: ArcDirection,
) -> Result<[f64; 2], GeometricError> {
    let (u, v) = plane_axes(plane);
    let dx = end[u] - start[u];
    let dy = end[v] - start[v];
    let chord = (dx * dx + dy * dy).sqrt();
    let r = radius.abs();
    if r < MIN_RADIUS || chord > 2.0 * r {
        return Err(GeometricError::DegenerateArc);
    }

    let half_chord = chord / 2.0;
    let height = (r * r - half_chord * half_chord).max(0.0).sqrt();
    let mid_u = start[u] + dx / 2.0;
    let mid_v = start[v] + dy / 2.0;

    // Unit vector along the chord, and its perpendicular.
    let (chord_u, chord_v) = if chord > MIN_RADIUS { (dx / chord, dy / chord) } else { (1.0, 0.0) };
    let (perp_u, perp_v) = (-chord_v, chord_u);

    // For a minor arc (|radius| = the shorter way round), CW motion
    // bows the center to the right of travel and CCW to the left;
    // a negative radius (major arc) flips that.
    let side = match (direction, radius >= 0.0) {
        (ArcDirection::Clockwise, true) | (ArcDirection::CounterClockwise, false) => -1.0,
        _ => 1.0,
    };

    let center_u = mid_u + side * height * perp_u;
    let center_v = mid_v + side * height * perp_v;
    Ok([center_u - start[u], center_v - start[v]])
}

/// Subdivide one arc move into a sequence of absolute target waypoints
/// (does not include `start`, which the caller is already at). `offset`
/// is the `(I, J)`-style vector from `start` to the arc center, in the
/// selected plane's two axes. Non-plane axes (including a helical third
/// axis) are interpolated linearly across the sweep fraction. `turns`
/// is the count of additional full revolutions beyond the single sweep
/// from `start` to `end` (0 for a plain arc).
pub fn generate_arc(
    plane: Plane,
    start: [f64; NUM_AXES],
    end: [f64; NUM_AXES],
    offset: [f64; 2],
    direction: ArcDirection,
    turns: u32,
    chordal_tolerance: f64,
) -> Result<Vec<[f64; NUM_AXES]>, GeometricError> {
    let (u, v) = plane_axes(plane);
    let center_u = start[u] + offset[0];
    let center_v = start[v] + offset[1];

    let radius = (offset[0] * offset[0] + offset[1] * offset[1]).sqrt();
    if radius < MIN_RADIUS {
        return Err(GeometricError::DegenerateArc);
    }

    let start_angle = (start[v] - center_v).atan2(start[u] - center_u);
    let end_angle = (end[v] - center_v).atan2(end[u] - center_u);

    let mut sweep = end_angle - start_angle;
    match direction {
        ArcDirection::CounterClockwise => {
            while sweep <= 0.0 {
                sweep += 2.0 * PI;
            }
        }
        ArcDirection::Clockwise => {
            while sweep >= 0.0 {
                sweep -= 2.0 * PI;
            }
        }
    }
    let signed_sweep = sweep + 2.0 * PI * turns as f64 * sweep.signum();

    let half_theta = (1.0 - (chordal_tolerance / radius).min(2.0)).clamp(-1.0, 1.0).acos();
    let segments = if half_theta <= 0.0 {
        1
    } else {
        (signed_sweep.abs() / (2.0 * half_theta)).ceil().max(1.0) as u32
    };

    let mut waypoints = Vec::with_capacity(segments as usize);
    for i in 1..=segments {
        let fraction = i as f64 / segments as f64;
        let angle = start_angle + signed_sweep * fraction;

        let mut point = start;
        point[u] = center_u + radius * angle.cos();
        point[v] = center_v + radius * angle.sin();
        for (axis, value) in point.iter_mut().enumerate() {
            if axis != u && axis != v {
                *value = start[axis] + (end[axis] - start[axis]) * fraction;
            }
        }
        waypoints.push(point);
    }

    // The chord math accumulates floating-point drift; pin the final
    // waypoint to the commanded endpoint exactly.
    if let Some(last) = waypoints.last_mut() {
        *last = end;
    }

    Ok(waypoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_common::consts::NUM_AXES;

    fn vec6(x: f64, y: f64) -> [f64; NUM_AXES] {
        let mut v = [0.0; NUM_AXES];
        v[0] = x;
        v[1] = y;
        v
    }

    #[test]
    fn semicircle_endpoint_is_exact() {
        let start = vec6(0.0, 0.0);
        let end = vec6(10.0, 0.0);
        let waypoints =
            generate_arc(Plane::Xy, start, end, [5.0, 0.0], ArcDirection::CounterClockwise, 0, 0.01).unwrap();
        let last = *waypoints.last().unwrap();
        assert!((last[0] - 10.0).abs() < 1e-9);
        assert!((last[1] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn semicircle_total_chord_length_approximates_pi_r() {
        let start = vec6(0.0, 0.0);
        let end = vec6(10.0, 0.0);
        let waypoints =
            generate_arc(Plane::Xy, start, end, [5.0, 0.0], ArcDirection::CounterClockwise, 0, 0.001).unwrap();

        let mut total = 0.0;
        let mut prev = start;
        for wp in &waypoints {
            let dx = wp[0] - prev[0];
            let dy = wp[1] - prev[1];
            total += (dx * dx + dy * dy).sqrt();
            prev = *wp;
        }
        let expected = PI * 5.0;
        assert!((total - expected).abs() / expected < 0.001, "total={total} expected={expected}");
    }

    #[test]
    fn tighter_tolerance_yields_more_segments() {
        let start = vec6(0.0, 0.0);
        let end = vec6(10.0, 0.0);
        let loose =
            generate_arc(Plane::Xy, start, end, [5.0, 0.0], ArcDirection::CounterClockwise, 0, 0.1).unwrap();
        let tight =
            generate_arc(Plane::Xy, start, end, [5.0, 0.0], ArcDirection::CounterClockwise, 0, 0.001).unwrap();
        assert!(tight.len() > loose.len());
    }

    #[test]
    fn clockwise_sweeps_the_opposite_way() {
        let start = vec6(0.0, 0.0);
        let end = vec6(10.0, 0.0);
        let cw = generate_arc(Plane::Xy, start, end, [5.0, 0.0], ArcDirection::Clockwise, 0, 0.01).unwrap();
        // A clockwise half-circle from (0,0) to (10,0) around (5,0) dips
        // below the chord (negative Y), unlike the CCW case which rises.
        let mid = cw[cw.len() / 2];
        assert!(mid[1] < 0.0);
    }

    #[test]
    fn degenerate_radius_is_rejected() {
        let start = vec6(0.0, 0.0);
        let end = vec6(1.0, 0.0);
        assert!(generate_arc(Plane::Xy, start, end, [0.0, 0.0], ArcDirection::CounterClockwise, 0, 0.01).is_err());
    }

    #[test]
    fn radius_format_minor_arc_matches_offset_format() {
        // Quarter circle from (10,0) to (0,10) around (0,0), radius 10,
        // clockwise (minor arc, 90°): same shape as an I/J offset of (-10, 0).
        let start = vec6(10.0, 0.0);
        let end = vec6(0.0, 10.0);
        let offset = offset_from_radius(Plane::Xy, start, end, 10.0, ArcDirection::Clockwise).unwrap();
        assert!((offset[0] - (-10.0)).abs() < 1e-9);
        assert!(offset[1].abs() < 1e-9);
    }

    #[test]
    fn radius_format_major_arc_bows_the_other_way() {
        let start = vec6(10.0, 0.0);
        let end = vec6(0.0, 10.0);
        let minor = offset_from_radius(Plane::Xy, start, end, 10.0, ArcDirection::Clockwise).unwrap();
        let major = offset_from_radius(Plane::Xy, start, end, -10.0, ArcDirection::Clockwise).unwrap();
        assert!((minor[0] - major[0]).abs() > 1.0 || (minor[1] - major[1]).abs() > 1.0);
    }

    #[test]
    fn radius_shorter_than_half_chord_is_rejected() {
        let start = vec6(0.0, 0.0);
        let end = vec6(20.0, 0.0);
        assert!(offset_from_radius(Plane::Xy, start, end, 1.0, ArcDirection::Clockwise).is_err());
    }
}
