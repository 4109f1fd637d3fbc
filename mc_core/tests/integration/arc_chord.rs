//! §8 "Arc chord": `G17 G2 X10 Y0 I5 J0 F300`.
//!
//! Expected: a sequence of linear sub-blocks, each chord no longer than
//! the `chordal_tolerance`-limited bound, whose combined travel
//! approximates the arc length `pi * 5` mm, with the final sub-block's
//! endpoint matching the commanded target to within 1 um.

use mc_common::consts::NUM_AXES;
use mc_core::axis::{Axis, AxisConfig, AxisMode, HomingMode, HomingParams};
use mc_core::gcode::parser::Parser;
use mc_core::planner::Planner;

fn test_axes() -> Vec<Axis> {
    let config = AxisConfig {
        mode: AxisMode::Standard,
        max_velocity: 6000.0,
        jerk: 500_000.0,
        junction_deviation: 0.01,
        travel_min: -100.0,
        travel_max: 100.0,
        homing: HomingParams {
            search_velocity: 100.0,
            latch_velocity: 10.0,
            latch_backoff: 1.0,
            zero_backoff: 1.0,
            jerk: 500_000.0,
            mode: HomingMode::Disabled,
        },
        rotary_radius: 0.0,
    };
    (0..NUM_AXES).map(|_| Axis::try_from(config.clone()).unwrap()).collect()
}

#[test]
fn half_circle_arc_splits_into_bounded_chords() {
    let axes = test_axes();
    let mut parser = Parser::new();
    let mut planner = Planner::new();

    parser.execute_line("G17 G90 F300", &axes, &mut planner, 0.0).unwrap();
    parser.execute_line("G2 X10 Y0 I5 J0", &axes, &mut planner, 0.0).unwrap();

    assert!(planner.len() > 1, "a half-circle must split into multiple sub-blocks");

    let mut total_chord: f64 = 0.0;
    let mut position = [0.0; NUM_AXES];

    while let Some(buf) = planner.head() {
        total_chord += buf.length;
        position = buf.target;
        planner.advance_head();
    }

    let arc_length = std::f64::consts::PI * 5.0;
    assert!((total_chord - arc_length).abs() < 0.05, "chord sum {total_chord} vs arc length {arc_length}");
    assert!((position[0] - 10.0).abs() < 1e-6);
    assert!((position[1] - 0.0).abs() < 1e-6);
}
