//! §8 "Soft-limit rejection": axis X homed with `travel_max=100`, issue
//! `G1 X150 F600`.
//!
//! Expected: block rejected with a soft-limit error, queue unchanged,
//! no motion (§8 invariant 6: no step issued past a homed axis's travel
//! bounds).

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
        travel_min: 0.0,
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
    let mut axes: Vec<Axis> = (0..NUM_AXES).map(|_| Axis::try_from(config.clone()).unwrap()).collect();
    axes[0].homed = true;
    axes
}

#[test]
fn homed_axis_rejects_a_target_past_travel_max() {
    let axes = test_axes();
    let mut parser = Parser::new();
    let mut planner = Planner::new();

    parser.execute_line("G90 F600", &axes, &mut planner, 0.0).unwrap();
    let result = parser.execute_line("G1 X150", &axes, &mut planner, 0.0);

    assert!(result.is_err(), "a target past travel_max must be rejected");
    assert!(planner.is_empty(), "the queue must be unchanged after a rejected block");
    assert_eq!(parser.machine.position()[0], 0.0, "the machine position must not move on a rejected block");
}
