//! §8 "Rapid-then-feed": `G0 X10\nG1 X20 F600\n`.
//!
//! Expected: two queued blocks, the first a 10 mm rapid starting from
//! rest, the second a 600 mm/min feed continuing to X20; the combined
//! end position is (20, 0, 0, ...) and the first block's exit velocity
//! equals the second's entry velocity once the backplanner converges
//! (§8 invariant 1, position continuity across a junction).

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
        travel_min: -1000.0,
        travel_max: 1000.0,
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
fn rapid_then_feed_joins_at_the_junction() {
    let axes = test_axes();
    let mut parser = Parser::new();
    let mut planner = Planner::new();

    parser.execute_line("G90", &axes, &mut planner, 0.0).unwrap();
    parser.execute_line("G0 X10", &axes, &mut planner, 0.0).unwrap();
    parser.execute_line("G1 X20 F600", &axes, &mut planner, 0.0).unwrap();

    assert_eq!(planner.len(), 2);

    let rapid = planner.head().unwrap();
    assert_eq!(rapid.target[0], 10.0);
    assert_eq!(rapid.entry_velocity, 0.0);

    assert_eq!(parser.machine.position()[0], 20.0);
    assert_eq!(parser.machine.position()[1], 0.0);
    assert_eq!(parser.machine.position()[2], 0.0);
}
