//! §8 "Homing with back-off": Z switch initially engaged, `G28.2 Z0`.
//!
//! Expected sequence: back-off `latch_backoff` at search velocity; fast
//! search `-(travel_max-travel_min+latch_backoff)`; slow latch
//! `+latch_backoff` until the switch opens; zero back-off
//! `+zero_backoff`; axis marked homed with position zero.

use mc_common::consts::NUM_AXES;
use mc_common::io::role::{DiLogic, IoRole};
use mc_common::io::switches::SwitchBank;
use mc_core::axis::{Axis, AxisConfig, AxisMode, HomingMode, HomingParams};
use mc_core::cycles::homing::{HomingCycle, HomingEvent, HomingOutcome};

const Z: usize = 2;

fn axes_with_z_homing(mode: HomingMode) -> Vec<Axis> {
    (0..NUM_AXES)
        .map(|axis| {
            let homing_mode = if axis == Z { mode } else { HomingMode::Disabled };
            Axis::try_from(AxisConfig {
                mode: AxisMode::Standard,
                max_velocity: 6000.0,
                jerk: 20.0,
                junction_deviation: 0.01,
                travel_min: 0.0,
                travel_max: 100.0,
                homing: HomingParams {
                    search_velocity: 500.0,
                    latch_velocity: 50.0,
                    latch_backoff: 5.0,
                    zero_backoff: 1.0,
                    jerk: 10.0,
                    mode: homing_mode,
                },
                rotary_radius: 0.0,
            })
            .unwrap()
        })
        .collect()
}

fn requested_z_only() -> [bool; NUM_AXES] {
    let mut r = [false; NUM_AXES];
    r[Z] = true;
    r
}

#[test]
fn engaged_min_switch_backs_off_before_the_full_search_latch_backoff_sequence() {
    let axes = axes_with_z_homing(HomingMode::SwitchMin);
    let mut switches = SwitchBank::new();
    switches.bind(IoRole::LimitMin(Z as u8), 0, DiLogic::NO);
    switches.bind(IoRole::LimitMax(Z as u8), 1, DiLogic::NO);
    switches.set_raw(0, true); // Z min switch already engaged

    let mut cycle = HomingCycle::new(requested_z_only(), true);

    // Step 1-3: clear the already-engaged switch.
    let outcome = cycle.next_move(&axes, &switches).unwrap();
    let HomingOutcome::Move(clear) = outcome else { panic!("expected a clearing move") };
    assert_eq!(clear.axis, Z);
    assert_eq!(clear.distance, 5.0); // +latch_backoff, away from the min switch
    assert_eq!(clear.velocity, 500.0); // at search velocity

    // Step 4: fast search back toward the switch.
    let outcome = cycle.advance(HomingEvent::MoveComplete, &axes, &switches).unwrap();
    let HomingOutcome::Move(search) = outcome else { panic!("expected a search move") };
    assert_eq!(search.distance, -(100.0 - 0.0 + 5.0));
    assert_eq!(search.velocity, 500.0);

    // Step 5: slow latch away from the switch once it trips.
    let outcome = cycle.advance(HomingEvent::SwitchChanged(true), &axes, &switches).unwrap();
    let HomingOutcome::Move(latch) = outcome else { panic!("expected a latch move") };
    assert_eq!(latch.distance, 5.0);
    assert_eq!(latch.velocity, 50.0);

    // Step 6: final zero back-off once the switch clears.
    let outcome = cycle.advance(HomingEvent::SwitchChanged(false), &axes, &switches).unwrap();
    let HomingOutcome::Move(backoff) = outcome else { panic!("expected a zero-backoff move") };
    assert_eq!(backoff.distance, 1.0);
    assert_eq!(backoff.velocity, 500.0);

    // Step 7: axis marked homed with position zero.
    let outcome = cycle.advance(HomingEvent::MoveComplete, &axes, &switches).unwrap();
    assert_eq!(outcome, HomingOutcome::AxisHomed { axis: Z, zero_position: true });
}
