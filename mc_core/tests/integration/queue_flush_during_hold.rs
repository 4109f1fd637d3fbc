//! §8 "Queue-flush during hold": motion in progress, receive hold,
//! wait until `holding`, send flush, send resume.
//!
//! Expected: planner queue drained, machine model position synchronised
//! to the runtime, plan-state returns to `ready`.

use mc_common::consts::NUM_AXES;
use mc_core::axis::{Axis, AxisConfig, AxisMode, HomingMode, HomingParams};
use mc_core::cycle::{PlanState, StateMachine};
use mc_core::executor::{self, Executor, Runtime};
use mc_core::machine::Machine;
use mc_core::planner::{MoveTimeMode, Planner};
use mc_hal::drivers::simulation::SimulatedDriver;
use mc_hal::scheduler::{MotorMapping, StepperScheduler};

fn test_axes() -> Vec<Axis> {
    let config = AxisConfig {
        mode: AxisMode::Standard,
        max_velocity: 6000.0,
        jerk: 20.0,
        junction_deviation: 0.01,
        travel_min: -2000.0,
        travel_max: 2000.0,
        homing: HomingParams {
            search_velocity: 100.0,
            latch_velocity: 10.0,
            latch_backoff: 1.0,
            zero_backoff: 1.0,
            jerk: 10.0,
            mode: HomingMode::Disabled,
        },
        rotary_radius: 0.0,
    };
    (0..NUM_AXES).map(|_| Axis::try_from(config.clone()).unwrap()).collect()
}

fn identity_mappings() -> [MotorMapping; NUM_AXES] {
    let mut m = [MotorMapping::UNMAPPED; NUM_AXES];
    for (i, mapping) in m.iter_mut().enumerate() {
        mapping.axis = Some(i as u8);
        mapping.steps_per_unit = 100.0;
    }
    m
}

#[test]
fn hold_then_flush_then_resume_returns_to_ready_with_an_empty_queue() {
    let axes = test_axes();
    let mut planner = Planner::new();
    let mut target = [0.0; NUM_AXES];
    target[0] = 1000.0;
    planner
        .aline(&axes, [0.0; NUM_AXES], target, 6000.0, MoveTimeMode::UnitsPerMinute, false, 1, 0.0)
        .unwrap();

    let mut exec = Executor::new();
    let mut runtime = Runtime::new([0.0; NUM_AXES]);
    let mut scheduler = StepperScheduler::new();
    let mut driver = SimulatedDriver::new(mc_hal::scheduler::NUM_MOTORS);
    let mappings = identity_mappings();
    let inhibited = [false; NUM_AXES];
    let mut machine = Machine::new();
    let mut state = StateMachine::new();
    state.enter_running();

    let mut now = 0.0;
    let mut hold_requested = false;
    let mut holding = false;

    // Run until motion is in progress, then request a hold, then run
    // until fully stopped and commit `Holding`.
    for _ in 0..200_000 {
        if !hold_requested && runtime.position[0] >= 20.0 {
            state.request_hold();
            hold_requested = true;
        }

        state.tick(&mut planner, &mut machine, &scheduler, &runtime, || {});

        let status = executor::exec_move(
            &mut exec, &mut runtime, &mut planner, &mut scheduler, &mappings, &inhibited, false, false,
            state.is_stopping(), now,
        )
        .unwrap();
        let _ = scheduler.load_move(&mut driver);
        scheduler.complete_run();
        now += mc_common::consts::NOMINAL_SEGMENT_TIME_S;

        if hold_requested && runtime.velocity.abs() < 1e-6 && !runtime.is_busy() {
            state.enter_holding();
            holding = true;
            break;
        }
        if status == executor::ExecStatus::Idle && planner.is_empty() {
            break;
        }
    }

    assert!(holding, "never reached the Holding state");
    assert_eq!(state.state(), PlanState::Holding);
    assert!(!planner.is_empty(), "queue should still hold the truncated restart buffer");

    let stopped_position = runtime.position;

    state.request_flush();
    state.request_resume();
    let mut flushed = false;
    state.tick(&mut planner, &mut machine, &scheduler, &runtime, || flushed = true);

    assert!(flushed, "on_flush callback should fire exactly once");
    assert!(planner.is_empty(), "the queue must be drained by the flush");
    assert_eq!(machine.position(), stopped_position, "machine position must sync to the runtime's stop point");
    assert_eq!(state.state(), PlanState::Ready);
}
