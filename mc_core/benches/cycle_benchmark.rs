//! Motion pipeline benchmark — measure planner + executor throughput
//! for queues of back-to-back `aline` blocks.
//!
//! Grounded on `executor.rs`'s own `a_move_eventually_completes_the_block`
//! test for the exec/scheduler drive loop; adapted from the teacher's
//! `cycle_benchmark.rs` (which swept axis count) to sweep queue depth
//! instead, since this crate's axis count is fixed at
//! `mc_common::consts::NUM_AXES`.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use mc_common::consts::NUM_AXES;
use mc_core::axis::{Axis, AxisConfig, AxisMode, HomingMode, HomingParams};
use mc_core::executor::{self, Executor, Runtime};
use mc_core::planner::{MoveTimeMode, Planner};
use mc_hal::drivers::simulation::SimulatedDriver;
use mc_hal::scheduler::{MotorMapping, StepperScheduler};

fn bench_axis() -> Axis {
    Axis::try_from(AxisConfig {
        mode: AxisMode::Standard,
        max_velocity: 6000.0,
        jerk: 20.0,
        junction_deviation: 0.01,
        travel_min: 0.0,
        travel_max: 10_000.0,
        homing: HomingParams {
            search_velocity: 100.0,
            latch_velocity: 10.0,
            latch_backoff: 5.0,
            zero_backoff: 1.0,
            jerk: 10.0,
            mode: HomingMode::Disabled,
        },
        rotary_radius: 0.0,
    })
    .unwrap()
}

fn identity_mappings() -> [MotorMapping; NUM_AXES] {
    let mut m = [MotorMapping::UNMAPPED; NUM_AXES];
    for (i, mapping) in m.iter_mut().enumerate() {
        mapping.axis = Some(i as u8);
        mapping.steps_per_unit = 100.0;
    }
    m
}

/// Queue `depth` short X-axis moves, then drain the whole queue through
/// the executor against a simulated driver.
fn run_pipeline(depth: usize) {
    let axes: Vec<Axis> = (0..NUM_AXES).map(|_| bench_axis()).collect();
    let mut planner = Planner::new();
    let mut position = [0.0; NUM_AXES];
    for line in 0..depth {
        let mut target = position;
        target[0] += 10.0;
        planner
            .aline(&axes, position, target, 3000.0, MoveTimeMode::UnitsPerMinute, false, line as u32, 0.0)
            .unwrap();
        position = target;
    }

    let mut exec = Executor::new();
    let mut runtime = Runtime::new([0.0; NUM_AXES]);
    let mut scheduler = StepperScheduler::new();
    let mappings = identity_mappings();
    let inhibited = [false; NUM_AXES];
    let mut driver = SimulatedDriver::new(mc_hal::scheduler::NUM_MOTORS);
    let mut now = 0.0;

    while !planner.is_empty() {
        let status = executor::exec_move(
            &mut exec, &mut runtime, &mut planner, &mut scheduler, &mappings, &inhibited, false, false, false, now,
        )
        .unwrap();
        let _ = scheduler.load_move(&mut driver);
        scheduler.complete_run();
        now += mc_common::consts::NOMINAL_SEGMENT_TIME_S;
        if status == executor::ExecStatus::Idle && planner.is_empty() {
            break;
        }
    }
}

fn bench_queue_depths(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion_pipeline");
    for depth in [1usize, 8, 48] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| run_pipeline(depth));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queue_depths);
criterion_main!(benches);
