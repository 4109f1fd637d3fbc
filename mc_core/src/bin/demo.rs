//! Demonstration binary: feeds a G-code file through the parser,
//! planner, executor and simulated stepper driver, printing a status
//! report after every completed block.
//!
//! CLI shape follows `evo_hal`'s `main.rs` (`clap::Parser` derive,
//! `--verbose`/`--json` tracing setup); the exec/scheduler drive loop
//! mirrors `executor.rs`'s own `a_move_eventually_completes_the_block`
//! test, which is the only place in this crate that already shows the
//! full exec-then-load_move cadence end to end.

use std::path::PathBuf;

use clap::Parser as ClapParser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use mc_core::config::{self, MachineConfig};
use mc_core::executor::{self, ExecStatus, Executor, Runtime};
use mc_core::gcode::parser::Parser as GcodeParser;
use mc_core::planner::Planner;
use mc_core::report::StatusReport;
use mc_hal::drivers::simulation::SimulatedDriver;
use mc_hal::scheduler::StepperScheduler;

/// A default 3-axis machine, embedded so the demo runs with no config
/// file on hand; `--config` overrides it.
const DEFAULT_MACHINE_TOML: &str = r#"
[[axes]]
mode = "standard"
max_velocity = 6000.0
jerk = 20.0
junction_deviation = 0.01
travel_min = 0.0
travel_max = 300.0
[axes.homing]
search_velocity = 500.0
latch_velocity = 50.0
latch_backoff = 5.0
zero_backoff = 1.0
jerk = 10.0
mode = "disabled"

[[axes]]
mode = "standard"
max_velocity = 6000.0
jerk = 20.0
junction_deviation = 0.01
travel_min = 0.0
travel_max = 300.0
[axes.homing]
search_velocity = 500.0
latch_velocity = 50.0
latch_backoff = 5.0
zero_backoff = 1.0
jerk = 10.0
mode = "disabled"

[[axes]]
mode = "standard"
max_velocity = 3000.0
jerk = 10.0
junction_deviation = 0.01
travel_min = 0.0
travel_max = 150.0
[axes.homing]
search_velocity = 200.0
latch_velocity = 20.0
latch_backoff = 5.0
zero_backoff = 1.0
jerk = 5.0
mode = "disabled"

[[motors]]
step_angle = 1.8
travel_per_rev = 5.0
microsteps = 16
polarity = "normal"
power_mode = "in_cycle"
axis = 0

[[motors]]
step_angle = 1.8
travel_per_rev = 5.0
microsteps = 16
polarity = "normal"
power_mode = "in_cycle"
axis = 1

[[motors]]
step_angle = 1.8
travel_per_rev = 5.0
microsteps = 16
polarity = "normal"
power_mode = "in_cycle"
axis = 2
"#;

/// Motion core demonstration: run a G-code file through the planner and
/// executor against a simulated driver.
#[derive(ClapParser, Debug)]
#[command(name = "mc_core_demo")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Run a G-code file through the motion core against a simulated driver")]
struct Args {
    /// Path to a G-code file. Reads from stdin if omitted.
    gcode: Option<PathBuf>,

    /// Path to a machine configuration TOML file; uses an embedded
    /// 3-axis default if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    if let Err(err) = run(&args) {
        error!("demo run failed: {err}");
        std::process::exit(1);
    }
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let machine_config = load_machine_config(args.config.as_deref())?;
    info!(
        axes = machine_config.axes.len(),
        motors = machine_config.motors.len(),
        "machine configuration loaded"
    );

    let program = read_program(args.gcode.as_deref())?;

    let mut gcode = GcodeParser::new();
    let mut planner = Planner::new();
    let mut exec = Executor::new();
    let mut runtime = Runtime::new([0.0; mc_common::consts::NUM_AXES]);
    let mut scheduler = StepperScheduler::new();
    let mut driver = SimulatedDriver::new(mc_hal::scheduler::NUM_MOTORS);

    let mappings = machine_config.motor_mappings();
    let inhibited = [false; mc_common::consts::NUM_AXES];
    let mut now = 0.0;

    for (lineno, raw_line) in program.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        match gcode.execute_line(line, &machine_config.axes, &mut planner, now) {
            Ok((Some(message), _)) => info!(line = lineno + 1, "MSG: {message}"),
            Ok((None, _)) => {}
            Err(err) => {
                warn!(line = lineno + 1, %err, "rejected block, skipping");
                continue;
            }
        }

        drain_planner(&mut exec, &mut runtime, &mut planner, &mut scheduler, &mut driver, &mappings, &inhibited, &mut now);
    }

    info!("program complete");
    Ok(())
}

/// Run `exec_move`/`load_move` until the planner empties out, reporting
/// status after every completed block, the same drive loop
/// `executor.rs`'s own tests use against [`SimulatedDriver`].
#[allow(clippy::too_many_arguments)]
fn drain_planner(
    exec: &mut Executor,
    runtime: &mut Runtime,
    planner: &mut Planner,
    scheduler: &mut StepperScheduler,
    driver: &mut SimulatedDriver,
    mappings: &[mc_hal::MotorMapping; mc_common::consts::NUM_AXES],
    inhibited: &[bool; mc_common::consts::NUM_AXES],
    now: &mut f64,
) {
    while !planner.is_empty() {
        let status = match executor::exec_move(
            exec, runtime, planner, scheduler, mappings, inhibited, false, false, false, *now,
        ) {
            Ok(status) => status,
            Err(err) => {
                error!(%err, "executor fault, abandoning block");
                break;
            }
        };

        if let Err(err) = scheduler.load_move(driver) {
            warn!(%err, "scheduler load_move failed");
        }
        driver.tick(mc_common::consts::NOMINAL_SEGMENT_TIME_S);
        scheduler.complete_run();

        *now += mc_common::consts::NOMINAL_SEGMENT_TIME_S;

        if status == ExecStatus::BlockComplete {
            StatusReport::new(
                runtime.position,
                runtime.velocity,
                0,
                mc_core::cycle::PlanState::Running,
                mc_core::cycle::Cycle::Machining,
            )
            .emit();
        }
        if status == ExecStatus::Idle {
            break;
        }
    }
}

fn load_machine_config(path: Option<&std::path::Path>) -> Result<MachineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(config::load_config(p)?),
        None => Ok(config::load_config_from_str(DEFAULT_MACHINE_TOML)?),
    }
}

fn read_program(path: Option<&std::path::Path>) -> Result<String, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(std::fs::read_to_string(p)?),
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
