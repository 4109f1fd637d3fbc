//! Safety monitoring and the e-stop latch (§7).
//!
//! Grounded on `mc_hal::module_status`'s per-motor `MotorFaultFlags`
//! and `mc_common::io`'s role-based `SwitchBank`. The e-stop cause
//! (user/switch/limit/alarm) survives a forced reboot by round-tripping
//! through `mc_common::settings::SettingsTable`, the same durability
//! mechanism §13 already uses for tunables.

use mc_common::io::role::IoRole;
use mc_common::io::switches::SwitchBank;
use mc_common::settings::{SettingsTable, Value};
use mc_hal::module_status::MotorFaultFlags;

use crate::cycle::{Cycle, StateMachine};

/// Settings key the last e-stop cause is persisted under.
pub const ESTOP_CAUSE_KEY: &str = "estop_cause";

/// What asserted the e-stop (§7 E-stop: "stores cause ... in persistent
/// memory surviving forced reboot").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstopCause {
    /// Software `M112`-style command.
    User,
    /// Dedicated e-stop input line.
    EstopSwitch,
    /// A limit switch tripped outside homing/probing.
    LimitSwitch,
    /// A latched hardware/motor alarm.
    Alarm,
}

impl EstopCause {
    fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::EstopSwitch => "switch",
            Self::LimitSwitch => "limit",
            Self::Alarm => "alarm",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "user" => Self::User,
            "switch" => Self::EstopSwitch,
            "limit" => Self::LimitSwitch,
            "alarm" => Self::Alarm,
            _ => return None,
        })
    }
}

/// Register the e-stop cause key with the settings table (call once at
/// startup alongside the axis/motor settings registration).
pub fn register_settings(table: &mut SettingsTable) {
    table.register(
        ESTOP_CAUSE_KEY,
        Value::Str(String::new()),
        "Cause of the last emergency stop, persisted across reboot",
        None,
    );
}

/// Per-motor hardware-fault monitor and limit-switch alarm policy
/// (§7). Owns only live fault state; the decision to latch lives in
/// [`Safety::estop`], called by whatever loop observes the trip.
pub struct Safety {
    motor_faults: Vec<MotorFaultFlags>,
}

impl Safety {
    pub fn new(motor_count: usize) -> Self {
        Self { motor_faults: vec![MotorFaultFlags::default(); motor_count] }
    }

    pub fn set_motor_fault(&mut self, motor: usize, flags: MotorFaultFlags) {
        if let Some(slot) = self.motor_faults.get_mut(motor) {
            *slot = flags;
        }
    }

    pub fn motor_fault(&self, motor: usize) -> MotorFaultFlags {
        self.motor_faults.get(motor).copied().unwrap_or_default()
    }

    /// Any motor reporting a fault that is always an alarm regardless
    /// of cycle (driver fault, over-temp shutdown, short, open-load).
    pub fn hard_fault_motor(&self) -> Option<usize> {
        self.motor_faults.iter().position(|f| !f.hard_faults().is_empty())
    }

    /// Whether a stall on `motor` should alarm: a stall during homing
    /// is the expected end-of-travel signal, not a fault, everywhere
    /// else it alarms (§7 Hardware errors).
    pub fn stall_is_alarm(&self, motor: usize, cycle: Cycle) -> bool {
        cycle != Cycle::Homing
            && self
                .motor_faults
                .get(motor)
                .map(|f| f.contains(MotorFaultFlags::STALL))
                .unwrap_or(false)
    }

    /// A limit switch tripping outside homing/probing is always a hard
    /// alarm (§7 Limit switch).
    pub fn limit_switch_is_alarm(&self, role: &IoRole, switches: &SwitchBank, cycle: Cycle) -> bool {
        matches!(role, IoRole::LimitMin(_) | IoRole::LimitMax(_))
            && switches.read(role) == Some(true)
            && !matches!(cycle, Cycle::Homing | Cycle::Probing)
    }

    /// Latch an e-stop: halts the plan-state machine immediately (same
    /// cycle, per §7) and persists `cause` so it survives a reboot.
    pub fn estop(&self, sm: &mut StateMachine, settings: &mut SettingsTable, cause: EstopCause) {
        sm.enter_estop();
        let _ = settings.set(ESTOP_CAUSE_KEY, Value::Str(cause.as_str().to_string()));
    }

    /// Read back the last latched cause, e.g. to report it after a
    /// reboot that followed an e-stop.
    pub fn last_estop_cause(settings: &SettingsTable) -> Option<EstopCause> {
        match settings.get(ESTOP_CAUSE_KEY) {
            Some(Value::Str(s)) if !s.is_empty() => EstopCause::parse(s),
            _ => None,
        }
    }
}
