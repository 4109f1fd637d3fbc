//! Probe cycle (§4.7, G38.2). Grounded on
//! `original_source/src/cycle_probing.c`'s `cm_straight_probe` /
//! `_probing_init` / `_probing_start` / `_probing_finish`: validates
//! the destination, issues one straight feed, and resolves to
//! `Succeeded`/`Failed` from the probe switch's state once the move
//! stops — a failure to trigger is not an error (the source's own
//! comment: "it is *not* an error condition for the probe not to
//! trigger"), only a `MovedDuringProbe`/`InvalidProbeDestination`
//! precondition violation is.

use mc_common::consts::{NUM_AXES, NUM_LINEAR_AXES, MINIMUM_PROBE_TRAVEL};
use mc_common::io::role::IoRole;
use mc_common::io::switches::SwitchBank;

use crate::error::GeometricError;

/// Outcome recorded once the probe move stops (§4.7, §6 `probe_results`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    /// The probe switch was active when the move ended; `position` is
    /// the absolute machine position to record into `probe_results`.
    Succeeded { position: [f64; NUM_AXES] },
    /// The programmed target was reached without the switch firing.
    Failed,
}

/// Validate a straight-probe request before it is queued (§4.7 step 0):
/// rejects destinations too close to the current position or that would
/// move any of the A/B/C axes, and rejects starting with the switch
/// already engaged.
pub fn validate(
    start: [f64; NUM_AXES],
    target: [f64; NUM_AXES],
    probe_role: &IoRole,
    switches: &SwitchBank,
) -> Result<(), GeometricError> {
    if switches.read(probe_role).unwrap_or(false) {
        return Err(GeometricError::MovedDuringProbe);
    }

    let mut xyz_sq = 0.0;
    for axis in 0..NUM_LINEAR_AXES {
        let d = target[axis] - start[axis];
        xyz_sq += d * d;
    }
    if xyz_sq.sqrt() < MINIMUM_PROBE_TRAVEL {
        return Err(GeometricError::InvalidProbeDestination);
    }
    for axis in NUM_LINEAR_AXES..NUM_AXES {
        if (target[axis] - start[axis]).abs() > f64::EPSILON {
            return Err(GeometricError::InvalidProbeDestination);
        }
    }
    Ok(())
}

/// Called once the probe move has stopped (either it ran to the
/// programmed target, or the executor cut it short on switch trigger);
/// resolves the outcome from the switch's current state.
pub fn finish(position: [f64; NUM_AXES], probe_role: &IoRole, switches: &SwitchBank) -> ProbeOutcome {
    if switches.read(probe_role).unwrap_or(false) {
        ProbeOutcome::Succeeded { position }
    } else {
        ProbeOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_common::io::role::DiLogic;

    fn probe_switches(engaged: bool) -> SwitchBank {
        let mut bank = SwitchBank::new();
        bank.bind(IoRole::Probe, 0, DiLogic::NO);
        bank.set(IoRole::Probe, engaged);
        bank
    }

    #[test]
    fn rejects_destination_already_touching_probe() {
        let switches = probe_switches(true);
        let start = [0.0; NUM_AXES];
        let mut target = [0.0; NUM_AXES];
        target[2] = -10.0;
        assert_eq!(
            validate(start, target, &IoRole::Probe, &switches),
            Err(GeometricError::MovedDuringProbe)
        );
    }

    #[test]
    fn rejects_too_short_a_travel() {
        let switches = probe_switches(false);
        let start = [0.0; NUM_AXES];
        let mut target = [0.0; NUM_AXES];
        target[2] = -0.01;
        assert_eq!(
            validate(start, target, &IoRole::Probe, &switches),
            Err(GeometricError::InvalidProbeDestination)
        );
    }

    #[test]
    fn rejects_motion_on_abc_axes() {
        let switches = probe_switches(false);
        let start = [0.0; NUM_AXES];
        let mut target = [0.0; NUM_AXES];
        target[2] = -10.0;
        target[3] = 5.0;
        assert_eq!(
            validate(start, target, &IoRole::Probe, &switches),
            Err(GeometricError::InvalidProbeDestination)
        );
    }

    #[test]
    fn accepts_a_valid_straight_probe() {
        let switches = probe_switches(false);
        let start = [0.0; NUM_AXES];
        let mut target = [0.0; NUM_AXES];
        target[2] = -10.0;
        assert!(validate(start, target, &IoRole::Probe, &switches).is_ok());
    }

    #[test]
    fn finish_reads_switch_state() {
        let triggered = probe_switches(true);
        let position = [1.0; NUM_AXES];
        assert_eq!(
            finish(position, &IoRole::Probe, &triggered),
            ProbeOutcome::Succeeded { position }
        );

        let untriggered = probe_switches(false);
        assert_eq!(finish(position, &IoRole::Probe, &untriggered), ProbeOutcome::Failed);
    }
}
