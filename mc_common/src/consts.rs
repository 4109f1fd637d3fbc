//! System-wide constants for the motion core.
//!
//! Single source of truth for axis/motor limits, unit conversions, and
//! motion-planning tunables. Imported by all three crates.

/// Number of supported axes: X, Y, Z, A, B, C.
pub const NUM_AXES: usize = 6;

/// Letters for the six supported axes, in index order.
pub const AXIS_LETTERS: [char; NUM_AXES] = ['X', 'Y', 'Z', 'A', 'B', 'C'];

/// Number of linear axes (X, Y, Z) — used to decide XYZ-vs-ABC move time.
pub const NUM_LINEAR_AXES: usize = 3;

/// Sentinel travel-limit value: a soft limit set to this disables
/// checking on that bound (§3 Axis).
pub const TRAVEL_LIMIT_DISABLED: f64 = f64::MAX;

/// Jerk is cached internally scaled by this factor (§3 Axis).
pub const JERK_SCALE: f64 = 1_000_000.0;

/// Millimeters per inch, exact (§4.3 unit conversion, §8 round-trip).
pub const MM_PER_INCH: f64 = 25.4;

/// Maximum microstep count a motor may be configured with (§3 Motor).
pub const MAX_MICROSTEPS: u16 = 256;

/// Maximum number of buffers in the planner ring (§3 Planner buffer).
pub const PLANNER_QUEUE_LEN: usize = 48;

/// Nominal segment duration target, matching the original firmware's
/// ~5 ms slices (§2, Executor).
pub const NOMINAL_SEGMENT_TIME_S: f64 = 0.005;

/// Absolute minimum segment duration below which a section is skipped
/// rather than emitted as a degenerate segment (§4.5).
pub const MIN_SEGMENT_TIME_S: f64 = 0.000_75;

/// Margin added to `MIN_SEGMENT_TIME_S` when deciding whether a whole
/// block is a "micro-block" (§4.4 rule 1).
pub const MIN_SEGMENT_TIME_MARGIN_S: f64 = 0.000_1;

/// Minimum body length below which head/tail degenerate to body-only
/// (expressed as a time, converted to length via velocity at use site).
pub const MIN_BODY_TIME_S: f64 = 0.002;

/// Maximum iterations for the asymmetric head/tail rate-limited fit
/// (§4.4 rule 6).
pub const HT_ASYMMETRIC_MAX_ITERS: u32 = 10;

/// Convergence threshold (fractional cruise-velocity change) for the
/// asymmetric head/tail fit (§4.4 rule 6).
pub const HT_ASYMMETRIC_TOLERANCE: f64 = 0.001;

/// Junction is treated as collinear (effectively infinite radius) above
/// this cosine threshold (§4.4 Junction velocity).
pub const COS_STRAIGHT_THRESHOLD: f64 = -0.99;

/// Junction is treated as a full reversal (zero velocity) below this
/// cosine threshold (§4.4 Junction velocity).
pub const COS_REVERSAL_THRESHOLD: f64 = 0.99;

/// Synthetic junction velocity used for the "straight line" case.
pub const JUNCTION_VELOCITY_STRAIGHT: f64 = 1.0e7;

/// Startup delay before a brand-new head buffer is initialized, giving
/// the planner time to fill the queue (§4.5).
pub const BUFFER_STARTUP_DELAY_S: f64 = 0.05;

/// Queue-fill fraction below which the startup delay applies.
pub const BUFFER_STARTUP_FILL_THRESHOLD: f64 = 0.25;

/// Tolerance used when comparing floating point lengths/velocities for
/// "close enough" decisions throughout the planner (§4.4, §8).
pub const EPSILON: f64 = 1.0e-10;

/// Dwell-timer tick period used by `prep_dwell` (§4.6).
pub const DWELL_TICK_S: f64 = 0.001;

/// Base clock frequency the per-motor step timers count at, before
/// prescaling (§4.6 `prep_line`).
pub const STEPPER_TIMER_HZ: f64 = 32_000_000.0;

/// Clock prescalers available to the stepper timer, in the order
/// `prep_line` tries them (smallest first, so the period is as fine
/// grained as possible while still fitting 16 bits).
pub const STEPPER_PRESCALERS: [u32; 5] = [1, 2, 4, 8, 64];

/// Largest period a 16-bit stepper timer register can hold.
pub const STEPPER_MAX_PERIOD_TICKS: u32 = u16::MAX as u32;

/// Centripetal acceleration budget used by the junction-velocity
/// formula (§4.4); not per-axis, a single system-wide tuning constant.
pub const JUNCTION_ACCELERATION: f64 = 100_000.0;

/// Length tolerance for recognising a feedhold deceleration that fits
/// the remaining move almost exactly (§4.5 `plan_hold` case 1).
pub const HOLD_DECELERATION_TOLERANCE: f64 = 0.01;

/// Default chordal tolerance an arc is subdivided to when no
/// tighter value has been configured (§4 Arc generator), in mm.
pub const DEFAULT_ARC_CHORDAL_TOLERANCE: f64 = 0.01;

/// Minimum XYZ travel a probe move must cover, below which the
/// destination is rejected as too close to the current position
/// (§4.7 Probe cycle).
pub const MINIMUM_PROBE_TRAVEL: f64 = 0.254;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert_eq!(AXIS_LETTERS.len(), NUM_AXES);
        assert!(NUM_LINEAR_AXES <= NUM_AXES);
        assert!(MIN_SEGMENT_TIME_S < NOMINAL_SEGMENT_TIME_S);
        assert!(COS_STRAIGHT_THRESHOLD < 0.0);
        assert!(COS_REVERSAL_THRESHOLD > 0.0);
    }

    #[test]
    fn mm_per_inch_is_exact() {
        assert_eq!(MM_PER_INCH, 25.4);
    }
}
