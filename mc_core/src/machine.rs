//! Machine model singleton (§3 Machine singleton, §4.3).
//!
//! Grounded on `evo_control_unit/src/state/machine.rs`'s
//! singleton-with-explicit-state-struct shape (no file-scope globals,
//! per this spec's own §9 design note) and on
//! `original_source/src/canonical_machine.c` for the exact target-
//! resolution and program-end reset semantics.

use mc_common::consts::NUM_AXES;
use mc_common::units::{radius_mode_to_degrees, Units};

use crate::axis::{Axis, AxisMode};
use crate::error::GeometricError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Xy,
    Xz,
    Yz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMode {
    Absolute,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    UnitsPerMinute,
    InverseTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathControl {
    ExactPath,
    ExactStop,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionMode {
    Rapid,
    Feed,
    ArcCw,
    ArcCcw,
    Cancel,
    Probe,
}

/// One G-code state record (§3), rebuilt incrementally as blocks parse.
#[derive(Debug, Clone)]
pub struct GCodeState {
    pub line_number: u32,
    pub tool: u32,
    pub feed_rate: f64,
    pub feed_mode: FeedMode,
    pub feed_override_factor: f64,
    pub feed_override_enabled: bool,
    pub spindle_speed: f64,
    pub spindle_override_factor: f64,
    pub spindle_override_enabled: bool,
    /// `None` = off (M5); `Some(true)` = clockwise (M3); `Some(false)` = counterclockwise (M4).
    pub spindle_cw: Option<bool>,
    pub motion_mode: MotionMode,
    pub plane: Plane,
    pub units: Units,
    /// 0 = G54, .. 5 = G59.
    pub coord_system: usize,
    /// One-shot G53 flag: forces the next motion into machine coordinates.
    pub absolute_override: bool,
    pub path_control: PathControl,
    pub distance_mode: DistanceMode,
    pub arc_distance_mode: DistanceMode,
    pub coolant_mist: bool,
    pub coolant_flood: bool,
    /// Last commanded target, absolute mm, persists across blocks.
    pub target: [f64; NUM_AXES],
    pub arc_offset: [f64; 3],
    pub arc_radius: Option<f64>,
}

impl Default for GCodeState {
    fn default() -> Self {
        Self {
            line_number: 0,
            tool: 0,
            feed_rate: 0.0,
            feed_mode: FeedMode::UnitsPerMinute,
            feed_override_factor: 1.0,
            feed_override_enabled: true,
            spindle_speed: 0.0,
            spindle_override_factor: 1.0,
            spindle_override_enabled: true,
            spindle_cw: None,
            motion_mode: MotionMode::Cancel,
            plane: Plane::Xy,
            units: Units::Mm,
            coord_system: 0,
            absolute_override: false,
            path_control: PathControl::ExactPath,
            distance_mode: DistanceMode::Absolute,
            arc_distance_mode: DistanceMode::Absolute,
            coolant_mist: false,
            coolant_flood: false,
            target: [0.0; NUM_AXES],
            arc_offset: [0.0; 3],
            arc_radius: None,
        }
    }
}

/// Number of predefined coordinate systems (G54..G59, §3: "6 predefined").
const NUM_COORD_SYSTEMS: usize = 6;

/// The machine singleton (§3, §9): one instance, initialised once at
/// boot, reset at `program_end`. Owns no planner/executor state —
/// those live below it in the dependency order (§2) and are driven by
/// the parser, which calls both.
#[derive(Debug, Clone)]
pub struct Machine {
    pub gcode: GCodeState,
    /// Per-coord-system offset table (§3: "7 × 6 floats" — one row per
    /// system, one column per axis; only the 6 predefined systems are
    /// addressable here, matching this spec's Non-goal on persistence
    /// beyond them).
    offsets: [[f64; NUM_AXES]; NUM_COORD_SYSTEMS],
    g92_offset: [f64; NUM_AXES],
    g92_enabled: bool,
    position: [f64; NUM_AXES],
    g28_position: [f64; NUM_AXES],
    g30_position: [f64; NUM_AXES],
    last_pushed_work_offset: [f64; NUM_AXES],
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            gcode: GCodeState::default(),
            offsets: [[0.0; NUM_AXES]; NUM_COORD_SYSTEMS],
            g92_offset: [0.0; NUM_AXES],
            g92_enabled: false,
            position: [0.0; NUM_AXES],
            g28_position: [0.0; NUM_AXES],
            g30_position: [0.0; NUM_AXES],
            last_pushed_work_offset: [0.0; NUM_AXES],
        }
    }

    #[inline]
    pub fn position(&self) -> [f64; NUM_AXES] {
        self.position
    }

    // ── Simple modal setters (§4.3) ────────────────────────────────

    pub fn set_plane(&mut self, plane: Plane) {
        self.gcode.plane = plane;
    }

    pub fn set_units(&mut self, units: Units) {
        self.gcode.units = units;
    }

    pub fn set_distance_mode(&mut self, mode: DistanceMode) {
        self.gcode.distance_mode = mode;
    }

    pub fn set_arc_distance_mode(&mut self, mode: DistanceMode) {
        self.gcode.arc_distance_mode = mode;
    }

    pub fn set_feed_rate(&mut self, rate: f64) {
        self.gcode.feed_rate = rate;
    }

    pub fn set_feed_mode(&mut self, mode: FeedMode) {
        self.gcode.feed_mode = mode;
    }

    pub fn set_path_mode(&mut self, mode: PathControl) {
        self.gcode.path_control = mode;
    }

    /// G53: the *next* motion word only is resolved in machine
    /// coordinates (one-shot).
    pub fn set_absolute_override(&mut self, one_shot: bool) {
        self.gcode.absolute_override = one_shot;
    }

    /// Clears the G53 one-shot flag once the motion it applied to has
    /// been dispatched.
    pub fn clear_absolute_override(&mut self) {
        self.gcode.absolute_override = false;
    }

    pub fn set_feed_override_enabled(&mut self, enabled: bool) {
        self.gcode.feed_override_enabled = enabled;
    }

    pub fn set_spindle_override_enabled(&mut self, enabled: bool) {
        self.gcode.spindle_override_enabled = enabled;
    }

    /// Resolved feed rate, honouring the live override when enabled
    /// (§15: `M48`/`M49` toggle whether the override is applied).
    pub fn effective_feed_rate(&self) -> f64 {
        if self.gcode.feed_override_enabled {
            self.gcode.feed_rate * self.gcode.feed_override_factor
        } else {
            self.gcode.feed_rate
        }
    }

    // ── Coordinate system & offsets (§4.3, §15) ────────────────────

    pub fn set_coord_system(&mut self, system: usize) {
        debug_assert!(system < NUM_COORD_SYSTEMS);
        self.gcode.coord_system = system.min(NUM_COORD_SYSTEMS - 1);
    }

    /// `G10 L2 Pn`: axis words present overwrite that axis's stored
    /// offset for system `sys`; axis words absent leave the existing
    /// offset untouched (§15).
    pub fn set_coord_offsets(&mut self, sys: usize, offsets: &[Option<f64>; NUM_AXES]) {
        if sys >= NUM_COORD_SYSTEMS {
            return;
        }
        for (axis, value) in offsets.iter().enumerate() {
            if let Some(v) = value {
                self.offsets[sys][axis] = *v;
            }
        }
    }

    pub fn set_origin_offsets(&mut self, offsets: [f64; NUM_AXES]) {
        self.g92_offset = offsets;
        self.g92_enabled = true;
    }

    /// `G92`: make the current physical position read as the commanded
    /// value on every axis word present, without moving anything. Axes
    /// with no word on this block keep their existing G92 offset.
    pub fn set_origin_offsets_for_current_position(
        &mut self,
        axes: &[Axis],
        raw: &[Option<f64>; NUM_AXES],
    ) {
        for axis_idx in 0..NUM_AXES {
            let Some(value) = raw[axis_idx] else {
                continue;
            };
            let mut mm = self.gcode.units.to_mm(value);
            if let Some(axis) = axes.get(axis_idx) {
                if matches!(axis.mode, AxisMode::Radius) && axis.rotary_radius > 0.0 {
                    mm = radius_mode_to_degrees(mm, axis.rotary_radius);
                }
            }
            let coord_offset = self.offsets[self.gcode.coord_system][axis_idx];
            self.g92_offset[axis_idx] = self.position[axis_idx] - coord_offset - mm;
        }
        self.g92_enabled = true;
    }

    pub fn reset_origin_offsets(&mut self) {
        self.g92_offset = [0.0; NUM_AXES];
        self.g92_enabled = false;
    }

    pub fn suspend_origin_offsets(&mut self) {
        self.g92_enabled = false;
    }

    pub fn resume_origin_offsets(&mut self) {
        self.g92_enabled = true;
    }

    pub fn set_g28_position(&mut self) {
        self.g28_position = self.position;
    }

    pub fn set_g30_position(&mut self) {
        self.g30_position = self.position;
    }

    pub fn g28_position(&self) -> [f64; NUM_AXES] {
        self.g28_position
    }

    pub fn g30_position(&self) -> [f64; NUM_AXES] {
        self.g30_position
    }

    /// `G28.3`: sets the current position directly as the absolute
    /// origin for every commanded axis, with no motion.
    pub fn set_absolute_origin(&mut self, target: [f64; NUM_AXES]) {
        self.position = target;
        self.gcode.target = target;
    }

    fn axis_offset(&self, axis: usize) -> f64 {
        let coord = if self.gcode.absolute_override {
            0.0
        } else {
            self.offsets[self.gcode.coord_system][axis]
        };
        let g92 = if self.g92_enabled {
            self.g92_offset[axis]
        } else {
            0.0
        };
        coord + g92
    }

    /// Resolved per-axis work offset, for the runtime to compare
    /// against its last-applied vector (§4.3 work-offset sync).
    pub fn resolved_work_offset(&self) -> [f64; NUM_AXES] {
        std::array::from_fn(|a| self.axis_offset(a))
    }

    /// Returns `Some(offsets)` exactly when the resolved work-offset
    /// vector has changed since the last time this was called with a
    /// `Some` result — the caller is expected to enqueue a zero-motion
    /// "update work offsets" command in that case (§4.3).
    pub fn poll_work_offset_update(&mut self) -> Option<[f64; NUM_AXES]> {
        let current = self.resolved_work_offset();
        if current != self.last_pushed_work_offset {
            self.last_pushed_work_offset = current;
            Some(current)
        } else {
            None
        }
    }

    // ── Target resolution (§4.3) ───────────────────────────────────

    /// `calc_model_target`: unit conversion, absolute/incremental
    /// composition, coord-system + G92 offset composition, and
    /// radius-mode rewriting for rotary axes (§4.3).
    pub fn calc_model_target(
        &self,
        axes: &[Axis],
        raw: &[Option<f64>; NUM_AXES],
    ) -> [f64; NUM_AXES] {
        let mut target = self.gcode.target;
        for axis_idx in 0..NUM_AXES {
            let Some(value) = raw[axis_idx] else {
                continue;
            };
            let mut mm = self.gcode.units.to_mm(value);
            if let Some(axis) = axes.get(axis_idx) {
                if matches!(axis.mode, AxisMode::Radius) && axis.rotary_radius > 0.0 {
                    mm = radius_mode_to_degrees(mm, axis.rotary_radius);
                }
            }
            target[axis_idx] = if self.gcode.distance_mode == DistanceMode::Incremental {
                self.gcode.target[axis_idx] + mm
            } else {
                mm + self.axis_offset(axis_idx)
            };
        }
        target
    }

    /// §4.3 soft-limit test: reject a target that would drive any
    /// homed axis with a real travel window outside its bounds.
    pub fn check_soft_limits(
        &self,
        axes: &[Axis],
        target: &[f64; NUM_AXES],
    ) -> Result<(), GeometricError> {
        for (axis_idx, axis) in axes.iter().enumerate() {
            if !axis.within_soft_limits(target[axis_idx]) {
                return Err(GeometricError::SoftLimitExceeded { axis: axis_idx });
            }
        }
        Ok(())
    }

    /// Commits a resolved target as the model's new position (called
    /// by the parser once a move has been accepted into the planner).
    /// This is the model's *planned* position, not a readback of
    /// physical motion — consistent with the pipelined queue (§5).
    pub fn commit_target(&mut self, target: [f64; NUM_AXES]) {
        self.gcode.target = target;
        self.position = target;
        self.gcode.absolute_override = false;
    }

    /// Re-seeds the model position from the runtime's encoder-derived
    /// position, used by the flush path (§4.8) and jog exit (§4.7).
    pub fn sync_position(&mut self, position: [f64; NUM_AXES]) {
        self.position = position;
        self.gcode.target = position;
    }

    /// `program_end` (§4.3): resets origin offsets, default coord
    /// system, default plane, absolute distance mode, units-per-minute
    /// feed mode, spindle off, coolant off, motion mode cancelled.
    pub fn program_end(&mut self) {
        self.reset_origin_offsets();
        self.gcode.coord_system = 0;
        self.gcode.plane = Plane::Xy;
        self.gcode.distance_mode = DistanceMode::Absolute;
        self.gcode.feed_mode = FeedMode::UnitsPerMinute;
        self.gcode.spindle_speed = 0.0;
        self.gcode.spindle_cw = None;
        self.gcode.coolant_mist = false;
        self.gcode.coolant_flood = false;
        self.gcode.motion_mode = MotionMode::Cancel;
    }
}
