//! Block collection and dispatch (§4.1, §4.3).
//!
//! Grounded on `original_source/src/gcode_parser.c`'s two-pass shape:
//! `_parse_gcode_block` collects words into a block without touching
//! machine state, `_execute_gcode_block` applies them in a fixed
//! order. [`parse_words`]/[`check_modal_conflicts`] are the first pass,
//! [`Parser::execute_block`] the second — the original's `gn`/`gf`
//! value/flag pair collapses to a single `Option` per field here.

use std::collections::HashSet;

use mc_common::consts::{AXIS_LETTERS, DEFAULT_ARC_CHORDAL_TOLERANCE, NUM_AXES};
use mc_common::units::Units;

use crate::arc::{generate_arc, offset_from_radius, ArcDirection};
use crate::axis::Axis;
use crate::error::{BlockError, InputError};
use crate::gcode::expr;
use crate::gcode::lexer::{self, RawWord, WordValue};
use crate::machine::{DistanceMode, FeedMode, Machine, MotionMode, PathControl, Plane};
use crate::planner::{MoveTimeMode, Planner};

/// One of the modal groups checked for a same-block conflict (§4.1).
/// Non-modal one-shot codes (G4, G10, G28.x, G30.x, G53, G92.x, G80,
/// most M-codes) aren't grouped: the original doesn't group them
/// either, and none of them can meaningfully repeat in one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ModalGroup {
    Motion,
    Plane,
    Units,
    Distance,
    ArcDistance,
    FeedMode,
    CoordSystem,
    PathControl,
    Stopping,
    Spindle,
}

fn modal_group_of_gcode(key: (u32, u32)) -> Option<ModalGroup> {
    match key {
        (0, 0) | (1, 0) | (2, 0) | (3, 0) | (38, 2) => Some(ModalGroup::Motion),
        (17, 0) | (18, 0) | (19, 0) => Some(ModalGroup::Plane),
        (20, 0) | (21, 0) => Some(ModalGroup::Units),
        (90, 0) | (91, 0) => Some(ModalGroup::Distance),
        (90, 1) | (91, 1) => Some(ModalGroup::ArcDistance),
        (93, 0) | (94, 0) => Some(ModalGroup::FeedMode),
        (54, 0) | (55, 0) | (56, 0) | (57, 0) | (58, 0) | (59, 0) => Some(ModalGroup::CoordSystem),
        (61, 0) | (61, 1) | (64, 0) => Some(ModalGroup::PathControl),
        _ => None,
    }
}

fn modal_group_of_mcode(key: (u32, u32)) -> Option<ModalGroup> {
    match key {
        (0, 0) | (1, 0) | (2, 0) | (30, 0) | (60, 0) => Some(ModalGroup::Stopping),
        (3, 0) | (4, 0) | (5, 0) => Some(ModalGroup::Spindle),
        _ => None,
    }
}

/// Splits a value like `61.1` into `(61, 1)`, the way the original
/// switches on the integer part and then on `_point(value)`.
fn gcode_key(value: f64) -> (u32, u32) {
    let major = value.trunc().max(0.0) as u32;
    let minor = ((value - value.trunc()).abs() * 10.0).round() as u32;
    (major, minor)
}

fn resolve(word: &RawWord) -> Result<f64, InputError> {
    match &word.value {
        WordValue::Number(n) => Ok(*n),
        WordValue::Expr(text) => Ok(expr::evaluate(text)?),
    }
}

/// One collected block, ready for dispatch (§4.1).
#[derive(Debug, Default, Clone)]
pub struct Block {
    pub line_number: Option<u32>,
    pub axis_words: [Option<f64>; NUM_AXES],
    pub arc_offset: [Option<f64>; 3],
    pub radius: Option<f64>,
    pub feed_rate: Option<f64>,
    pub spindle_speed: Option<f64>,
    pub tool: Option<u32>,
    /// Reused for dwell seconds (G4) and the G10 coordinate-system
    /// select, exactly as the original overloads its `parameter` field.
    pub p_param: Option<f64>,
    pub gcodes: Vec<(u32, u32)>,
    pub mcodes: Vec<(u32, u32)>,
}

/// Collect tokenized words into a [`Block`], evaluating any bracketed
/// expressions along the way (§4.2). No machine state is touched here.
pub fn parse_words(words: &[RawWord]) -> Result<Block, InputError> {
    let mut block = Block::default();
    for word in words {
        let value = resolve(word)?;
        match word.letter {
            'G' => block.gcodes.push(gcode_key(value)),
            'M' => block.mcodes.push(gcode_key(value)),
            'N' => block.line_number = Some(value.max(0.0) as u32),
            'F' => block.feed_rate = Some(value),
            'S' => block.spindle_speed = Some(value),
            'T' => block.tool = Some(value.max(0.0) as u32),
            'P' => block.p_param = Some(value),
            'I' => block.arc_offset[0] = Some(value),
            'J' => block.arc_offset[1] = Some(value),
            'K' => block.arc_offset[2] = Some(value),
            'R' => block.radius = Some(value),
            'L' => {} // not used for anything (matches original)
            letter => {
                if let Some(axis) = AXIS_LETTERS.iter().position(|&l| l == letter) {
                    block.axis_words[axis] = Some(value);
                } else {
                    return Err(InputError::MalformedCommand);
                }
            }
        }
    }
    Ok(block)
}

/// Reject a block where two codes from the same modal group appear
/// together (§4.1).
pub fn check_modal_conflicts(block: &Block) -> Result<(), InputError> {
    let mut seen = HashSet::new();
    for &key in &block.gcodes {
        if let Some(group) = modal_group_of_gcode(key) {
            if !seen.insert(group) {
                return Err(InputError::ModalGroupConflict);
            }
        }
    }
    let mut seen_m = HashSet::new();
    for &key in &block.mcodes {
        if let Some(group) = modal_group_of_mcode(key) {
            if !seen_m.insert(group) {
                return Err(InputError::ModalGroupConflict);
            }
        }
    }
    Ok(())
}

/// What the block asked the program flow to do (§4.1 M0/M1/M2/M30/M60).
/// The parser only reports the request; the caller (the run loop)
/// decides how to actually pause/halt execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramControl {
    #[default]
    None,
    Stop,
    OptionalStop,
    PalletChangeStop,
    End,
}

fn axis_words_present(block: &Block) -> bool {
    block.axis_words.iter().any(Option::is_some)
}

/// Drives one [`Machine`] across a stream of blocks (§4.1, §4.3). Holds
/// no planner/executor state of its own — those are passed in by the
/// caller, per this spec's dependency order (§2).
pub struct Parser {
    pub machine: Machine,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self { machine: Machine::new() }
    }

    /// Normalize, tokenize, parse and dispatch one line of text (§4.1).
    /// Returns any `MSG,...` comment text found on the line.
    pub fn execute_line(
        &mut self,
        line: &str,
        axes: &[Axis],
        planner: &mut Planner,
        now: f64,
    ) -> Result<(Option<String>, ProgramControl), BlockError> {
        let normalized = lexer::normalize(line);
        if normalized.block_delete {
            return Ok((None, ProgramControl::None));
        }
        let words = lexer::tokenize_words(&normalized.text)?;
        let block = parse_words(&words)?;
        check_modal_conflicts(&block)?;
        let control = self.execute_block(&block, axes, planner, now)?;
        Ok((normalized.message, control))
    }

    /// `_execute_gcode_block`'s fixed dispatch order: line number, feed
    /// mode/rate/overrides, tool, spindle, coolant, override enables,
    /// dwell, plane, units, coord system, path control, distance mode,
    /// then the one-shot/motion action, finally program stops.
    fn execute_block(
        &mut self,
        block: &Block,
        axes: &[Axis],
        planner: &mut Planner,
        now: f64,
    ) -> Result<ProgramControl, BlockError> {
        if let Some(n) = block.line_number {
            self.machine.gcode.line_number = n;
        }

        for &key in &block.gcodes {
            match key {
                (93, 0) => self.machine.set_feed_mode(FeedMode::InverseTime),
                (94, 0) => self.machine.set_feed_mode(FeedMode::UnitsPerMinute),
                _ => {}
            }
        }
        if let Some(f) = block.feed_rate {
            self.machine.set_feed_rate(f);
        }
        if let Some(t) = block.tool {
            self.machine.gcode.tool = t;
        }
        if let Some(s) = block.spindle_speed {
            self.machine.gcode.spindle_speed = s;
        }
        for &key in &block.mcodes {
            match key {
                (3, 0) => self.machine.gcode.spindle_cw = Some(true),
                (4, 0) => self.machine.gcode.spindle_cw = Some(false),
                (5, 0) => self.machine.gcode.spindle_cw = None,
                (7, 0) => self.machine.gcode.coolant_mist = true,
                (8, 0) => self.machine.gcode.coolant_flood = true,
                (9, 0) => self.machine.gcode.coolant_flood = false,
                (48, 0) => {
                    self.machine.set_feed_override_enabled(true);
                    self.machine.set_spindle_override_enabled(true);
                }
                (49, 0) => {
                    self.machine.set_feed_override_enabled(false);
                    self.machine.set_spindle_override_enabled(false);
                }
                (50, 0) => self.machine.set_feed_override_enabled(true),
                (51, 0) => self.machine.set_spindle_override_enabled(true),
                _ => {}
            }
        }

        // G4 - dwell (checked before the modal plane/units/etc. setters,
        // as in the original, though it makes no practical difference
        // since dwell reads no modal state set below).
        if block.gcodes.contains(&(4, 0)) {
            let seconds = block.p_param.unwrap_or(0.0);
            planner.dwell(seconds, self.machine.gcode.line_number, now)?;
        }

        for &key in &block.gcodes {
            match key {
                (17, 0) => self.machine.set_plane(Plane::Xy),
                (18, 0) => self.machine.set_plane(Plane::Xz),
                (19, 0) => self.machine.set_plane(Plane::Yz),
                (20, 0) => self.machine.set_units(Units::Inch),
                (21, 0) => self.machine.set_units(Units::Mm),
                (54, 0) => self.machine.set_coord_system(0),
                (55, 0) => self.machine.set_coord_system(1),
                (56, 0) => self.machine.set_coord_system(2),
                (57, 0) => self.machine.set_coord_system(3),
                (58, 0) => self.machine.set_coord_system(4),
                (59, 0) => self.machine.set_coord_system(5),
                (61, 0) => self.machine.set_path_mode(PathControl::ExactPath),
                (61, 1) => self.machine.set_path_mode(PathControl::ExactStop),
                (64, 0) => self.machine.set_path_mode(PathControl::Continuous),
                (90, 0) => self.machine.set_distance_mode(DistanceMode::Absolute),
                (91, 0) => self.machine.set_distance_mode(DistanceMode::Incremental),
                (90, 1) => self.machine.set_arc_distance_mode(DistanceMode::Absolute),
                (91, 1) => self.machine.set_arc_distance_mode(DistanceMode::Incremental),
                _ => {}
            }
        }

        // Homing/go-home/set-home (§4.1 execution order: right after
        // distance mode, before G10/G92).
        for &key in &block.gcodes {
            match key {
                (28, 0) => {
                    let stored = self.machine.g28_position();
                    self.goto_stored_position(stored, block, axes, planner, now)?;
                }
                (30, 0) => {
                    let stored = self.machine.g30_position();
                    self.goto_stored_position(stored, block, axes, planner, now)?;
                }
                _ => {}
            }
        }

        // One-shot actions (§4.3): G10/G28.1/G30.1/G92.x don't command
        // motion, they only rewrite the machine model.
        for &key in &block.gcodes {
            match key {
                (10, 0) => {
                    let sys = block.p_param.map(|p| (p as usize).saturating_sub(1)).unwrap_or(self.machine.gcode.coord_system);
                    self.machine.set_coord_offsets(sys, &block.axis_words);
                }
                (28, 1) => self.machine.set_g28_position(),
                (30, 1) => self.machine.set_g30_position(),
                (28, 3) => {
                    let target = self.machine.calc_model_target(axes, &block.axis_words);
                    self.machine.set_absolute_origin(target);
                }
                (92, 0) => {
                    self.machine.set_origin_offsets_for_current_position(axes, &block.axis_words);
                }
                (92, 1) => self.machine.reset_origin_offsets(),
                (92, 2) => self.machine.suspend_origin_offsets(),
                (92, 3) => self.machine.resume_origin_offsets(),
                (53, 0) => self.machine.set_absolute_override(true),
                _ => {}
            }
        }

        // Motion dispatch (§4.1 Motion modal group, §4.4/§4 Arc generator).
        // Axis words are shared between the motion group and the
        // non-modal group (G10/G28/G28.1/G92): when both appear in one
        // block the non-modal member wins for this block (§4.1).
        let non_modal_axis_word_owner = block
            .gcodes
            .iter()
            .any(|&k| matches!(k, (10, 0) | (28, 0) | (28, 1) | (92, 0)));
        if !non_modal_axis_word_owner {
            for &key in &block.gcodes {
                match key {
                    (0, 0) => self.dispatch_motion(MotionMode::Rapid, block, axes, planner, now)?,
                    (1, 0) => self.dispatch_motion(MotionMode::Feed, block, axes, planner, now)?,
                    (2, 0) => self.dispatch_motion(MotionMode::ArcCw, block, axes, planner, now)?,
                    (3, 0) => self.dispatch_motion(MotionMode::ArcCcw, block, axes, planner, now)?,
                    (38, 2) => self.dispatch_motion(MotionMode::Probe, block, axes, planner, now)?,
                    (80, 0) => self.machine.gcode.motion_mode = MotionMode::Cancel,
                    _ => {}
                }
            }
        }
        self.machine.clear_absolute_override();

        let mut control = ProgramControl::None;
        for &key in &block.mcodes {
            match key {
                (0, 0) => control = ProgramControl::Stop,
                (1, 0) => control = ProgramControl::OptionalStop,
                (60, 0) => control = ProgramControl::PalletChangeStop,
                (2, 0) | (30, 0) => {
                    self.machine.program_end();
                    control = ProgramControl::End;
                }
                _ => {}
            }
        }

        Ok(control)
    }

    /// `G28`/`G30`: rapid to `stored` (the previously recorded G28/G30
    /// position), via an optional intermediate point if axis words are
    /// present on this block (§4.1).
    fn goto_stored_position(
        &mut self,
        stored: [f64; NUM_AXES],
        block: &Block,
        axes: &[Axis],
        planner: &mut Planner,
        now: f64,
    ) -> Result<(), BlockError> {
        let line = self.machine.gcode.line_number;
        if axis_words_present(block) {
            let intermediate = self.machine.calc_model_target(axes, &block.axis_words);
            self.machine.check_soft_limits(axes, &intermediate)?;
            planner.aline(axes, self.machine.position(), intermediate, 0.0, MoveTimeMode::Rapid, false, line, now)?;
            self.machine.commit_target(intermediate);
        }
        self.machine.check_soft_limits(axes, &stored)?;
        planner.aline(axes, self.machine.position(), stored, 0.0, MoveTimeMode::Rapid, false, line, now)?;
        self.machine.commit_target(stored);
        Ok(())
    }

    fn dispatch_motion(
        &mut self,
        mode: MotionMode,
        block: &Block,
        axes: &[Axis],
        planner: &mut Planner,
        now: f64,
    ) -> Result<(), BlockError> {
        self.machine.gcode.motion_mode = mode;

        if mode == MotionMode::Probe && !axis_words_present(block) {
            return Err(InputError::ProbeAxisMissing.into());
        }

        let from = self.machine.position();
        let target = self.machine.calc_model_target(axes, &block.axis_words);
        self.machine.check_soft_limits(axes, &target)?;

        let feed_mode = match self.machine.gcode.feed_mode {
            FeedMode::UnitsPerMinute => MoveTimeMode::UnitsPerMinute,
            FeedMode::InverseTime => MoveTimeMode::InverseTime,
        };
        let (move_mode, feed) = match mode {
            MotionMode::Rapid => (MoveTimeMode::Rapid, 0.0),
            _ => (feed_mode, self.machine.effective_feed_rate()),
        };
        if mode != MotionMode::Rapid && feed <= 0.0 {
            return Err(InputError::FeedRateNotSpecified.into());
        }
        let exact_stop = self.machine.gcode.path_control == PathControl::ExactStop;
        let line = self.machine.gcode.line_number;

        match mode {
            MotionMode::ArcCw | MotionMode::ArcCcw => {
                let direction = if mode == MotionMode::ArcCw {
                    ArcDirection::Clockwise
                } else {
                    ArcDirection::CounterClockwise
                };
                let offset = match block.radius {
                    Some(radius) => {
                        let radius_mm = self.machine.gcode.units.to_mm(radius);
                        offset_from_radius(self.machine.gcode.plane, from, target, radius_mm, direction)?
                    }
                    None => [
                        self.machine.gcode.units.to_mm(block.arc_offset[0].unwrap_or(0.0)),
                        self.machine.gcode.units.to_mm(block.arc_offset[1].unwrap_or(0.0)),
                    ],
                };
                let waypoints = generate_arc(
                    self.machine.gcode.plane,
                    from,
                    target,
                    offset,
                    direction,
                    0,
                    DEFAULT_ARC_CHORDAL_TOLERANCE,
                )?;
                let mut prev = from;
                for waypoint in waypoints {
                    planner.aline(axes, prev, waypoint, feed, move_mode, exact_stop, line, now)?;
                    prev = waypoint;
                }
            }
            _ => {
                planner.aline(axes, from, target, feed, move_mode, exact_stop, line, now)?;
            }
        }

        self.machine.commit_target(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{AxisConfig, HomingMode, HomingParams};

    fn test_axes() -> Vec<Axis> {
        let config = AxisConfig {
            mode: crate::axis::AxisMode::Standard,
            max_velocity: 1000.0,
            jerk: 500_000.0,
            junction_deviation: 0.01,
            travel_min: -100.0,
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
        (0..NUM_AXES).map(|_| Axis::try_from(config.clone()).unwrap()).collect()
    }

    #[test]
    fn modal_group_conflict_is_rejected() {
        let words = lexer::tokenize_words("G0G1X1").unwrap();
        let block = parse_words(&words).unwrap();
        assert_eq!(check_modal_conflicts(&block), Err(InputError::ModalGroupConflict));
    }

    #[test]
    fn non_modal_codes_can_repeat_with_motion() {
        let words = lexer::tokenize_words("G90G54X1").unwrap();
        let block = parse_words(&words).unwrap();
        assert!(check_modal_conflicts(&block).is_ok());
    }

    #[test]
    fn rapid_move_updates_position_and_queues_a_block() {
        let axes = test_axes();
        let mut parser = Parser::new();
        let mut planner = Planner::new();
        let (_, control) = parser.execute_line("G0X10Y5", &axes, &mut planner, 0.0).unwrap();
        assert_eq!(control, ProgramControl::None);
        assert_eq!(planner.len(), 1);
        assert_eq!(parser.machine.position()[0], 10.0);
        assert_eq!(parser.machine.position()[1], 5.0);
    }

    #[test]
    fn feed_move_without_feed_rate_is_rejected() {
        let axes = test_axes();
        let mut parser = Parser::new();
        let mut planner = Planner::new();
        let err = parser.execute_line("G1X10", &axes, &mut planner, 0.0).unwrap_err();
        assert_eq!(err, BlockError::Input(InputError::FeedRateNotSpecified));
    }

    #[test]
    fn arc_move_queues_multiple_sub_blocks() {
        let axes = test_axes();
        let mut parser = Parser::new();
        let mut planner = Planner::new();
        parser.execute_line("G17G90F300", &axes, &mut planner, 0.0).unwrap();
        parser.execute_line("G2X10Y0I5J0", &axes, &mut planner, 0.0).unwrap();
        assert!(planner.len() > 1);
    }

    #[test]
    fn radius_format_arc_queues_multiple_sub_blocks() {
        let axes = test_axes();
        let mut parser = Parser::new();
        let mut planner = Planner::new();
        parser.execute_line("G17G90F300", &axes, &mut planner, 0.0).unwrap();
        parser.execute_line("G2X10Y0R5", &axes, &mut planner, 0.0).unwrap();
        assert!(planner.len() > 1);
    }

    #[test]
    fn program_end_resets_modal_state_and_signals_end() {
        let axes = test_axes();
        let mut parser = Parser::new();
        let mut planner = Planner::new();
        parser.execute_line("G91", &axes, &mut planner, 0.0).unwrap();
        let (_, control) = parser.execute_line("M2", &axes, &mut planner, 0.0).unwrap();
        assert_eq!(control, ProgramControl::End);
        assert_eq!(parser.machine.gcode.distance_mode, DistanceMode::Absolute);
    }

    #[test]
    fn g92_makes_current_position_read_as_commanded_value() {
        let axes = test_axes();
        let mut parser = Parser::new();
        let mut planner = Planner::new();
        parser.execute_line("G0X10", &axes, &mut planner, 0.0).unwrap();
        parser.execute_line("G92X0", &axes, &mut planner, 0.0).unwrap();

        // Raw machine position is untouched; the work offset absorbs
        // the difference so the work coordinate reads 0 at X10.
        assert_eq!(parser.machine.position()[0], 10.0);
        assert_eq!(parser.machine.position()[0] - parser.machine.resolved_work_offset()[0], 0.0);

        parser.execute_line("G92.1", &axes, &mut planner, 0.0).unwrap();
        assert_eq!(parser.machine.resolved_work_offset()[0], 0.0);
    }
}
