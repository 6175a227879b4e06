//! Trial State Machine
//!
//! A reach runs through three sub-steps, strictly in order:
//!
//! ```text
//! HomeAcquire ──(pointer within radius of home)──▶ TargetReach
//! TargetReach ──(pointer within radius of target)──▶ HomeReturn
//! HomeReturn ──(pointer within radius of home)──▶ trial complete
//! ```
//!
//! [`TrialRun::tick`] is called once per display refresh. Within a tick the
//! step and feedback pose are derived first, then the frame is logged; the
//! caller applies [`TrialRun::presentation`] to its markers afterwards.
//! Several transitions may happen in the same tick, but never backwards.

use super::feedback::{feedback_cursor, FeedbackCursor, FeedbackParams};
use super::geometry::{Point, Workspace};
use super::input::{FrameInput, KeyPress};
use super::trajectory::{TrajectoryLog, TrajectorySample};
use crate::schedule::Trial;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the pointer is assumed to be before the first sample arrives.
pub const OFFSCREEN: Point = Point::new(1.5, 1.5);

/// Sub-step of a reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStep {
    HomeAcquire,
    TargetReach,
    HomeReturn,
}

impl TrialStep {
    /// 1-based step index written to data files.
    pub const fn index(&self) -> u8 {
        match self {
            TrialStep::HomeAcquire => 1,
            TrialStep::TargetReach => 2,
            TrialStep::HomeReturn => 3,
        }
    }

    pub fn home_visible(&self) -> bool {
        !matches!(self, TrialStep::TargetReach)
    }

    pub fn target_visible(&self) -> bool {
        matches!(self, TrialStep::TargetReach)
    }
}

/// What the frame loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep ticking this trial
    Continue,
    /// Trial finished; hand the result to the sink and move on
    Advance,
    /// Abort the session
    Terminate,
}

/// Visibility and pose of a static marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerPose {
    pub position: Point,
    pub visible: bool,
}

/// Presentation state to apply after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub home: MarkerPose,
    pub target: MarkerPose,
    pub cursor: FeedbackCursor,
}

/// Finalised trial, ready for the data sink.
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub trial: Trial,
    pub log: TrajectoryLog,
    /// Key that ended the trial early, if any
    pub skipped: Option<KeyPress>,
    /// Whether the step sequence (or a skip) completed
    pub completed: bool,
    pub frames: u64,
}

/// Live state of one trial.
#[derive(Debug, Clone)]
pub struct TrialRun {
    trial: Trial,
    workspace: Workspace,
    feedback: FeedbackParams,
    target: Point,
    step: TrialStep,
    home_reached: bool,
    target_reached: bool,
    finished: bool,
    last_pointer: Option<Point>,
    cursor: FeedbackCursor,
    log: TrajectoryLog,
    skipped: Option<KeyPress>,
    frames: u64,
}

impl TrialRun {
    /// Start a trial. A `NaN` target angle leaves the target unreachable, so
    /// such a trial only ends through a skip key or cancellation.
    pub fn new(trial: Trial, workspace: Workspace, feedback: FeedbackParams) -> Self {
        let target = workspace.target_position(trial.target_angle_deg);
        Self {
            trial,
            workspace,
            feedback,
            target,
            step: TrialStep::HomeAcquire,
            home_reached: false,
            target_reached: false,
            finished: false,
            last_pointer: None,
            cursor: FeedbackCursor::offscreen(workspace.cursor_radius),
            // ~4 s at 60 Hz
            log: TrajectoryLog::with_capacity(256),
            skipped: None,
            frames: 0,
        }
    }

    pub fn trial(&self) -> &Trial {
        &self.trial
    }

    pub fn step(&self) -> TrialStep {
        self.step
    }

    pub fn home_reached(&self) -> bool {
        self.home_reached
    }

    pub fn target_reached(&self) -> bool {
        self.target_reached
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn cursor(&self) -> FeedbackCursor {
        self.cursor
    }

    pub fn log(&self) -> &TrajectoryLog {
        &self.log
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Advance by one frame.
    pub fn tick(&mut self, input: &FrameInput) -> TickOutcome {
        if self.finished {
            return TickOutcome::Advance;
        }
        if input.cancel {
            debug!(
                task = self.trial.task_index,
                trial = self.trial.trial_index,
                step = self.step.index(),
                "Trial cancelled"
            );
            return TickOutcome::Terminate;
        }

        // A tick without a fresh sample keeps the previous position.
        let pointer = input.pointer.or(self.last_pointer).unwrap_or(OFFSCREEN);
        self.last_pointer = Some(pointer);
        self.frames += 1;

        let radius = self.workspace.cursor_radius;
        let home_distance = pointer.distance(self.workspace.home);
        let target_distance = pointer.distance(self.target);
        let mut complete = false;

        if !self.home_reached {
            self.step = TrialStep::HomeAcquire;
            if home_distance < radius {
                self.home_reached = true;
                debug!(time = input.time, "Home acquired");
            }
        }
        if self.home_reached && !self.target_reached {
            self.step = TrialStep::TargetReach;
            if target_distance < radius {
                self.target_reached = true;
                debug!(time = input.time, "Target reached");
            }
        }
        if self.target_reached {
            self.step = TrialStep::HomeReturn;
            if home_distance < radius {
                complete = true;
                debug!(time = input.time, "Returned home");
            }
        }

        if let Some(key) = &input.skip {
            debug!(key = %key.name, rt = key.rt, "Trial skipped");
            self.skipped = Some(key.clone());
            complete = true;
        }

        self.cursor = feedback_cursor(
            &self.workspace,
            &self.feedback,
            self.step,
            pointer,
            self.trial.target_angle_deg,
            self.trial.rotation,
        );

        self.log.push(TrajectorySample {
            position: pointer,
            buttons: input.buttons,
            time: input.time,
            step: self.step,
            relative: self.workspace.normalise(pointer),
        });

        if complete {
            self.finished = true;
            TickOutcome::Advance
        } else {
            TickOutcome::Continue
        }
    }

    /// Marker poses for the current step.
    pub fn presentation(&self) -> Presentation {
        Presentation {
            home: MarkerPose {
                position: self.workspace.home,
                visible: self.step.home_visible(),
            },
            target: MarkerPose {
                position: self.target,
                visible: self.step.target_visible(),
            },
            cursor: self.cursor,
        }
    }

    /// Close the trial and hand over its data.
    pub fn finish(self) -> TrialResult {
        TrialResult {
            trial: self.trial,
            log: self.log,
            skipped: self.skipped,
            completed: self.finished,
            frames: self.frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Rotation, TaskType};
    use crate::trial::feedback::FeedbackMode;

    fn trial(angle: f64, rotation: Rotation) -> Trial {
        Trial {
            task_index: 1,
            trial_index: 0,
            task_type: TaskType::Abrupt,
            target_angle_deg: angle,
            rotation,
        }
    }

    fn run(angle: f64, rotation: Rotation) -> TrialRun {
        TrialRun::new(trial(angle, rotation), Workspace::default(), FeedbackParams::default())
    }

    #[test]
    fn test_initial_state() {
        let run = run(40.0, Rotation::Degrees(0.0));
        assert_eq!(run.step(), TrialStep::HomeAcquire);
        assert!(!run.home_reached());
        assert_eq!(run.cursor().position, OFFSCREEN);
        assert!(run.log().is_empty());
    }

    #[test]
    fn test_full_reach_sequence() {
        let mut r = run(50.0, Rotation::Degrees(0.0));
        let home = Workspace::default().home;
        let target = r.target();

        assert_eq!(r.tick(&FrameInput::at(Point::new(0.5, 0.5), 0.0)), TickOutcome::Continue);
        assert_eq!(r.step(), TrialStep::HomeAcquire);

        assert_eq!(r.tick(&FrameInput::at(home, 0.1)), TickOutcome::Continue);
        assert_eq!(r.step(), TrialStep::TargetReach);

        assert_eq!(r.tick(&FrameInput::at(target, 0.2)), TickOutcome::Continue);
        assert_eq!(r.step(), TrialStep::HomeReturn);

        assert_eq!(r.tick(&FrameInput::at(home, 0.3)), TickOutcome::Advance);
        assert!(r.is_finished());

        let result = r.finish();
        assert!(result.completed);
        assert_eq!(result.log.steps(), vec![1, 2, 3, 3]);
        assert_eq!(result.frames, 4);
    }

    #[test]
    fn test_no_return_to_home_acquire() {
        let mut r = run(40.0, Rotation::Clamped);
        let home = Workspace::default().home;
        r.tick(&FrameInput::at(home, 0.0));
        assert_eq!(r.step(), TrialStep::TargetReach);
        for i in 1..10 {
            r.tick(&FrameInput::at(home, i as f64 * 0.01));
            assert_eq!(r.step(), TrialStep::TargetReach);
        }
    }

    #[test]
    fn test_gap_reuses_last_position() {
        let mut r = run(40.0, Rotation::Degrees(30.0));
        let p = Point::new(0.1, 0.05);
        r.tick(&FrameInput::at(p, 0.0));
        r.tick(&FrameInput::gap(0.016));
        let samples = r.log().samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].position, p);
    }

    #[test]
    fn test_gap_before_first_sample_is_offscreen() {
        let mut r = run(40.0, Rotation::Degrees(0.0));
        assert_eq!(r.tick(&FrameInput::gap(0.0)), TickOutcome::Continue);
        assert_eq!(r.log().samples()[0].position, OFFSCREEN);
    }

    #[test]
    fn test_cancel_terminates_without_logging() {
        let mut r = run(40.0, Rotation::Degrees(0.0));
        r.tick(&FrameInput::at(Point::ORIGIN, 0.0));
        assert_eq!(r.tick(&FrameInput::cancelled(0.1)), TickOutcome::Terminate);
        assert_eq!(r.log().len(), 1);
        assert!(!r.is_finished());
    }

    #[test]
    fn test_skip_key_ends_trial() {
        let mut r = run(40.0, Rotation::Degrees(0.0));
        let mut input = FrameInput::at(Point::ORIGIN, 0.2);
        input.skip = Some(KeyPress::new("q", 0.2));
        assert_eq!(r.tick(&input), TickOutcome::Advance);
        let result = r.finish();
        assert!(result.completed);
        assert_eq!(result.skipped.unwrap().name, "q");
    }

    #[test]
    fn test_presentation_visibility() {
        let mut r = run(140.0, Rotation::Degrees(0.0));
        let home = Workspace::default().home;
        let p = r.presentation();
        assert!(p.home.visible && !p.target.visible);

        r.tick(&FrameInput::at(home, 0.0));
        let p = r.presentation();
        assert!(!p.home.visible && p.target.visible);
        assert_eq!(p.target.position, r.target());
    }

    #[test]
    fn test_clamped_ring_during_home_acquire() {
        let mut r = run(40.0, Rotation::Clamped);
        r.tick(&FrameInput::at(Point::new(0.4, 0.4), 0.0));
        assert_eq!(r.cursor().mode, FeedbackMode::Ring);
        assert!((r.cursor().opacity - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_tick_after_finish_is_idempotent() {
        let mut r = run(40.0, Rotation::Degrees(0.0));
        let mut input = FrameInput::at(Point::ORIGIN, 0.0);
        input.skip = Some(KeyPress::new("a", 0.0));
        r.tick(&input);
        assert_eq!(r.tick(&FrameInput::at(Point::ORIGIN, 0.1)), TickOutcome::Advance);
        assert_eq!(r.log().len(), 1);
    }
}
