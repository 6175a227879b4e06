//! Headless Simulation
//!
//! Scripted collaborators that let a whole session run without a display:
//! a pointer that walks to whichever marker is visible, a key queue that
//! answers text screens, a frame-stepped clock and stimuli that only keep
//! state. Used by the `simulate` command, integration tests and benches.

use super::collaborator::{
    Collaborators, DataSink, KeySource, Marker, PointerSource, Stimuli, TextLabel,
};
use super::driver::{SessionDriver, SessionEvent};
use crate::time::{ManualClock, TrialClock};
use crate::trial::{Buttons, KeyPress, Point};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// State of a simulated marker.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarkerState {
    pub position: Point,
    pub radius: f64,
    pub opacity: f64,
    pub visible: bool,
}

impl Marker for MarkerState {
    fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// State of a simulated text label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelState {
    pub text: String,
    pub visible: bool,
}

impl TextLabel for LabelState {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Stimuli that record what would be drawn.
#[derive(Debug, Clone, Default)]
pub struct RecordingStimuli {
    pub home: MarkerState,
    pub target: MarkerState,
    pub cursor: MarkerState,
    pub message: LabelState,
    pub counter: LabelState,
}

impl Stimuli for RecordingStimuli {
    fn home(&mut self) -> &mut dyn Marker {
        &mut self.home
    }

    fn target(&mut self) -> &mut dyn Marker {
        &mut self.target
    }

    fn cursor(&mut self) -> &mut dyn Marker {
        &mut self.cursor
    }

    fn message(&mut self) -> &mut dyn TextLabel {
        &mut self.message
    }

    fn counter(&mut self) -> &mut dyn TextLabel {
        &mut self.counter
    }
}

/// Key queue filled by the script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    queue: VecDeque<KeyPress>,
}

impl ScriptedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, name: &str, rt: f64) {
        self.queue.push_back(KeyPress::new(name, rt));
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl KeySource for ScriptedKeys {
    fn get_keys(&mut self, filter: &[String]) -> Vec<KeyPress> {
        let (matched, kept): (VecDeque<_>, VecDeque<_>) = self
            .queue
            .drain(..)
            .partition(|key| filter.iter().any(|f| *f == key.name));
        self.queue = kept;
        matched.into()
    }

    fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Pointer that moves in straight segments toward a goal.
///
/// Outward reaches first head for a via-point rotated by a random angle
/// within `±jitter_deg`, then correct onto the target.
#[derive(Debug, Clone)]
pub struct ScriptedPointer {
    position: Point,
    buttons: Buttons,
    /// Distance covered per frame
    speed: f64,
    jitter_deg: f64,
    /// Report no sample every n-th frame
    gap_every: Option<u64>,
    waypoints: VecDeque<Point>,
    planned_target: Option<Point>,
    frame: u64,
    rng: StdRng,
}

impl ScriptedPointer {
    pub fn new(start: Point, speed: f64, jitter_deg: f64, seed: u64) -> Self {
        Self {
            position: start,
            buttons: Buttons::default(),
            speed,
            jitter_deg: jitter_deg.abs(),
            gap_every: None,
            waypoints: VecDeque::new(),
            planned_target: None,
            frame: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_gaps(mut self, every: Option<u64>) -> Self {
        self.gap_every = every.filter(|n| *n > 0);
        self
    }

    pub fn current(&self) -> Point {
        self.position
    }

    /// Pick the goal from what is on screen and move one frame toward it.
    pub fn steer(&mut self, stimuli: &RecordingStimuli) {
        if stimuli.target.visible {
            let target = stimuli.target.position;
            if self.planned_target != Some(target) {
                self.plan_reach(stimuli.home.position, target);
            }
        } else {
            self.planned_target = None;
            self.waypoints.clear();
            if stimuli.home.visible {
                self.waypoints.push_back(stimuli.home.position);
            }
        }
        self.buttons = Buttons::new(self.planned_target.is_some(), false, false);
        self.step();
    }

    fn plan_reach(&mut self, home: Point, target: Point) {
        self.waypoints.clear();
        if self.jitter_deg > 0.0 {
            let offset = self.rng.gen_range(-self.jitter_deg..=self.jitter_deg);
            let via = home + (target - home).rotate(offset.to_radians()) * 0.6;
            self.waypoints.push_back(via);
        }
        self.waypoints.push_back(target);
        self.planned_target = Some(target);
    }

    fn step(&mut self) {
        let mut budget = self.speed;
        while budget > 0.0 {
            let Some(goal) = self.waypoints.front().copied() else {
                break;
            };
            let distance = self.position.distance(goal);
            if distance <= budget {
                self.position = goal;
                budget -= distance;
                // Keep the final goal so the pointer rests on it.
                if self.waypoints.len() > 1 {
                    self.waypoints.pop_front();
                } else {
                    break;
                }
            } else {
                let direction = (goal - self.position) * (1.0 / distance);
                self.position = self.position + direction * budget;
                break;
            }
        }
    }
}

impl PointerSource for ScriptedPointer {
    fn position(&mut self) -> Option<Point> {
        self.frame += 1;
        match self.gap_every {
            Some(n) if self.frame % n == 0 => None,
            _ => Some(self.position),
        }
    }

    fn buttons(&mut self) -> Buttons {
        self.buttons
    }
}

/// Knobs of a headless run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed of the pointer's reach jitter
    pub seed: u64,
    /// Maximum angular deviation of the initial reach direction (degrees)
    pub jitter_deg: f64,
    /// Pointer speed in workspace units per frame
    pub speed: f64,
    pub frame_period: f64,
    /// Drop every n-th pointer sample
    pub gap_every: Option<u64>,
    /// Press the quit key once this many trials are recorded
    pub quit_after_trials: Option<usize>,
    /// Session-wide trial numbers ended with a skip key
    pub skip_trials: BTreeSet<usize>,
    pub skip_key: String,
    /// Abort if the session has not ended after this many frames
    pub max_frames: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            jitter_deg: 0.0,
            speed: 0.05,
            frame_period: ManualClock::DEFAULT_FRAME_PERIOD,
            gap_every: None,
            quit_after_trials: None,
            skip_trials: BTreeSet::new(),
            skip_key: "s".to_string(),
            max_frames: 2_000_000,
        }
    }
}

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub trials_recorded: usize,
    pub trials_skipped: usize,
    pub frames: u64,
    /// Simulated seconds
    pub duration_secs: f64,
}

/// Scripted collaborators wired around a [`SessionDriver`].
#[derive(Debug)]
pub struct HeadlessRig {
    pub pointer: ScriptedPointer,
    pub keys: ScriptedKeys,
    pub clock: ManualClock,
    pub stimuli: RecordingStimuli,
    config: SimulationConfig,
    frames: u64,
    skipped: usize,
    last_skip: Option<usize>,
    /// Set from outside (e.g. Ctrl+C) to press the quit key
    interrupt: Option<Arc<AtomicBool>>,
}

impl HeadlessRig {
    pub fn new(config: SimulationConfig) -> Self {
        let pointer = ScriptedPointer::new(
            Point::new(0.3, 0.2),
            config.speed,
            config.jitter_deg,
            config.seed,
        )
        .with_gaps(config.gap_every);
        Self {
            pointer,
            keys: ScriptedKeys::new(),
            clock: ManualClock::new(config.frame_period),
            stimuli: RecordingStimuli::default(),
            config,
            frames: 0,
            skipped: 0,
            last_skip: None,
            interrupt: None,
        }
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame: script input, tick the driver, advance the clock.
    pub fn step(
        &mut self,
        driver: &mut SessionDriver,
        sink: &mut dyn DataSink,
    ) -> Result<SessionEvent> {
        self.script_keys(driver);
        self.pointer.steer(&self.stimuli);

        let event = {
            let mut io = Collaborators {
                pointer: &mut self.pointer,
                keys: &mut self.keys,
                clock: &mut self.clock,
                stimuli: &mut self.stimuli,
                sink: &mut *sink,
            };
            driver.tick(&mut io)?
        };

        self.clock.advance_frame();
        self.frames += 1;
        Ok(event)
    }

    /// Run until the session finishes.
    ///
    /// Returns [`Error::Cancelled`] if the script pressed the quit key; every
    /// record written before that stays in the sink.
    pub fn run(
        &mut self,
        driver: &mut SessionDriver,
        sink: &mut dyn DataSink,
    ) -> Result<SimulationReport> {
        let mut recorded = 0;
        loop {
            if self.frames >= self.config.max_frames {
                return Err(Error::Simulation(format!(
                    "session did not finish within {} frames",
                    self.config.max_frames
                )));
            }
            match self.step(driver, sink)? {
                SessionEvent::Continue => {}
                SessionEvent::TrialRecorded { .. } => recorded += 1,
                SessionEvent::Finished => break,
                SessionEvent::Cancelled => {
                    info!(recorded, frames = self.frames, "Simulation cancelled");
                    return Err(Error::Cancelled);
                }
            }
        }

        let report = SimulationReport {
            trials_recorded: recorded,
            trials_skipped: self.skipped,
            frames: self.frames,
            duration_secs: self.clock.absolute(),
        };
        info!(
            trials = report.trials_recorded,
            frames = report.frames,
            secs = report.duration_secs,
            "Simulation finished"
        );
        Ok(report)
    }

    fn script_keys(&mut self, driver: &SessionDriver) {
        let rt = self.clock.elapsed();
        let completed = driver.completed_trials();

        let interrupted = self
            .interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst));
        let limit_hit = self
            .config
            .quit_after_trials
            .is_some_and(|limit| completed >= limit);
        if (interrupted || limit_hit) && !driver.is_done() {
            debug!(completed, interrupted, "Scripted quit");
            self.keys.press(&driver.settings().quit_key, rt);
            return;
        }

        if self.stimuli.message.visible && self.keys.pending() == 0 {
            self.keys.press(&driver.settings().continue_key, rt);
        } else if driver.in_trial()
            && self.config.skip_trials.contains(&completed)
            && self.keys.pending() == 0
        {
            if self.last_skip != Some(completed) {
                self.skipped += 1;
                self.last_skip = Some(completed);
            }
            self.keys.press(&self.config.skip_key, rt);
        }
    }
}
