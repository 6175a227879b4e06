//! Session Driver
//!
//! Sequences the routines of one session and feeds trial frames through
//! [`TrialRun`]:
//!
//! ```text
//! Setup ─▶ Instruction(0) ─▶ trials of task 0 ─▶ Instruction(1) ─▶ ...
//!                                         ... ─▶ trials of task 2 ─▶ End
//! ```
//!
//! The driver owns no I/O. The presentation framework calls
//! [`SessionDriver::tick`] once per display refresh with its collaborators.

use super::collaborator::{Collaborators, Stimuli};
use super::record::{SessionMetadata, TrialRecord};
use crate::app::config::{default_skip_keys, Config};
use crate::schedule::Schedule;
use crate::trial::{
    FeedbackParams, FrameInput, LayoutParams, Presentation, TickOutcome, TrialRun, TrialStep,
    Workspace,
};
use crate::{Error, Result};
use tracing::{debug, error, info, warn};

/// Text of the first screen.
pub const SETUP_TEXT: &str = "Use Mouse. Space continue";

/// Text of the final screen.
pub const END_TEXT: &str = "thank you";

/// Runtime settings of a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub continue_key: String,
    pub quit_key: String,
    /// Keys that end the current trial early
    pub skip_keys: Vec<String>,
    pub end_screen_secs: f64,
    pub layout: LayoutParams,
    pub feedback: FeedbackParams,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            continue_key: "space".to_string(),
            quit_key: "escape".to_string(),
            skip_keys: default_skip_keys(),
            end_screen_secs: 1.0,
            layout: LayoutParams::default(),
            feedback: FeedbackParams::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            continue_key: config.experiment.continue_key.clone(),
            quit_key: config.experiment.quit_key.clone(),
            skip_keys: config.experiment.skip_keys.clone(),
            end_screen_secs: config.experiment.end_screen_secs,
            layout: config.workspace.clone(),
            feedback: config.feedback.clone(),
        }
    }
}

/// What happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Nothing finished this tick
    Continue,
    /// A trial ended and its record was handed to the sink
    TrialRecorded { task_index: usize, trial_index: usize },
    /// End screen elapsed; the session is over
    Finished,
    /// The quit key was pressed
    Cancelled,
}

#[derive(Debug)]
enum Routine {
    Setup,
    Instruction { task_index: usize },
    Trial { run: Box<TrialRun> },
    End,
    Done { cancelled: bool },
}

impl Routine {
    fn name(&self) -> &'static str {
        match self {
            Routine::Setup => "setup",
            Routine::Instruction { .. } => "instruction",
            Routine::Trial { .. } => "trial",
            Routine::End => "end",
            Routine::Done { .. } => "done",
        }
    }
}

/// Drives a whole session against a fixed schedule.
#[derive(Debug)]
pub struct SessionDriver {
    schedule: Schedule,
    settings: SessionSettings,
    workspace: Workspace,
    metadata: SessionMetadata,
    routine: Routine,
    /// Routine still needs its begin step
    pending_begin: bool,
    configured: bool,
    completed_trials: usize,
}

impl SessionDriver {
    pub fn new(schedule: Schedule, settings: SessionSettings) -> Self {
        let workspace = Workspace::from_layout(&settings.layout);
        let metadata = SessionMetadata::new(schedule.code());
        Self {
            schedule,
            settings,
            workspace,
            metadata,
            routine: Routine::Setup,
            pending_begin: true,
            configured: false,
            completed_trials: 0,
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn completed_trials(&self) -> usize {
        self.completed_trials
    }

    pub fn remaining_trials(&self) -> usize {
        self.schedule.total_trials().saturating_sub(self.completed_trials)
    }

    /// Task of the current instruction screen or trial.
    pub fn current_task(&self) -> Option<usize> {
        match &self.routine {
            Routine::Instruction { task_index } => Some(*task_index),
            Routine::Trial { run } => Some(run.trial().task_index),
            _ => None,
        }
    }

    /// Step of the running trial.
    pub fn current_step(&self) -> Option<TrialStep> {
        match &self.routine {
            Routine::Trial { run } => Some(run.step()),
            _ => None,
        }
    }

    pub fn in_trial(&self) -> bool {
        matches!(self.routine, Routine::Trial { .. })
    }

    pub fn is_done(&self) -> bool {
        matches!(self.routine, Routine::Done { .. })
    }

    /// Run one frame.
    pub fn tick(&mut self, io: &mut Collaborators<'_>) -> Result<SessionEvent> {
        if let Routine::Done { cancelled } = self.routine {
            return Ok(if cancelled {
                SessionEvent::Cancelled
            } else {
                SessionEvent::Finished
            });
        }

        if !self.configured {
            io.sink
                .record(&TrialRecord::configuration(&self.schedule, &self.metadata))?;
            self.configured = true;
            info!(
                session = %self.metadata.id,
                code = self.schedule.code().value(),
                total_trials = self.schedule.total_trials(),
                "Session configured"
            );
        }

        if self.pending_begin {
            self.begin_routine(io)?;
            self.pending_begin = false;
        }

        // Checked once per tick. A running trial sees it as its cancel input.
        let quit = !io
            .keys
            .get_keys(std::slice::from_ref(&self.settings.quit_key))
            .is_empty();
        if quit && !self.in_trial() {
            return self.cancel(io);
        }

        match &mut self.routine {
            Routine::Setup => {
                if self.continue_pressed(io) {
                    self.enter(Routine::Instruction { task_index: 0 });
                }
                Ok(SessionEvent::Continue)
            }
            Routine::Instruction { task_index } => {
                let task_index = *task_index;
                if self.continue_pressed(io) {
                    let next = self.trial_routine(task_index, 0)?;
                    self.enter(next);
                }
                Ok(SessionEvent::Continue)
            }
            Routine::Trial { run } => {
                let skip = io.keys.get_keys(&self.settings.skip_keys).into_iter().last();
                let input = FrameInput {
                    pointer: io.pointer.position(),
                    buttons: io.pointer.buttons(),
                    time: io.clock.elapsed(),
                    cancel: quit,
                    skip,
                };
                match run.tick(&input) {
                    TickOutcome::Continue => {
                        apply_presentation(io.stimuli, &run.presentation());
                        Ok(SessionEvent::Continue)
                    }
                    TickOutcome::Advance => self.end_trial(io),
                    TickOutcome::Terminate => self.cancel(io),
                }
            }
            Routine::End => {
                if io.clock.elapsed() >= self.settings.end_screen_secs {
                    io.stimuli.hide_all();
                    io.sink.flush()?;
                    self.metadata.finalize(self.completed_trials, true);
                    self.routine = Routine::Done { cancelled: false };
                    info!(trials = self.completed_trials, "Session finished");
                    return Ok(SessionEvent::Finished);
                }
                Ok(SessionEvent::Continue)
            }
            Routine::Done { .. } => Ok(SessionEvent::Continue),
        }
    }

    fn enter(&mut self, routine: Routine) {
        debug!(from = self.routine.name(), to = routine.name(), "Routine change");
        self.routine = routine;
        self.pending_begin = true;
    }

    fn continue_pressed(&self, io: &mut Collaborators<'_>) -> bool {
        !io.keys
            .get_keys(std::slice::from_ref(&self.settings.continue_key))
            .is_empty()
    }

    fn trial_routine(&self, task_index: usize, trial_index: usize) -> Result<Routine> {
        let trial = self.schedule.trial(task_index, trial_index).ok_or_else(|| {
            Error::ScheduleIntegrity(format!(
                "no trial {} in task {}",
                trial_index, task_index
            ))
        })?;
        Ok(Routine::Trial {
            run: Box::new(TrialRun::new(
                trial,
                self.workspace,
                self.settings.feedback.clone(),
            )),
        })
    }

    /// Routine-begin step: clock reset, key buffer cleared, stimuli set up.
    fn begin_routine(&mut self, io: &mut Collaborators<'_>) -> Result<()> {
        io.clock.reset();
        io.keys.clear();
        io.stimuli.hide_all();

        match &self.routine {
            Routine::Setup => {
                show_message(io.stimuli, SETUP_TEXT);
            }
            Routine::Instruction { task_index } => {
                let task_type = self
                    .schedule
                    .task(*task_index)
                    .map(|t| t.task_type)
                    .ok_or_else(|| {
                        Error::ScheduleIntegrity(format!("no task {}", task_index))
                    })?;
                let text = format!(
                    "Task {} of {}: {}\n\nPress {} to continue",
                    task_index + 1,
                    self.schedule.tasks.len(),
                    task_type,
                    self.settings.continue_key
                );
                show_message(io.stimuli, &text);
                info!(task = task_index, task_type = %task_type, "Task instructions");
            }
            Routine::Trial { run } => {
                let remaining = self.remaining_trials();
                let workspace = &self.workspace;

                let home = io.stimuli.home();
                home.set_position(workspace.home);
                home.set_radius(workspace.cursor_radius);
                home.set_opacity(1.0);

                let target = io.stimuli.target();
                target.set_position(run.target());
                target.set_radius(workspace.cursor_radius);
                target.set_opacity(1.0);

                let counter = io.stimuli.counter();
                counter.set_text(&remaining.to_string());
                counter.set_visible(true);

                apply_presentation(io.stimuli, &run.presentation());
                debug!(
                    task = run.trial().task_index,
                    trial = run.trial().trial_index,
                    angle = run.trial().target_angle_deg,
                    rotation = %run.trial().rotation,
                    "Trial start"
                );
            }
            Routine::End => {
                show_message(io.stimuli, END_TEXT);
            }
            Routine::Done { .. } => {}
        }
        Ok(())
    }

    fn end_trial(&mut self, io: &mut Collaborators<'_>) -> Result<SessionEvent> {
        let run = match std::mem::replace(&mut self.routine, Routine::End) {
            Routine::Trial { run } => run,
            other => {
                self.routine = other;
                return Ok(SessionEvent::Continue);
            }
        };

        let result = run.finish();
        let task_index = result.trial.task_index;
        let trial_index = result.trial.trial_index;
        if let Err(err) = io.sink.record(&TrialRecord::from_result(&result)) {
            // The trial is lost, so the session cannot end as completed.
            error!(
                task = task_index,
                trial = trial_index,
                error = %err,
                "Failed to record trial, aborting session"
            );
            io.stimuli.hide_all();
            self.metadata.finalize(self.completed_trials, false);
            self.routine = Routine::Done { cancelled: true };
            return Err(err);
        }
        self.completed_trials += 1;

        debug!(
            task = task_index,
            trial = trial_index,
            frames = result.frames,
            skipped = result.skipped.is_some(),
            "Trial recorded"
        );

        let task_len = self.schedule.task(task_index).map_or(0, |t| t.len());
        let next = if trial_index + 1 < task_len {
            self.trial_routine(task_index, trial_index + 1)?
        } else if task_index + 1 < self.schedule.tasks.len() {
            info!(task = task_index, "Task complete");
            Routine::Instruction {
                task_index: task_index + 1,
            }
        } else {
            info!(task = task_index, "Last task complete");
            Routine::End
        };
        self.routine = next;
        self.pending_begin = true;

        Ok(SessionEvent::TrialRecorded {
            task_index,
            trial_index,
        })
    }

    fn cancel(&mut self, io: &mut Collaborators<'_>) -> Result<SessionEvent> {
        warn!(
            routine = self.routine.name(),
            completed = self.completed_trials,
            "Quit key pressed"
        );
        io.stimuli.hide_all();
        io.sink.flush()?;
        self.metadata.finalize(self.completed_trials, false);
        self.routine = Routine::Done { cancelled: true };
        Ok(SessionEvent::Cancelled)
    }
}

fn show_message(stimuli: &mut dyn Stimuli, text: &str) {
    let message = stimuli.message();
    message.set_text(text);
    message.set_visible(true);
}

/// Copy a trial's presentation onto the markers.
pub fn apply_presentation(stimuli: &mut dyn Stimuli, presentation: &Presentation) {
    let home = stimuli.home();
    home.set_position(presentation.home.position);
    home.set_visible(presentation.home.visible);

    let target = stimuli.target();
    target.set_position(presentation.target.position);
    target.set_visible(presentation.target.visible);

    let cursor = stimuli.cursor();
    cursor.set_position(presentation.cursor.position);
    cursor.set_radius(presentation.cursor.radius);
    cursor.set_opacity(presentation.cursor.opacity);
    cursor.set_visible(true);
}
