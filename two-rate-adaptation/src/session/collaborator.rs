//! Presentation-Framework Boundary
//!
//! The experiment core never draws, polls devices or writes files itself.
//! A presentation framework implements these traits and hands them to the
//! session driver once per frame. All calls are non-blocking snapshots.

use super::record::TrialRecord;
use crate::time::TrialClock;
use crate::trial::{Buttons, KeyPress, Point};
use crate::Result;

/// Tracked pointer (mouse, stylus, ...).
pub trait PointerSource {
    /// Current position in normalised screen units, `None` if no new sample
    /// arrived since the previous frame.
    fn position(&mut self) -> Option<Point>;

    /// Left, middle and right button state.
    fn buttons(&mut self) -> Buttons;
}

/// Keyboard events.
pub trait KeySource {
    /// Presses of keys in `filter` since the last call or clear, oldest first.
    /// Presses of other keys stay queued.
    fn get_keys(&mut self, filter: &[String]) -> Vec<KeyPress>;

    /// Drop all queued presses.
    fn clear(&mut self);
}

/// Trial-data persistence.
pub trait DataSink {
    /// Store one record. Called at configuration time and once per trial.
    fn record(&mut self, record: &TrialRecord) -> Result<()>;

    /// Make everything recorded so far durable.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A drawable shape whose pose the core controls.
pub trait Marker {
    fn set_position(&mut self, position: Point);
    fn set_radius(&mut self, radius: f64);
    fn set_opacity(&mut self, opacity: f64);
    fn set_visible(&mut self, visible: bool);
}

/// A text stimulus.
pub trait TextLabel {
    fn set_text(&mut self, text: &str);
    fn set_visible(&mut self, visible: bool);
}

/// The stimuli used by the task.
pub trait Stimuli {
    fn home(&mut self) -> &mut dyn Marker;
    fn target(&mut self) -> &mut dyn Marker;
    fn cursor(&mut self) -> &mut dyn Marker;
    /// Full-screen message (setup, instructions, goodbye)
    fn message(&mut self) -> &mut dyn TextLabel;
    /// Trials-remaining counter shown during reaches
    fn counter(&mut self) -> &mut dyn TextLabel;

    /// Hide everything.
    fn hide_all(&mut self) {
        self.home().set_visible(false);
        self.target().set_visible(false);
        self.cursor().set_visible(false);
        self.message().set_visible(false);
        self.counter().set_visible(false);
    }
}

/// Collaborators borrowed for one tick.
pub struct Collaborators<'a> {
    pub pointer: &'a mut dyn PointerSource,
    pub keys: &'a mut dyn KeySource,
    pub clock: &'a mut dyn TrialClock,
    pub stimuli: &'a mut dyn Stimuli,
    pub sink: &'a mut dyn DataSink,
}
