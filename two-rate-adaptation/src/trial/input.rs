//! Per-frame input snapshot
//!
//! Everything the state machine reads in one tick, polled once from the
//! collaborators before any state is derived.

use super::geometry::Point;
use serde::{Deserialize, Serialize};

/// Mouse button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Buttons {
    pub left: bool,
    pub middle: bool,
    pub right: bool,
}

impl Buttons {
    pub const fn new(left: bool, middle: bool, right: bool) -> Self {
        Self {
            left,
            middle,
            right,
        }
    }
}

impl From<(bool, bool, bool)> for Buttons {
    fn from((left, middle, right): (bool, bool, bool)) -> Self {
        Self::new(left, middle, right)
    }
}

/// A key press with its reaction time (seconds since the key source started).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPress {
    pub name: String,
    pub rt: f64,
}

impl KeyPress {
    pub fn new(name: impl Into<String>, rt: f64) -> Self {
        Self {
            name: name.into(),
            rt,
        }
    }
}

/// Input polled for one tick.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Pointer position; `None` when no new sample arrived this tick
    pub pointer: Option<Point>,
    pub buttons: Buttons,
    /// Seconds since the trial clock was reset
    pub time: f64,
    /// Quit requested (checked before any transition)
    pub cancel: bool,
    /// Key that ends the trial early
    pub skip: Option<KeyPress>,
}

impl FrameInput {
    pub fn at(pointer: Point, time: f64) -> Self {
        Self {
            pointer: Some(pointer),
            time,
            ..Self::default()
        }
    }

    /// Tick without a fresh pointer sample.
    pub fn gap(time: f64) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    pub fn cancelled(time: f64) -> Self {
        Self {
            time,
            cancel: true,
            ..Self::default()
        }
    }
}
