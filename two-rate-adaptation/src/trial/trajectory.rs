//! Trajectory Log
//!
//! One sample per frame: raw pointer, button state, trial time, the step the
//! frame ended in, and the pointer relative to home normalised by the
//! home-target distance. The log is only handed to the data sink when the
//! trial ends.

use super::geometry::Point;
use super::input::Buttons;
use super::state::TrialStep;
use serde::{Deserialize, Serialize};

/// A single frame of recorded movement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub position: Point,
    pub buttons: Buttons,
    pub time: f64,
    pub step: TrialStep,
    /// Pointer relative to home, in home-target distances
    pub relative: Point,
}

/// Ordered per-frame samples of one trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryLog {
    samples: Vec<TrajectorySample>,
}

impl TrajectoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: TrajectorySample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.position.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.position.y).collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn left_buttons(&self) -> Vec<bool> {
        self.samples.iter().map(|s| s.buttons.left).collect()
    }

    pub fn middle_buttons(&self) -> Vec<bool> {
        self.samples.iter().map(|s| s.buttons.middle).collect()
    }

    pub fn right_buttons(&self) -> Vec<bool> {
        self.samples.iter().map(|s| s.buttons.right).collect()
    }

    /// Step index (1-3) per frame.
    pub fn steps(&self) -> Vec<u8> {
        self.samples.iter().map(|s| s.step.index()).collect()
    }

    pub fn relative_xs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.relative.x).collect()
    }

    pub fn relative_ys(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.relative.y).collect()
    }

    /// Seconds between the first and last sample.
    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }

    /// Time of the first frame spent in `step`.
    pub fn step_onset(&self, step: TrialStep) -> Option<f64> {
        self.samples.iter().find(|s| s.step == step).map(|s| s.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, time: f64, step: TrialStep) -> TrajectorySample {
        TrajectorySample {
            position: Point::new(x, 0.0),
            buttons: Buttons::new(x > 0.5, false, false),
            time,
            step,
            relative: Point::new(x * 2.0, 0.0),
        }
    }

    #[test]
    fn test_columns() {
        let mut log = TrajectoryLog::new();
        log.push(sample(0.0, 0.0, TrialStep::HomeAcquire));
        log.push(sample(0.6, 0.1, TrialStep::TargetReach));
        log.push(sample(0.2, 0.2, TrialStep::HomeReturn));

        assert_eq!(log.len(), 3);
        assert_eq!(log.xs(), vec![0.0, 0.6, 0.2]);
        assert_eq!(log.steps(), vec![1, 2, 3]);
        assert_eq!(log.left_buttons(), vec![false, true, false]);
        assert_eq!(log.relative_xs(), vec![0.0, 1.2, 0.4]);
        assert!((log.duration() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_step_onset() {
        let mut log = TrajectoryLog::new();
        log.push(sample(0.0, 0.0, TrialStep::HomeAcquire));
        log.push(sample(0.1, 0.5, TrialStep::TargetReach));
        log.push(sample(0.2, 0.6, TrialStep::TargetReach));
        assert_eq!(log.step_onset(TrialStep::TargetReach), Some(0.5));
        assert_eq!(log.step_onset(TrialStep::HomeReturn), None);
    }

    #[test]
    fn test_empty_log() {
        let log = TrajectoryLog::new();
        assert!(log.is_empty());
        assert_eq!(log.duration(), 0.0);
        assert!(log.last().is_none());
    }
}
