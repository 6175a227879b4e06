//! Task Types & Phase Tables
//!
//! Each task type shapes its rotation sequence from a table of phases. A
//! phase is a contiguous run of trials sharing one rule: either a flat
//! rotation (possibly the clamp) or, for the ramped task, a linear ramp.

use super::rotation::Rotation;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of the learning curve a task imposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// 12 unrotated trials followed by 12 clamped trials
    Baseline,
    /// Full 30° rotation switched on at once
    Abrupt,
    /// Rotation grows by 0.625° per trial up to 30°
    Ramped,
    /// Rotation grows in four 7.5° steps up to 30°
    Stepped,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Baseline,
        TaskType::Abrupt,
        TaskType::Ramped,
        TaskType::Stepped,
    ];

    /// Numeric identifier used in data files.
    pub const fn id(&self) -> u8 {
        match self {
            TaskType::Baseline => 0,
            TaskType::Abrupt => 1,
            TaskType::Ramped => 2,
            TaskType::Stepped => 3,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Whether the task's rotations are multiplied by the condition's sign.
    pub fn is_signed(&self) -> bool {
        !matches!(self, TaskType::Baseline)
    }

    /// Phase table the task type uses by default.
    pub fn default_plan(&self) -> PhasePlan {
        let c = Rotation::Clamped;
        let d = Rotation::Degrees;
        match self {
            TaskType::Baseline => PhasePlan::flat(vec![12, 12], vec![d(0.0), c]),
            TaskType::Abrupt => PhasePlan::flat(
                vec![32, 96, 8, 24],
                vec![d(0.0), d(30.0), d(-30.0), c],
            ),
            // Phase 1 is replaced by the ramp; its table entry is never read.
            TaskType::Ramped => PhasePlan {
                trials: vec![32, 48, 48, 8, 24],
                rotations: vec![d(0.0), c, d(30.0), d(-30.0), c],
                ramp: Some(RampOverride {
                    phase: 1,
                    step_deg: 0.625,
                }),
            },
            TaskType::Stepped => PhasePlan::flat(
                vec![32, 24, 24, 24, 24, 8, 24],
                vec![d(0.0), d(7.5), d(15.0), d(22.5), d(30.0), d(-30.0), c],
            ),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::Baseline => "baseline",
            TaskType::Abrupt => "abrupt",
            TaskType::Ramped => "ramped",
            TaskType::Stepped => "stepped",
        };
        f.write_str(name)
    }
}

/// One phase whose flat table value is replaced by a linear ramp.
///
/// The k-th trial of the phase (1-indexed) gets `k * step_deg`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampOverride {
    pub phase: usize,
    pub step_deg: f64,
}

/// Phase table for one task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasePlan {
    /// Trials in each phase
    pub trials: Vec<usize>,
    /// Flat rotation of each phase (unsigned)
    pub rotations: Vec<Rotation>,
    /// Optional ramp replacing one phase's flat value
    pub ramp: Option<RampOverride>,
}

impl PhasePlan {
    pub fn flat(trials: Vec<usize>, rotations: Vec<Rotation>) -> Self {
        Self {
            trials,
            rotations,
            ramp: None,
        }
    }

    pub fn phase_count(&self) -> usize {
        self.trials.len()
    }

    pub fn total_trials(&self) -> usize {
        self.trials.iter().sum()
    }

    /// Check the table is internally consistent.
    pub fn validate(&self) -> Result<(), Error> {
        if self.trials.len() != self.rotations.len() {
            return Err(Error::ScheduleIntegrity(format!(
                "phase table has {} trial counts but {} rotations",
                self.trials.len(),
                self.rotations.len()
            )));
        }
        if let Some(ramp) = self.ramp {
            if ramp.phase >= self.trials.len() {
                return Err(Error::ScheduleIntegrity(format!(
                    "ramp phase {} out of range for {} phases",
                    ramp.phase,
                    self.trials.len()
                )));
            }
            if !ramp.step_deg.is_finite() {
                return Err(Error::ScheduleIntegrity(
                    "ramp step must be a finite angle".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Expand the table into one rotation per trial, scaled by `sign`.
    pub fn expand(&self, sign: f64) -> Vec<Rotation> {
        let mut out = Vec::with_capacity(self.total_trials());
        for (phase, (&count, flat)) in self.trials.iter().zip(&self.rotations).enumerate() {
            match self.ramp {
                Some(ramp) if ramp.phase == phase => {
                    out.extend(
                        (1..=count).map(|k| Rotation::Degrees(k as f64 * ramp.step_deg * sign)),
                    );
                }
                _ => {
                    out.extend(std::iter::repeat(flat.scaled(sign)).take(count));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_roundtrip() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::from_id(t.id()), Some(t));
        }
        assert_eq!(TaskType::from_id(4), None);
    }

    #[test]
    fn test_default_plan_totals() {
        assert_eq!(TaskType::Baseline.default_plan().total_trials(), 24);
        assert_eq!(TaskType::Abrupt.default_plan().total_trials(), 160);
        assert_eq!(TaskType::Ramped.default_plan().total_trials(), 160);
        assert_eq!(TaskType::Stepped.default_plan().total_trials(), 160);
    }

    #[test]
    fn test_default_plans_validate() {
        for t in TaskType::ALL {
            assert!(t.default_plan().validate().is_ok(), "{} plan invalid", t);
        }
    }

    #[test]
    fn test_baseline_expansion() {
        let rotations = TaskType::Baseline.default_plan().expand(1.0);
        assert_eq!(rotations.len(), 24);
        assert!(rotations[..12].iter().all(|r| *r == Rotation::Degrees(0.0)));
        assert!(rotations[12..].iter().all(Rotation::is_clamped));
    }

    #[test]
    fn test_abrupt_expansion_negative_sign() {
        let rotations = TaskType::Abrupt.default_plan().expand(-1.0);
        assert_eq!(rotations[31].degrees(), 0.0);
        assert!(rotations[..32].iter().all(|r| r.degrees().is_sign_positive()));
        assert_eq!(rotations[32], Rotation::Degrees(-30.0));
        assert_eq!(rotations[127], Rotation::Degrees(-30.0));
        assert_eq!(rotations[128], Rotation::Degrees(30.0));
        assert_eq!(rotations[135], Rotation::Degrees(30.0));
        assert!(rotations[136..].iter().all(Rotation::is_clamped));
    }

    #[test]
    fn test_ramp_overrides_flat_value() {
        let rotations = TaskType::Ramped.default_plan().expand(1.0);
        // The flat entry for the ramp phase is a clamp, yet no ramp trial is clamped.
        assert!(rotations[32..80].iter().all(|r| !r.is_clamped()));
        assert_eq!(rotations[32], Rotation::Degrees(0.625));
        assert_eq!(rotations[79], Rotation::Degrees(30.0));
        assert_eq!(rotations[80], Rotation::Degrees(30.0));
    }

    #[test]
    fn test_stepped_levels() {
        let rotations = TaskType::Stepped.default_plan().expand(1.0);
        assert_eq!(rotations[32], Rotation::Degrees(7.5));
        assert_eq!(rotations[56], Rotation::Degrees(15.0));
        assert_eq!(rotations[80], Rotation::Degrees(22.5));
        assert_eq!(rotations[104], Rotation::Degrees(30.0));
        assert_eq!(rotations[128], Rotation::Degrees(-30.0));
        assert!(rotations[136].is_clamped());
    }

    #[test]
    fn test_validate_mismatched_lengths() {
        let plan = PhasePlan::flat(vec![10, 10], vec![Rotation::Degrees(0.0)]);
        assert!(matches!(plan.validate(), Err(Error::ScheduleIntegrity(_))));
    }

    #[test]
    fn test_validate_ramp_out_of_range() {
        let mut plan = TaskType::Ramped.default_plan();
        plan.ramp = Some(RampOverride {
            phase: 9,
            step_deg: 0.625,
        });
        assert!(matches!(plan.validate(), Err(Error::ScheduleIntegrity(_))));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(TaskType::Ramped.to_string(), "ramped");
        assert!(TaskType::Stepped.is_signed());
        assert!(!TaskType::Baseline.is_signed());
    }
}
