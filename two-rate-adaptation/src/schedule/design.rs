//! Experiment Design Tables
//!
//! Fixed lookup tables shared by every participant: how many reaches each
//! task position gets, which target angles each position draws from, and the
//! phase table of every task type. A design is validated as a whole before
//! any schedule is built from it.

use super::task_type::{PhasePlan, TaskType};
use crate::Error;
use serde::{Deserialize, Serialize};

/// Number of tasks in a session.
pub const TASKS_PER_SESSION: usize = 3;

/// Target angles (degrees) of the baseline position.
pub const BASELINE_TARGETS: [f64; 4] = [40.0, 50.0, 130.0, 140.0];
/// First target pair.
pub const RIGHT_TARGETS: [f64; 2] = [40.0, 50.0];
/// Second target pair.
pub const LEFT_TARGETS: [f64; 2] = [130.0, 140.0];

/// Reaches per task position.
pub const TRIAL_COUNTS: [usize; TASKS_PER_SESSION] = [24, 160, 160];

/// Phase tables keyed by task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasePlans {
    pub baseline: PhasePlan,
    pub abrupt: PhasePlan,
    pub ramped: PhasePlan,
    pub stepped: PhasePlan,
}

impl PhasePlans {
    pub fn get(&self, task_type: TaskType) -> &PhasePlan {
        match task_type {
            TaskType::Baseline => &self.baseline,
            TaskType::Abrupt => &self.abrupt,
            TaskType::Ramped => &self.ramped,
            TaskType::Stepped => &self.stepped,
        }
    }
}

impl Default for PhasePlans {
    fn default() -> Self {
        Self {
            baseline: TaskType::Baseline.default_plan(),
            abrupt: TaskType::Abrupt.default_plan(),
            ramped: TaskType::Ramped.default_plan(),
            stepped: TaskType::Stepped.default_plan(),
        }
    }
}

/// Complete set of design tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDesign {
    /// Reaches per task position
    pub trial_counts: [usize; TASKS_PER_SESSION],
    /// Target sets per task position, one assignment per `target_choice`
    pub target_sets: [[Vec<f64>; TASKS_PER_SESSION]; 2],
    /// Phase table per task type
    pub phase_plans: PhasePlans,
}

impl Default for ExperimentDesign {
    fn default() -> Self {
        let baseline = BASELINE_TARGETS.to_vec();
        let right = RIGHT_TARGETS.to_vec();
        let left = LEFT_TARGETS.to_vec();
        Self {
            trial_counts: TRIAL_COUNTS,
            target_sets: [
                [baseline.clone(), right.clone(), left.clone()],
                [baseline, left, right],
            ],
            phase_plans: PhasePlans::default(),
        }
    }
}

impl ExperimentDesign {
    /// Target angles used at `task_index` under `target_choice`.
    pub fn target_set(&self, target_choice: usize, task_index: usize) -> &[f64] {
        &self.target_sets[target_choice % 2][task_index]
    }

    pub fn total_trials(&self) -> usize {
        self.trial_counts.iter().sum()
    }

    /// Blocks (shuffled repetitions of the target set) at a task position.
    pub fn blocks(&self, target_choice: usize, task_index: usize) -> usize {
        let set = self.target_set(target_choice, task_index);
        if set.is_empty() {
            0
        } else {
            self.trial_counts[task_index] / set.len()
        }
    }

    /// Check every target set tiles its trial count exactly.
    pub fn validate_targets(&self) -> Result<(), Error> {
        for (choice, sets) in self.target_sets.iter().enumerate() {
            for (task_index, set) in sets.iter().enumerate() {
                let count = self.trial_counts[task_index];
                if set.is_empty() {
                    return Err(Error::ScheduleIntegrity(format!(
                        "target set {} for task {} is empty",
                        choice, task_index
                    )));
                }
                if let Some(bad) = set.iter().find(|a| !a.is_finite()) {
                    return Err(Error::ScheduleIntegrity(format!(
                        "target set {} for task {} contains non-finite angle {}",
                        choice, task_index, bad
                    )));
                }
                if count % set.len() != 0 {
                    return Err(Error::ScheduleIntegrity(format!(
                        "task {} has {} trials, not a multiple of its {} target angles",
                        task_index,
                        count,
                        set.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check the phase table of `task_type` fills position `task_index`.
    pub fn validate_placement(&self, task_index: usize, task_type: TaskType) -> Result<(), Error> {
        let plan = self.phase_plans.get(task_type);
        plan.validate()?;
        let expected = self.trial_counts[task_index];
        let total = plan.total_trials();
        if total != expected {
            return Err(Error::ScheduleIntegrity(format!(
                "{} phases cover {} trials but task {} needs {}",
                task_type, total, task_index, expected
            )));
        }
        Ok(())
    }

    /// Validate the design against every admissible task order.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_targets()?;
        for order in super::condition::TASK_ORDERS.iter() {
            for (task_index, task_type) in order.iter().enumerate() {
                self.validate_placement(task_index, *task_type)?;
            }
        }
        Ok(())
    }
}
