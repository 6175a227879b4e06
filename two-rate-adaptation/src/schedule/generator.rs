//! Schedule Generation
//!
//! Turns a condition code into the complete trial list of a session. The
//! counterbalancing and rotation sequences are a pure function of the code;
//! only the order of target angles inside each block is random.

use super::condition::{ConditionCode, Counterbalance, RotationSign, TaskOrder};
use super::design::ExperimentDesign;
use super::rotation::Rotation;
use super::task_type::TaskType;
use crate::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// One scheduled reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub task_index: usize,
    pub trial_index: usize,
    pub task_type: TaskType,
    pub target_angle_deg: f64,
    pub rotation: Rotation,
}

/// Sequences for one task position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSchedule {
    pub task_index: usize,
    pub task_type: TaskType,
    /// Sign multiplier applied to this task's rotations
    pub sign: f64,
    /// Target angle per trial (degrees), shuffled within blocks
    pub target_angles: Vec<f64>,
    /// Rotation per trial
    pub rotations: Vec<Rotation>,
}

impl TaskSchedule {
    pub fn len(&self) -> usize {
        self.target_angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target_angles.is_empty()
    }

    pub fn trial(&self, trial_index: usize) -> Option<Trial> {
        let target_angle_deg = *self.target_angles.get(trial_index)?;
        let rotation = *self.rotations.get(trial_index)?;
        Some(Trial {
            task_index: self.task_index,
            trial_index,
            task_type: self.task_type,
            target_angle_deg,
            rotation,
        })
    }

    pub fn trials(&self) -> impl Iterator<Item = Trial> + '_ {
        (0..self.len()).filter_map(move |i| self.trial(i))
    }
}

/// Full session schedule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub counterbalance: Counterbalance,
    pub tasks: Vec<TaskSchedule>,
}

impl Schedule {
    pub fn code(&self) -> ConditionCode {
        self.counterbalance.code
    }

    pub fn order(&self) -> TaskOrder {
        self.counterbalance.order
    }

    pub fn sign(&self) -> RotationSign {
        self.counterbalance.sign
    }

    pub fn task(&self, task_index: usize) -> Option<&TaskSchedule> {
        self.tasks.get(task_index)
    }

    pub fn trial(&self, task_index: usize, trial_index: usize) -> Option<Trial> {
        self.task(task_index)?.trial(trial_index)
    }

    pub fn total_trials(&self) -> usize {
        self.tasks.iter().map(TaskSchedule::len).sum()
    }

    /// Target-angle sequences of all tasks.
    pub fn target_angles(&self) -> Vec<&[f64]> {
        self.tasks.iter().map(|t| t.target_angles.as_slice()).collect()
    }

    /// Rotation sequences of all tasks, `NaN` for clamped trials.
    pub fn rotations_deg(&self) -> Vec<Vec<f64>> {
        self.tasks
            .iter()
            .map(|t| t.rotations.iter().map(Rotation::degrees).collect())
            .collect()
    }

    /// All trials in presentation order.
    pub fn iter(&self) -> impl Iterator<Item = Trial> + '_ {
        self.tasks.iter().flat_map(TaskSchedule::trials)
    }
}

/// Builds schedules from a validated design.
pub struct ScheduleGenerator {
    design: ExperimentDesign,
    rng: StdRng,
}

impl ScheduleGenerator {
    /// Generator over the default design with an entropy-seeded shuffle.
    pub fn new() -> Self {
        Self::with_design(ExperimentDesign::default(), StdRng::from_entropy())
    }

    /// Generator whose block shuffles are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_design(ExperimentDesign::default(), StdRng::seed_from_u64(seed))
    }

    pub fn with_design(design: ExperimentDesign, rng: StdRng) -> Self {
        Self { design, rng }
    }

    pub fn design(&self) -> &ExperimentDesign {
        &self.design
    }

    /// Build the schedule for `code`.
    ///
    /// The whole design is validated first; an inconsistent table fails the
    /// call without producing a partial schedule.
    pub fn generate(&mut self, code: ConditionCode) -> Result<Schedule> {
        self.design.validate()?;

        let counterbalance = code.counterbalance();
        let mut tasks = Vec::with_capacity(counterbalance.order.0.len());

        for (task_index, task_type) in counterbalance.order.iter().enumerate() {
            let sign = if task_type.is_signed() {
                counterbalance.sign.for_task(task_index)
            } else {
                1.0
            };
            let target_angles = self.shuffled_targets(counterbalance.target_choice, task_index);
            let rotations = self.design.phase_plans.get(task_type).expand(sign);

            tasks.push(TaskSchedule {
                task_index,
                task_type,
                sign,
                target_angles,
                rotations,
            });
        }

        let schedule = Schedule {
            counterbalance,
            tasks,
        };

        tracing::info!(
            code = code.value(),
            order = ?schedule.order().ids(),
            sign = ?schedule.sign().as_pair(),
            total_trials = schedule.total_trials(),
            "Schedule generated"
        );
        tracing::debug!(rotations = ?schedule.rotations_deg(), "Rotation schedule");
        tracing::debug!(targets = ?schedule.target_angles(), "Target schedule");

        Ok(schedule)
    }

    /// Repeat the task's target set once per block, shuffling each block
    /// independently.
    fn shuffled_targets(&mut self, target_choice: usize, task_index: usize) -> Vec<f64> {
        let set = self.design.target_set(target_choice, task_index).to_vec();
        let blocks = self.design.blocks(target_choice, task_index);
        let mut angles = Vec::with_capacity(set.len() * blocks);
        for _ in 0..blocks {
            let mut block = set.clone();
            block.shuffle(&mut self.rng);
            angles.extend(block);
        }
        angles
    }
}

impl Default for ScheduleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a schedule for `code` with the default design and a fresh shuffle.
pub fn generate_schedule(code: ConditionCode) -> Result<Schedule> {
    ScheduleGenerator::new().generate(code)
}
