//! Condition Generator
//!
//! Maps a numeric condition code to the counterbalanced task order, rotation
//! signs, per-task target-angle sequences and per-task rotation sequences.

pub mod condition;
pub mod design;
pub mod generator;
pub mod rotation;
pub mod task_type;

pub use condition::{ConditionCode, Counterbalance, RotationSign, TaskOrder, CONDITION_CELLS};
pub use design::{ExperimentDesign, PhasePlans};
pub use generator::{generate_schedule, Schedule, ScheduleGenerator, TaskSchedule, Trial};
pub use rotation::Rotation;
pub use task_type::{PhasePlan, RampOverride, TaskType};
