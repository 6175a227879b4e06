//! # Two-Rate Adaptation
//!
//! Core of a visuomotor rotation-adaptation experiment ("two-rate" motor
//! learning paradigm). A participant moves a tracked cursor from a home
//! position to a target and back while the visual feedback is rotated by a
//! scripted, trial-indexed angle.
//!
//! ## Quick Start
//!
//! ```no_run
//! use two_rate_adaptation::schedule::{ConditionCode, ScheduleGenerator};
//!
//! let code = ConditionCode::parse_or_default("13");
//! let schedule = ScheduleGenerator::with_seed(7)
//!     .generate(code)
//!     .expect("default design is consistent");
//!
//! for task in &schedule.tasks {
//!     println!("{:?}: {} trials", task.task_type, task.len());
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`schedule`]: condition-code counterbalancing and the per-task target
//!   and rotation schedules
//! - [`trial`]: per-frame reach state machine and feedback-cursor geometry
//! - [`session`]: sequencing driver plus the collaborator traits a
//!   presentation framework implements (pointer, clock, keys, markers, sink)
//! - [`time`]: trial clocks
//! - [`app`]: CLI and configuration management
//!
//! ## Frame Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  Pointer /  │───▶│ Step + geo  │───▶│ Trajectory  │───▶│   Marker    │
//! │ key snapshot│    │ derivation  │    │    log      │    │   updates   │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                   trial end     ▼
//!                                                          ┌─────────────┐
//!                                                          │  Data sink  │
//!                                                          └─────────────┘
//! ```

pub mod time;
pub mod schedule;
pub mod trial;
pub mod session;
pub mod app;

// Re-export commonly used types
pub use schedule::{ConditionCode, Rotation, Schedule, ScheduleGenerator, TaskType};
pub use session::{SessionDriver, SessionEvent};
pub use trial::{TickOutcome, TrialRun, TrialStep};

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the experiment core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid condition code: {0}")]
    InvalidConditionCode(String),

    #[error("Schedule integrity error: {0}")]
    ScheduleIntegrity(String),

    #[error("Session cancelled by participant")]
    Cancelled,

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
