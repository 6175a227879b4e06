//! Trial State Machine
//!
//! Per-frame logic of a single reach:
//! - Home → target → home sub-step progression
//! - Rotated or error-clamped feedback cursor geometry
//! - Frame-level trajectory logging

pub mod feedback;
pub mod geometry;
pub mod input;
pub mod state;
pub mod trajectory;

pub use feedback::{feedback_cursor, FeedbackCursor, FeedbackMode, FeedbackParams};
pub use geometry::{LayoutParams, Point, Workspace};
pub use input::{Buttons, FrameInput, KeyPress};
pub use state::{MarkerPose, Presentation, TickOutcome, TrialResult, TrialRun, TrialStep};
pub use trajectory::{TrajectoryLog, TrajectorySample};
