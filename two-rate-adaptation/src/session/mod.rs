//! Session Layer
//!
//! Everything between a schedule and a presentation framework:
//! - Collaborator traits the framework implements
//! - Routine sequencing (setup, instructions, trials, end screen)
//! - Trial records and data sinks
//! - Scripted collaborators for headless runs

pub mod collaborator;
pub mod driver;
pub mod headless;
pub mod record;

pub use collaborator::{
    Collaborators, DataSink, KeySource, Marker, PointerSource, Stimuli, TextLabel,
};
pub use driver::{apply_presentation, SessionDriver, SessionEvent, SessionSettings};
pub use headless::{
    HeadlessRig, RecordingStimuli, ScriptedKeys, ScriptedPointer, SimulationConfig,
    SimulationReport,
};
pub use record::{FieldValue, JsonLinesSink, MemorySink, SessionMetadata, TrialRecord};
