//! Timing module
//!
//! Per-routine clocks measured in seconds since reset:
//! - Monotonic (never goes backward between resets)
//! - Wall-clock for live sessions, frame-stepped for headless runs

pub mod clock;

pub use clock::{ManualClock, MonotonicClock, TrialClock};
