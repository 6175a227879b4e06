//! Trial Clocks
//!
//! Every routine (setup screen, instruction screen, trial, end screen) times
//! itself against a clock that is reset when the routine begins. The
//! presentation framework normally supplies this clock; the two
//! implementations here cover real-time runs and headless simulation.

use std::time::Instant;

/// Monotonic clock measured in seconds since the last reset.
pub trait TrialClock {
    /// Restart the clock at zero.
    fn reset(&mut self);

    /// Seconds elapsed since the last reset. Never decreases between resets.
    fn elapsed(&self) -> f64;
}

/// Wall-clock implementation backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    started: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialClock for MonotonicClock {
    fn reset(&mut self) {
        self.started = Instant::now();
    }

    fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to.
///
/// Used for headless runs where one tick stands in for one display refresh:
/// the runner calls [`ManualClock::advance_frame`] once per tick.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    now: f64,
    origin: f64,
    frame_period: f64,
}

impl ManualClock {
    /// Standard 60 Hz refresh period.
    pub const DEFAULT_FRAME_PERIOD: f64 = 1.0 / 60.0;

    pub fn new(frame_period: f64) -> Self {
        Self {
            now: 0.0,
            origin: 0.0,
            frame_period: frame_period.max(0.0),
        }
    }

    /// Move time forward by one frame period.
    pub fn advance_frame(&mut self) {
        self.now += self.frame_period;
    }

    /// Move time forward by an arbitrary (non-negative) amount.
    pub fn advance(&mut self, secs: f64) {
        if secs > 0.0 {
            self.now += secs;
        }
    }

    /// Seconds since construction, ignoring resets.
    pub fn absolute(&self) -> f64 {
        self.now
    }

    pub fn frame_period(&self) -> f64 {
        self.frame_period
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FRAME_PERIOD)
    }
}

impl TrialClock for ManualClock {
    fn reset(&mut self) {
        self.origin = self.now;
    }

    fn elapsed(&self) -> f64 {
        self.now - self.origin
    }
}
