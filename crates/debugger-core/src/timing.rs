//! Run-loop time budgets and clocks.

use std::time::{Duration, Instant};

/// Wall-clock budget of one execution burst.
pub const DEFAULT_TIME_SLICE: Duration = Duration::from_millis(10);

/// Hard cap on instructions per burst, independent of the clock.
pub const DEFAULT_MAX_INSTRUCTIONS_PER_TICK: u32 = 1000;

/// Period of the observable-state refresh timer while running.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(16);

/// Monotonic time source measured from an arbitrary origin.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Starts a clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Admission check for the steps of one burst.
///
/// A step is admitted while both the elapsed time is under the slice and
/// the executed count is under the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceBudget {
    started: Duration,
    time_slice: Duration,
    max_instructions: u32,
    executed: u32,
}

impl SliceBudget {
    /// Opens a budget starting at `started`.
    #[must_use]
    pub const fn new(started: Duration, time_slice: Duration, max_instructions: u32) -> Self {
        Self {
            started,
            time_slice,
            max_instructions,
            executed: 0,
        }
    }

    /// Returns `true` when another step fits at time `now`.
    #[must_use]
    pub fn admits(&self, now: Duration) -> bool {
        self.executed < self.max_instructions
            && now.saturating_sub(self.started) < self.time_slice
    }

    /// Records one executed step.
    pub fn record_step(&mut self) {
        self.executed = self.executed.saturating_add(1);
    }

    /// Steps executed so far.
    #[must_use]
    pub const fn executed(&self) -> u32 {
        self.executed
    }
}
