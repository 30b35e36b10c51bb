//! Host scheduling seam for the run loop and the refresh timer.
//!
//! The session never waits. It asks the host for an animation-frame style
//! callback per burst and an interval for refreshes, and the host calls
//! back into [`crate::Session::on_frame`] / [`crate::Session::on_refresh`]
//! with the handle it issued.

use std::time::Duration;

/// Identifies one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FrameHandle(pub u64);

/// Identifies one repeating interval timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimerHandle(pub u64);

/// Scheduler provided by the embedding host.
pub trait HostScheduler {
    /// Requests a single callback on the next frame.
    fn request_frame(&mut self) -> FrameHandle;

    /// Cancels a requested frame. Unknown handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Starts a repeating timer with `period`.
    fn start_interval(&mut self, period: Duration) -> TimerHandle;

    /// Stops a repeating timer. Unknown handles are ignored.
    fn clear_interval(&mut self, handle: TimerHandle);
}

/// Call counters kept by [`ManualScheduler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Frames requested.
    pub frames_requested: usize,
    /// Frames cancelled while pending.
    pub frames_cancelled: usize,
    /// Intervals started.
    pub intervals_started: usize,
    /// Intervals cleared while active.
    pub intervals_cleared: usize,
}

/// Scheduler that only records requests; the host pumps them itself.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending_frame: Option<FrameHandle>,
    interval: Option<(TimerHandle, Duration)>,
    stats: SchedulerStats,
}

impl ManualScheduler {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame waiting to be delivered, if any.
    #[must_use]
    pub const fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    /// Removes and returns the pending frame for delivery.
    pub fn take_frame(&mut self) -> Option<FrameHandle> {
        self.pending_frame.take()
    }

    /// Active interval and its period.
    #[must_use]
    pub const fn interval(&self) -> Option<(TimerHandle, Duration)> {
        self.interval
    }

    /// Request/cancel counters.
    #[must_use]
    pub const fn stats(&self) -> SchedulerStats {
        self.stats
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl HostScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id());
        self.pending_frame = Some(handle);
        self.stats.frames_requested += 1;
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending_frame == Some(handle) {
            self.pending_frame = None;
            self.stats.frames_cancelled += 1;
        }
    }

    fn start_interval(&mut self, period: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id());
        self.interval = Some((handle, period));
        self.stats.intervals_started += 1;
        handle
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        if self.interval.is_some_and(|(active, _)| active == handle) {
            self.interval = None;
            self.stats.intervals_cleared += 1;
        }
    }
}
