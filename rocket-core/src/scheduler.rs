//! Tick pacing for the flight loop.
//!
//! The loop polls a monotonic clock and runs a tick once the period of the
//! current phase has elapsed since the previous one. The period can change
//! between ticks, so the schedule is re-evaluated on every poll instead of
//! being fixed up front like a ticker.

use embassy_time::Duration;

/// Lateness tolerated before a tick counts as an overrun.
pub const OVERRUN_GRACE: Duration = Duration::from_micros(500);

/// Monotonic time source of the flight loop.
pub trait Clock {
    /// Time since an arbitrary fixed epoch.
    fn now(&mut self) -> Duration;

    /// Called when a poll found no tick due.
    fn idle(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pacer {
    last_tick: Option<Duration>,
}

impl Pacer {
    pub const fn new() -> Self {
        Self { last_tick: None }
    }

    /// Returns the time since the previous tick when a tick is due at `now`.
    ///
    /// The first poll is always due and reports `period` as its elapsed time.
    pub fn poll(&mut self, now: Duration, period: Duration) -> Option<Duration> {
        let elapsed = match self.last_tick {
            None => period,
            Some(last) => now.checked_sub(last)?,
        };
        if elapsed < period {
            return None;
        }
        self.last_tick = Some(now);
        Some(elapsed)
    }

    /// How late a tick that took `elapsed` is, if it exceeds the grace.
    pub fn overrun(elapsed: Duration, period: Duration) -> Option<Duration> {
        if elapsed > period + OVERRUN_GRACE {
            Some(elapsed - period)
        } else {
            None
        }
    }

    pub fn last_tick(&self) -> Option<Duration> {
        self.last_tick
    }
}
