use std::time::{Duration, Instant};

/// Default tick period of the virtual clock.
pub const DEFAULT_TICK_MS: u64 = 5;

/// Transport state of the [`Clock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ClockState {
    #[default]
    Stopped,
    Playing,
}

/// Virtual time source.
///
/// Time only moves while playing and only in whole ticks, so a run of `n` ticks always lands on
/// `n * tick_interval_ms` regardless of how late the ticks were delivered.
#[derive(Clone, Debug)]
pub struct Clock {
    virtual_time_ms: u64,
    state: ClockState,
    tick_interval_ms: u64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_MS)
    }
}

impl Clock {
    /// A paused clock at time 0. A zero interval is bumped to 1ms.
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            virtual_time_ms: 0,
            state: ClockState::Stopped,
            tick_interval_ms: tick_interval_ms.max(1),
        }
    }

    pub fn play(&mut self) {
        self.state = ClockState::Playing;
    }

    pub fn pause(&mut self) {
        self.state = ClockState::Stopped;
    }

    /// Absolute set, valid while playing or stopped.
    pub fn seek(&mut self, ms: u64) {
        self.virtual_time_ms = ms;
    }

    pub fn elapsed(&self) -> u64 {
        self.virtual_time_ms
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ClockState::Playing
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// One timer tick. Advances by exactly one interval while playing.
    pub fn tick(&mut self) {
        if self.state == ClockState::Playing {
            self.virtual_time_ms = self.virtual_time_ms.saturating_add(self.tick_interval_ms);
        }
    }
}

/// Fixed-period wall-clock timer.
///
/// Fires at most once per poll. A late poll does not queue up the missed periods: the next
/// deadline is rescheduled from the moment it fired.
#[derive(Clone, Debug)]
pub struct Interval {
    period: Duration,
    next_due: Option<Instant>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// `true` when the timer fires at `now`. The first poll always fires.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now + self.period);
                true
            }
        }
    }

    /// Time left until the next deadline, zero if already due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
#[path = "../tests/unit/clock.rs"]
mod tests;
