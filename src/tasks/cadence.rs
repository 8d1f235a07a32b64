//! Drift-free periodic pacing.
//!
//! Deadlines advance by exactly one period from the previous deadline, not
//! from when the work finished, so processing jitter never accumulates.
//! When an iteration overruns a whole period the schedule resyncs to the
//! current time instead of firing a burst of catch-up ticks.

use std::time::Duration;

use log::warn;

use crate::app::ports::Timestamp;

#[derive(Debug, Clone)]
pub struct Cadence {
    name: &'static str,
    period_ms: u64,
    next_due: Timestamp,
    overruns: u32,
}

impl Cadence {
    /// First tick is due at `start`.
    pub fn new(name: &'static str, period_ms: u64, start: Timestamp) -> Self {
        Self {
            name,
            period_ms: period_ms.max(1),
            next_due: start,
            overruns: 0,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Deadline of the next tick.
    pub fn next_due(&self) -> Timestamp {
        self.next_due
    }

    /// Iterations that ran past their whole period.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Call once per iteration after the work is done.  Schedules the next
    /// tick and returns how long to sleep until it.
    pub fn next_wait(&mut self, now: Timestamp) -> Duration {
        self.next_due += self.period_ms;
        if self.next_due >= now {
            return Duration::from_millis(self.next_due - now);
        }
        self.overruns = self.overruns.wrapping_add(1);
        warn!(
            "TASK | {} overran its {} ms period by {} ms, resyncing",
            self.name,
            self.period_ms,
            now - self.next_due
        );
        self.next_due = now;
        Duration::ZERO
    }
}
