//! Periodic activity timers for the cooperative loop

use embassy_time::{Duration, Instant};

/// Deadline based timer for one periodic activity
///
/// Deadlines advance by whole periods so a slow iteration does not shift the phase of
/// later ticks. When the loop falls behind by more than a period the timer resynchronises
/// to `now` instead of firing a burst of catch-up ticks.
#[derive(Debug, Clone, Copy)]
pub struct Periodic {
    period: Duration,
    next: Option<Instant>,
}

impl Periodic {
    pub const fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// Returns true once per elapsed period. The first call is always due.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now < next => false,
            Some(next) => {
                let following = next + self.period;
                self.next = Some(if following <= now { now + self.period } else { following });
                true
            }
            None => {
                self.next = Some(now + self.period);
                true
            }
        }
    }

    /// Restarts the timer so the next call is due immediately
    pub fn reset(&mut self) {
        self.next = None;
    }
}

/// Timers of every activity the controller polls
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub buttons: Periodic,
    pub indicator: Periodic,
    pub sampler: Periodic,
    pub display: Periodic,
    pub health: Periodic,
}
