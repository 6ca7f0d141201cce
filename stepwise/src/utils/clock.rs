//! Time sources used to stamp steps and outcomes.

use super::timestamps::{now_utc, Timestamp};
use parking_lot::Mutex;
use std::fmt;

/// A source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now_utc()
    }
}

/// A clock that only moves when told to.
///
/// Used to get deterministic step durations in tests.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Creates a clock frozen at the current wall-clock time.
    #[must_use]
    pub fn starting_now() -> Self {
        Self::new(now_utc())
    }

    /// Moves the clock forward.
    pub fn advance_ms(&self, millis: u64) {
        let delta = chrono::Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX));
        let mut current = self.current.lock();
        *current += delta;
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, at: Timestamp) {
        *self.current.lock() = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_now()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::elapsed_ms;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::starting_now();
        let start = clock.now();
        clock.advance_ms(1500);
        assert_eq!(elapsed_ms(start, clock.now()), 1500);
    }

    #[test]
    fn test_manual_clock_is_frozen() {
        let clock = ManualClock::starting_now();
        assert_eq!(clock.now(), clock.now());
    }
}
