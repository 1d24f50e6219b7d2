//! Injectable clock and timestamps.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic point in time measured from an arbitrary clock origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The clock origin.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Creates a timestamp lying `offset` after the clock origin.
    #[must_use]
    pub const fn from_offset(offset: Duration) -> Self {
        Self(offset)
    }

    /// Creates a timestamp from whole seconds after the clock origin.
    #[must_use]
    pub const fn from_secs(seconds: u64) -> Self {
        Self(Duration::from_secs(seconds))
    }

    /// Creates a timestamp from milliseconds after the clock origin.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Duration elapsed since the clock origin.
    #[must_use]
    pub const fn offset(self) -> Duration {
        self.0
    }

    /// Timestamp lying `delta` after this one.
    #[must_use]
    pub fn after(self, delta: Duration) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Time elapsed since `earlier`, or zero when `earlier` lies in the future.
    #[must_use]
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

/// Source of the current time.
pub trait Clock {
    /// Current reading of the clock.
    fn now(&self) -> Timestamp;
}

/// Monotonic wall clock anchored at construction time.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }
}

/// Manually advanced clock; clones share the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    /// Creates a clock that reads `start` until advanced.
    #[must_use]
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get().after(delta));
    }

    /// Jumps the clock to `at`.
    pub fn set(&self, at: Timestamp) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_reading() {
        let clock = ManualClock::default();
        let handle = clock.clone();
        handle.advance(Duration::from_millis(1_500));
        assert_eq!(clock.now(), Timestamp::from_millis(1_500));
    }

    #[test]
    fn system_clock_never_runs_backwards() {
        let clock = SystemClock::new();
        let first = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        let second = clock.now();
        assert!(second > first);
        assert!(second.saturating_since(first) >= Duration::from_millis(2));
        assert!(SystemClock::default().now() < Timestamp::from_secs(60));
    }

    #[test]
    fn saturating_since_never_goes_negative() {
        let early = Timestamp::from_secs(3);
        let late = Timestamp::from_secs(5);
        assert_eq!(late.saturating_since(early), Duration::from_secs(2));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }
}
