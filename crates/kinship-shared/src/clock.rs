//! Time source for newly created content.

use std::cell::Cell;

use crate::timestamp::Timestamp;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Returns `start`, then advances by `step_seconds` on every call.
///
/// Handy in tests that need strictly increasing timestamps.
#[derive(Debug, Clone)]
pub struct SteppingClock {
    next: Cell<Timestamp>,
    step_seconds: i64,
}

impl SteppingClock {
    pub fn new(start: Timestamp, step_seconds: i64) -> Self {
        Self {
            next: Cell::new(start),
            step_seconds,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let current = self.next.get();
        // An invalid start stays pinned rather than wrapping.
        if let Some(advanced) = current.checked_add_seconds(self.step_seconds) {
            self.next.set(advanced);
        }
        current
    }
}
