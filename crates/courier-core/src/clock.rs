//! Clock abstraction for determinism.

use chrono::{DateTime, Utc};

/// Abstraction over system time so lease and backoff arithmetic can be
/// driven deterministically in tests.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Whole minutes elapsed between `since` and `now`, floored at zero.
#[must_use]
pub fn minutes_since(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_minutes().max(0)
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
