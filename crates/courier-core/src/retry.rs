//! Retry, backoff and lease policy.
//!
//! The ledger consults this policy when a failed attempt is reported and
//! when deciding whether a `PROCESSING` lease has gone stale.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::OutboxError;
use crate::event::EventStatus;

/// Attempts allowed before an event is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Largest exponent applied to the base delay; keeps the shift in range.
const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Backoff curve and lease expiry rule for the outbox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Failed attempts after which an event becomes `DEAD`.
    pub max_attempts: i32,
    /// Delay after the first failure.
    pub base_delay: TimeDelta,
    /// Upper bound for any single delay, jitter included.
    pub max_delay: TimeDelta,
    /// Fraction of the delay added as random spread, in `[0.0, 1.0]`.
    pub jitter_ratio: f64,
    /// How long a claim stays exclusive before the event may be reclaimed.
    pub lease_timeout: TimeDelta,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: TimeDelta::seconds(10),
            max_delay: TimeDelta::minutes(10),
            jitter_ratio: 0.2,
            lease_timeout: TimeDelta::minutes(15),
        }
    }
}

impl RetryPolicy {
    /// Checks that the policy is usable.
    ///
    /// # Errors
    ///
    /// Returns `OutboxError::Validation` describing the first bad field.
    pub fn validate(&self) -> Result<(), OutboxError> {
        if self.max_attempts < 1 {
            return Err(OutboxError::Validation(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.base_delay < TimeDelta::zero() {
            return Err(OutboxError::Validation(
                "base_delay must not be negative".into(),
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(OutboxError::Validation(
                "max_delay must be at least base_delay".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(OutboxError::Validation(
                "jitter_ratio must be within [0, 1]".into(),
            ));
        }
        if self.lease_timeout <= TimeDelta::zero() {
            return Err(OutboxError::Validation(
                "lease_timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Delay before an event that has now failed `attempt` times becomes
    /// claimable again: `base * 2^(attempt - 1)`, stretched by up to
    /// `jitter_ratio`, capped at `max_delay`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn backoff_delay(&self, attempt: i32, jitter_fraction: f64) -> TimeDelta {
        let exponent = u32::try_from(attempt.saturating_sub(1))
            .unwrap_or(0)
            .min(MAX_BACKOFF_EXPONENT);
        let raw_ms = self
            .base_delay
            .num_milliseconds()
            .saturating_mul(1_i64 << exponent);
        let spread = 1.0 + self.jitter_ratio * jitter_fraction.clamp(0.0, 1.0);
        let capped_ms = (raw_ms as f64 * spread).min(self.max_delay.num_milliseconds() as f64);
        TimeDelta::milliseconds(capped_ms as i64)
    }

    /// Status an event moves to once its failure count reaches
    /// `attempt_count`.
    #[must_use]
    pub fn status_after_failure(&self, attempt_count: i32) -> EventStatus {
        if attempt_count >= self.max_attempts {
            EventStatus::Dead
        } else {
            EventStatus::Retry
        }
    }

    /// Leases claimed at or before the returned instant are stale.
    #[must_use]
    pub fn lease_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.lease_timeout
    }
}
