//! Event ledger contract.
//!
//! The ledger is the only shared mutable resource in the system. Every
//! mutation of an event goes through one of the operations below, each of
//! which must be atomic with respect to the others.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OutboxError;
use crate::event::{EventStatus, NewEvent, OutboxEvent};

/// Number of events in each status plus the staleness of the backlog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Events never claimed.
    pub pending: i64,
    /// Events currently leased.
    pub processing: i64,
    /// Events waiting out a backoff window.
    pub retry: i64,
    /// Delivered events.
    pub sent: i64,
    /// Dead-lettered events.
    pub dead: i64,
    /// Age in minutes of the oldest `PENDING` or `RETRY` event; 0 when none.
    pub oldest_pending_minutes: i64,
}

/// Append-only store of outbox events with an atomic claim/lease protocol.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Appends a new `PENDING` event. Producers never update or delete.
    async fn enqueue(&self, event: NewEvent) -> Result<OutboxEvent, OutboxError>;

    /// Atomically leases up to `batch_size` eligible events to `worker_id`.
    ///
    /// Eligible means `PENDING`, `RETRY` whose backoff window has elapsed, or
    /// `PROCESSING` whose lease has expired. Concurrent callers never receive
    /// the same event.
    async fn claim(
        &self,
        batch_size: u32,
        worker_id: &str,
    ) -> Result<Vec<OutboxEvent>, OutboxError>;

    /// Records the outcome of a processing attempt and returns the new status.
    ///
    /// `ok` moves the event to `SENT`. A failure increments `attempt_count`
    /// and moves the event to `RETRY`, or to `DEAD` once the maximum is
    /// reached.
    ///
    /// # Errors
    ///
    /// `EventNotFound` for an unknown id, `InvalidTransition` if the event is
    /// not `PROCESSING`.
    async fn report_result(
        &self,
        event_id: Uuid,
        ok: bool,
        error: Option<&str>,
    ) -> Result<EventStatus, OutboxError>;

    /// Moves a `PROCESSING` event straight to `DEAD`, raising its
    /// `attempt_count` to the maximum.
    async fn dead_letter(&self, event_id: Uuid, error: &str) -> Result<EventStatus, OutboxError>;

    /// Returns a snapshot of one event.
    async fn get(&self, event_id: Uuid) -> Result<OutboxEvent, OutboxError>;

    /// Appends a fresh `PENDING` copy of a `DEAD` event, linked through
    /// `replay_of`. The dead event itself is left as it is.
    async fn replay(&self, event_id: Uuid) -> Result<OutboxEvent, OutboxError>;

    /// Counts events by status as of `now`.
    async fn status_counts(&self, now: DateTime<Utc>) -> Result<StatusCounts, OutboxError>;
}
