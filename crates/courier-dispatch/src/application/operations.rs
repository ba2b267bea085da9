//! Operator-facing operations on the outbox.
//!
//! Producers enqueue through here; operators inspect events, replay dead
//! ones and watch the backlog.

use courier_core::clock::Clock;
use courier_core::error::OutboxError;
use courier_core::event::{EventKind, NewEvent, OutboxEvent};
use courier_core::ledger::EventLedger;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Backlog age, in minutes, at which the outbox is considered stale.
pub const STALE_AFTER_MINUTES: i64 = 30;

/// Backlog health as shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboxStats {
    /// Events never claimed.
    pub pending: i64,
    /// Events waiting out a backoff window.
    pub retry: i64,
    /// Events currently leased.
    pub processing: i64,
    /// Delivered events.
    pub sent: i64,
    /// Dead-lettered events.
    pub failed: i64,
    /// Age of the oldest undelivered event.
    pub oldest_pending_minutes: i64,
    /// True once the backlog age reaches the alert threshold.
    pub stale: bool,
    /// The alert threshold, in minutes.
    pub stale_threshold_minutes: i64,
}

/// Appends an event on behalf of a producer.
///
/// # Errors
///
/// Returns `OutboxError::Validation` for an empty kind or nil tenant, and
/// any ledger error.
pub async fn enqueue_event(
    ledger: &dyn EventLedger,
    event: NewEvent,
) -> Result<OutboxEvent, OutboxError> {
    if event.kind.as_str().trim().is_empty() {
        return Err(OutboxError::Validation("kind must not be empty".into()));
    }
    if event.tenant_id.is_nil() {
        return Err(OutboxError::Validation("tenant_id must not be nil".into()));
    }
    if let EventKind::Unrecognized(kind) = &event.kind {
        // Accepted: the dispatcher fails it visibly.
        info!(%kind, "enqueueing event of unrecognized kind");
    }
    let stored = ledger.enqueue(event).await?;
    info!(event_id = %stored.id, kind = %stored.kind, tenant_id = %stored.tenant_id, "outbox event enqueued");
    Ok(stored)
}

/// Returns one event for inspection.
///
/// # Errors
///
/// Returns `OutboxError::EventNotFound` for an unknown id.
pub async fn get_event(ledger: &dyn EventLedger, event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
    ledger.get(event_id).await
}

/// Re-enqueues a dead event as a new event linked to the original.
///
/// # Errors
///
/// Returns `OutboxError::EventNotFound` for an unknown id and
/// `OutboxError::InvalidTransition` if the event is not `DEAD`.
pub async fn replay_dead_event(
    ledger: &dyn EventLedger,
    event_id: Uuid,
) -> Result<OutboxEvent, OutboxError> {
    let replayed = ledger.replay(event_id).await?;
    info!(source_event_id = %event_id, event_id = %replayed.id, "dead outbox event replayed");
    Ok(replayed)
}

/// Recomputes backlog counts and staleness.
///
/// # Errors
///
/// Returns any ledger error.
pub async fn outbox_stats(
    ledger: &dyn EventLedger,
    clock: &dyn Clock,
) -> Result<OutboxStats, OutboxError> {
    let counts = ledger.status_counts(clock.now()).await?;
    Ok(OutboxStats {
        pending: counts.pending,
        retry: counts.retry,
        processing: counts.processing,
        sent: counts.sent,
        failed: counts.dead,
        oldest_pending_minutes: counts.oldest_pending_minutes,
        stale: counts.oldest_pending_minutes >= STALE_AFTER_MINUTES,
        stale_threshold_minutes: STALE_AFTER_MINUTES,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone, Utc};
    use courier_core::event::EventStatus;
    use courier_test_support::{FailingEventLedger, InMemoryEventLedger, ManualClock};

    use super::*;

    fn setup() -> (Arc<ManualClock>, InMemoryEventLedger) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        ));
        let ledger = InMemoryEventLedger::new(clock.clone());
        (clock, ledger)
    }

    fn new_event(kind: &str) -> NewEvent {
        NewEvent {
            kind: EventKind::from(kind),
            payload: serde_json::json!({}),
            tenant_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_appends_pending_event() {
        let (_clock, ledger) = setup();

        let stored = enqueue_event(&ledger, new_event("EMAIL_SEND")).await.unwrap();

        assert_eq!(stored.status, EventStatus::Pending);
        assert_eq!(stored.attempt_count, 0);
        assert_eq!(ledger.events().len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_nil_tenant_and_blank_kind() {
        let (_clock, ledger) = setup();
        let mut nil_tenant = new_event("EMAIL_SEND");
        nil_tenant.tenant_id = Uuid::nil();

        let nil_result = enqueue_event(&ledger, nil_tenant).await;
        let blank_result = enqueue_event(&ledger, new_event(" ")).await;

        assert!(matches!(nil_result, Err(OutboxError::Validation(_))));
        assert!(matches!(blank_result, Err(OutboxError::Validation(_))));
        assert!(ledger.events().is_empty());
    }

    #[tokio::test]
    async fn test_get_event_not_found() {
        let (_clock, ledger) = setup();
        let id = Uuid::new_v4();

        match get_event(&ledger, id).await {
            Err(OutboxError::EventNotFound(missing)) => assert_eq!(missing, id),
            other => panic!("expected EventNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stats_flags_stale_backlog() {
        // Arrange
        let (clock, ledger) = setup();
        enqueue_event(&ledger, new_event("EMAIL_SEND")).await.unwrap();
        enqueue_event(&ledger, new_event("MESSAGE_SEND")).await.unwrap();

        // Act
        clock.advance(TimeDelta::minutes(29));
        let fresh = outbox_stats(&ledger, clock.as_ref()).await.unwrap();
        clock.advance(TimeDelta::minutes(1));
        let stale = outbox_stats(&ledger, clock.as_ref()).await.unwrap();

        // Assert
        assert_eq!(fresh.pending, 2);
        assert_eq!(fresh.oldest_pending_minutes, 29);
        assert!(!fresh.stale);
        assert_eq!(stale.oldest_pending_minutes, 30);
        assert!(stale.stale);
        assert_eq!(stale.stale_threshold_minutes, 30);
    }

    #[tokio::test]
    async fn test_replay_of_dead_event_links_back() {
        // Arrange
        let (clock, ledger) = setup();
        let source = enqueue_event(&ledger, new_event("EMAIL_SEND")).await.unwrap();
        ledger.claim(1, "worker-a").await.unwrap();
        ledger.dead_letter(source.id, "bad template").await.unwrap();

        // Act
        let replayed = replay_dead_event(&ledger, source.id).await.unwrap();

        // Assert
        assert_eq!(replayed.replay_of, Some(source.id));
        assert_eq!(replayed.kind, source.kind);
        assert_eq!(replayed.tenant_id, source.tenant_id);
        let stats = outbox_stats(&ledger, clock.as_ref()).await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test]
    async fn test_stats_propagates_ledger_failure() {
        let (clock, _ledger) = setup();

        let result = outbox_stats(&FailingEventLedger, clock.as_ref()).await;

        assert!(matches!(result, Err(OutboxError::Infrastructure(_))));
    }
}
