//! The dispatch loop.
//!
//! One invocation claims a batch, runs each event's handler in turn, reports
//! the outcome to the ledger and writes one audit record per attempt. A
//! failing event never stops the rest of the batch.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use courier_core::audit::{AuditAction, AuditRecord, AuditSink, OUTBOX_AUDIT_ENTITY};
use courier_core::clock::Clock;
use courier_core::error::OutboxError;
use courier_core::event::{EventStatus, OutboxEvent};
use courier_core::ledger::EventLedger;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::handler::HandlerError;
use crate::domain::registry::HandlerRegistry;

/// What to do with an event whose kind has no registered handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKindPolicy {
    /// Treat like any other failure: retry until the attempt limit.
    #[default]
    Retry,
    /// Dead-letter on the first attempt.
    DeadLetter,
}

impl FromStr for UnknownKindPolicy {
    type Err = OutboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retry" => Ok(Self::Retry),
            "dead_letter" => Ok(Self::DeadLetter),
            other => Err(OutboxError::Validation(format!(
                "unknown kind policy must be retry or dead_letter, got {other}"
            ))),
        }
    }
}

/// Tunables for the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Batch size used when the caller does not pass one.
    pub default_batch_size: u32,
    /// Upper bound applied to any requested batch size.
    pub max_batch_size: u32,
    /// Bound on a single handler call; `None` waits forever.
    pub handler_timeout: Option<Duration>,
    /// Treatment of events no handler is registered for.
    pub unknown_kind_policy: UnknownKindPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_batch_size: 25,
            max_batch_size: 100,
            handler_timeout: Some(Duration::from_secs(30)),
            unknown_kind_policy: UnknownKindPolicy::Retry,
        }
    }
}

/// Outcome of one event within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResult {
    /// The event.
    pub id: Uuid,
    /// Its kind, as stored.
    pub kind: String,
    /// True when the handler succeeded and the ledger recorded it.
    pub ok: bool,
    /// Status after this attempt.
    pub status: EventStatus,
    /// Handler or ledger error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Always true once the loop has run; failures are per event.
    pub ok: bool,
    /// Lease identity used for this invocation.
    pub worker_id: String,
    /// Number of events claimed.
    pub claimed: usize,
    /// One entry per claimed event, in processing order.
    pub results: Vec<EventResult>,
}

/// Runs claimed events through their handlers.
pub struct Dispatcher {
    ledger: Arc<dyn EventLedger>,
    audit: Arc<dyn AuditSink>,
    registry: HandlerRegistry,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Wires a dispatcher from its collaborators.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn EventLedger>,
        audit: Arc<dyn AuditSink>,
        registry: HandlerRegistry,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            ledger,
            audit,
            registry,
            clock,
            config,
        }
    }

    /// Applies the default and the upper bound to a requested batch size.
    ///
    /// # Errors
    ///
    /// Returns `OutboxError::Validation` for a batch size of zero.
    pub fn resolve_batch_size(&self, requested: Option<u32>) -> Result<u32, OutboxError> {
        match requested {
            Some(0) => Err(OutboxError::Validation(
                "batch_size must be at least 1".into(),
            )),
            Some(n) => Ok(n.min(self.config.max_batch_size)),
            None => Ok(self.config.default_batch_size.min(self.config.max_batch_size)),
        }
    }

    /// Runs one dispatch cycle under a fresh worker identity.
    ///
    /// # Errors
    ///
    /// Returns `OutboxError::Validation` for a zero batch size and whatever
    /// the ledger returns if the claim itself fails. Handler, report and
    /// audit failures never surface here.
    #[instrument(skip(self), fields(worker_id = tracing::field::Empty))]
    pub async fn run_batch(&self, batch_size: Option<u32>) -> Result<DispatchSummary, OutboxError> {
        let batch_size = self.resolve_batch_size(batch_size)?;
        let worker_id = format!("dispatch-{}", Uuid::now_v7());
        tracing::Span::current().record("worker_id", worker_id.as_str());

        let events = self.ledger.claim(batch_size, &worker_id).await?;
        let claimed = events.len();
        debug!(batch_size, claimed, "claimed outbox events");

        let mut results = Vec::with_capacity(claimed);
        for event in events {
            results.push(self.process_event(&worker_id, event).await);
        }

        let failed = results.iter().filter(|r| !r.ok).count();
        if claimed > 0 {
            info!(claimed, failed, "dispatch batch finished");
        }

        Ok(DispatchSummary {
            ok: true,
            worker_id,
            claimed,
            results,
        })
    }

    async fn execute(&self, event: &OutboxEvent) -> Result<(), HandlerError> {
        let handler = self.registry.lookup(&event.kind)?;
        match self.config.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, handler.handle(event))
                .await
                .map_err(|_| HandlerError::Timeout(limit))?,
            None => handler.handle(event).await,
        }
    }

    async fn report(&self, event: &OutboxEvent, outcome: Option<&HandlerError>) -> Result<EventStatus, OutboxError> {
        match outcome {
            None => self.ledger.report_result(event.id, true, None).await,
            Some(err @ HandlerError::NoHandler { .. })
                if self.config.unknown_kind_policy == UnknownKindPolicy::DeadLetter =>
            {
                self.ledger.dead_letter(event.id, &err.to_string()).await
            }
            Some(err) => {
                self.ledger
                    .report_result(event.id, false, Some(&err.to_string()))
                    .await
            }
        }
    }

    async fn process_event(&self, worker_id: &str, event: OutboxEvent) -> EventResult {
        let handler_error = self.execute(&event).await.err();
        let error_text = handler_error.as_ref().map(ToString::to_string);

        let (status, report_error) = match self.report(&event, handler_error.as_ref()).await {
            Ok(status) => (status, None),
            Err(e) => {
                error!(event_id = %event.id, error = %e, "failed to report outcome to ledger");
                (event.status, Some(format!("report failed: {e}")))
            }
        };

        match (&handler_error, status) {
            (None, _) => debug!(event_id = %event.id, kind = %event.kind, "outbox event sent"),
            (Some(err), EventStatus::Dead) => error!(
                event_id = %event.id,
                kind = %event.kind,
                tenant_id = %event.tenant_id,
                error = %err,
                "outbox event dead-lettered"
            ),
            (Some(err), _) => warn!(
                event_id = %event.id,
                kind = %event.kind,
                attempt = event.attempt_count + 1,
                permanent = err.is_permanent(),
                error = %err,
                "outbox event failed"
            ),
        }

        let error = error_text.or(report_error);
        self.record_audit(worker_id, &event, status, error.as_deref())
            .await;

        EventResult {
            id: event.id,
            kind: event.kind.to_string(),
            ok: error.is_none(),
            status,
            error,
        }
    }

    /// Writes the attempt's audit record. Any error, from the handler or from
    /// reporting, makes it an `OUTBOX_FAILED` record.
    async fn record_audit(
        &self,
        worker_id: &str,
        event: &OutboxEvent,
        status: EventStatus,
        error: Option<&str>,
    ) {
        let action = if error.is_none() {
            AuditAction::OutboxSent
        } else {
            AuditAction::OutboxFailed
        };
        let mut metadata = serde_json::json!({
            "kind": event.kind.as_str(),
            "tenant_id": event.tenant_id,
            "worker_id": worker_id,
            "attempt": event.attempt_count + 1,
            "status": status,
        });
        if let Some(error) = error {
            metadata["error"] = serde_json::Value::from(error);
        }

        let record = AuditRecord {
            action,
            entity: OUTBOX_AUDIT_ENTITY.to_owned(),
            entity_id: event.id,
            metadata,
            created_at: self.clock.now(),
        };
        if let Err(e) = self.audit.create_audit(record).await {
            warn!(event_id = %event.id, error = %e, "failed to write audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use courier_core::event::{EventKind, NewEvent};
    use courier_test_support::{
        FailingAuditSink, FailingEventLedger, InMemoryEventLedger, ManualClock,
        RecordingAuditSink, RecordingEmailGateway,
    };

    use super::*;
    use crate::domain::handler::Handler;
    use crate::handlers::EmailSendHandler;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    /// Records every event it sees and fails the ones listed in `fail`.
    #[derive(Default)]
    struct ScriptedHandler {
        fail: HashSet<Uuid>,
        seen: Mutex<Vec<Uuid>>,
    }

    impl ScriptedHandler {
        fn failing(ids: impl IntoIterator<Item = Uuid>) -> Self {
            Self {
                fail: ids.into_iter().collect(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<Uuid> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Handler for ScriptedHandler {
        async fn handle(&self, event: &OutboxEvent) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(event.id);
            if self.fail.contains(&event.id) {
                return Err(HandlerError::InvalidPayload("scripted failure".into()));
            }
            Ok(())
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl Handler for SlowHandler {
        async fn handle(&self, _event: &OutboxEvent) -> Result<(), HandlerError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    /// Delegates to an in-memory ledger but loses every outcome report.
    struct UnreportableLedger(Arc<InMemoryEventLedger>);

    #[async_trait]
    impl EventLedger for UnreportableLedger {
        async fn enqueue(&self, event: NewEvent) -> Result<OutboxEvent, OutboxError> {
            self.0.enqueue(event).await
        }

        async fn claim(
            &self,
            batch_size: u32,
            worker_id: &str,
        ) -> Result<Vec<OutboxEvent>, OutboxError> {
            self.0.claim(batch_size, worker_id).await
        }

        async fn report_result(
            &self,
            _event_id: Uuid,
            _ok: bool,
            _error: Option<&str>,
        ) -> Result<EventStatus, OutboxError> {
            Err(OutboxError::Infrastructure("connection reset".into()))
        }

        async fn dead_letter(
            &self,
            event_id: Uuid,
            error: &str,
        ) -> Result<EventStatus, OutboxError> {
            self.0.dead_letter(event_id, error).await
        }

        async fn get(&self, event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
            self.0.get(event_id).await
        }

        async fn replay(&self, event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
            self.0.replay(event_id).await
        }

        async fn status_counts(
            &self,
            now: DateTime<Utc>,
        ) -> Result<courier_core::ledger::StatusCounts, OutboxError> {
            self.0.status_counts(now).await
        }
    }

    struct Harness {
        clock: Arc<ManualClock>,
        ledger: Arc<InMemoryEventLedger>,
        audit: Arc<RecordingAuditSink>,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(start()));
            Self {
                ledger: Arc::new(InMemoryEventLedger::new(clock.clone())),
                audit: Arc::new(RecordingAuditSink::new()),
                clock,
            }
        }

        fn dispatcher(&self, registry: HandlerRegistry, config: DispatchConfig) -> Dispatcher {
            Dispatcher::new(
                self.ledger.clone(),
                self.audit.clone(),
                registry,
                self.clock.clone(),
                config,
            )
        }

        async fn enqueue(&self, kind: &str, payload: serde_json::Value) -> OutboxEvent {
            let event = self
                .ledger
                .enqueue(NewEvent {
                    kind: EventKind::from(kind),
                    payload,
                    tenant_id: Uuid::new_v4(),
                })
                .await
                .unwrap();
            // Distinct creation times keep claim order deterministic.
            self.clock.advance(TimeDelta::seconds(1));
            event
        }
    }

    fn registry_with(kind: EventKind, handler: Arc<dyn Handler>) -> HandlerRegistry {
        HandlerRegistry::builder().register(kind, handler).build()
    }

    #[tokio::test]
    async fn test_email_event_is_sent_with_single_audit_record() {
        // Arrange
        let h = Harness::new();
        let gateway = Arc::new(RecordingEmailGateway::new());
        let registry = registry_with(
            EventKind::EmailSend,
            Arc::new(EmailSendHandler::new(gateway.clone())),
        );
        let dispatcher = h.dispatcher(registry, DispatchConfig::default());
        let event = h
            .enqueue(
                "EMAIL_SEND",
                serde_json::json!({
                    "to": ["office@example.org"],
                    "subject": "Document issued",
                    "text_body": "Your bonafide certificate is ready."
                }),
            )
            .await;

        // Act
        let summary = dispatcher.run_batch(Some(1)).await.unwrap();

        // Assert
        assert!(summary.ok);
        assert_eq!(summary.claimed, 1);
        assert_eq!(summary.results[0].id, event.id);
        assert!(summary.results[0].ok);
        assert_eq!(summary.results[0].status, EventStatus::Sent);
        assert_eq!(summary.results[0].error, None);
        assert_eq!(h.ledger.get(event.id).await.unwrap().status, EventStatus::Sent);
        assert_eq!(gateway.sent().len(), 1);

        let records = h.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::OutboxSent);
        assert_eq!(records[0].entity, "outbox_event");
        assert_eq!(records[0].entity_id, event.id);
        assert_eq!(records[0].metadata["kind"], "EMAIL_SEND");
        assert_eq!(records[0].metadata["tenant_id"], event.tenant_id.to_string());
    }

    #[tokio::test]
    async fn test_unknown_kind_retries_until_dead() {
        // Arrange
        let h = Harness::new();
        let dispatcher = h.dispatcher(HandlerRegistry::default(), DispatchConfig::default());
        let event = h.enqueue("UNKNOWN_TYPE", serde_json::json!({})).await;

        // Act + Assert
        for invocation in 1..=5 {
            let summary = dispatcher.run_batch(None).await.unwrap();
            assert!(summary.ok);
            assert_eq!(summary.claimed, 1, "invocation {invocation}");

            let result = &summary.results[0];
            assert!(!result.ok);
            assert!(
                result
                    .error
                    .as_deref()
                    .unwrap()
                    .contains("no handler registered")
            );
            let expected = if invocation < 5 {
                EventStatus::Retry
            } else {
                EventStatus::Dead
            };
            assert_eq!(result.status, expected);

            h.clock.advance(TimeDelta::hours(1));
        }

        let stored = h.ledger.get(event.id).await.unwrap();
        assert_eq!(stored.status, EventStatus::Dead);
        assert_eq!(stored.attempt_count, 5);
        assert_eq!(
            stored.last_error.as_deref(),
            Some("no handler registered for kind UNKNOWN_TYPE")
        );
        assert_eq!(
            h.audit
                .records_for(event.id, AuditAction::OutboxFailed)
                .len(),
            5
        );
        assert_eq!(dispatcher.run_batch(None).await.unwrap().claimed, 0);
    }

    #[tokio::test]
    async fn test_failing_event_does_not_stop_the_batch() {
        // Arrange
        let h = Harness::new();
        let mut events = Vec::new();
        for _ in 0..5 {
            events.push(h.enqueue("EMAIL_SEND", serde_json::json!({})).await);
        }
        let handler = Arc::new(ScriptedHandler::failing([events[2].id]));
        let dispatcher = h.dispatcher(
            registry_with(EventKind::EmailSend, handler.clone()),
            DispatchConfig::default(),
        );

        // Act
        let summary = dispatcher.run_batch(Some(5)).await.unwrap();

        // Assert
        let all_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        assert_eq!(handler.seen(), all_ids);
        assert_eq!(summary.claimed, 5);

        let statuses: Vec<EventStatus> = summary.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                EventStatus::Sent,
                EventStatus::Sent,
                EventStatus::Retry,
                EventStatus::Sent,
                EventStatus::Sent,
            ]
        );
        assert_eq!(h.audit.records().len(), 5);
    }

    #[tokio::test]
    async fn test_failure_at_attempt_limit_dead_letters() {
        // Arrange
        let h = Harness::new();
        let mut veteran = OutboxEvent::pending(
            Uuid::new_v4(),
            NewEvent {
                kind: EventKind::EmailSend,
                payload: serde_json::json!({}),
                tenant_id: Uuid::new_v4(),
            },
            start() - TimeDelta::hours(1),
        );
        veteran.status = EventStatus::Retry;
        veteran.attempt_count = 4;
        veteran.next_attempt_at = Some(start());
        h.ledger.seed(veteran.clone());
        let handler = Arc::new(ScriptedHandler::failing([veteran.id]));
        let dispatcher = h.dispatcher(
            registry_with(EventKind::EmailSend, handler),
            DispatchConfig::default(),
        );

        // Act
        let summary = dispatcher.run_batch(None).await.unwrap();

        // Assert
        assert_eq!(summary.results[0].status, EventStatus::Dead);
        let stored = h.ledger.get(veteran.id).await.unwrap();
        assert_eq!(stored.status, EventStatus::Dead);
        assert_eq!(stored.attempt_count, 5);
    }

    #[tokio::test]
    async fn test_attempt_count_never_exceeds_limit() {
        // Arrange
        let h = Harness::new();
        let event = h.enqueue("EMAIL_SEND", serde_json::json!({})).await;
        let handler = Arc::new(ScriptedHandler::failing([event.id]));
        let dispatcher = h.dispatcher(
            registry_with(EventKind::EmailSend, handler.clone()),
            DispatchConfig::default(),
        );

        // Act
        for _ in 0..10 {
            dispatcher.run_batch(None).await.unwrap();
            let stored = h.ledger.get(event.id).await.unwrap();
            assert!(stored.attempt_count <= 5);
            assert_eq!(
                stored.status == EventStatus::Dead,
                stored.attempt_count == 5
            );
            h.clock.advance(TimeDelta::hours(1));
        }

        // Assert
        assert_eq!(handler.seen().len(), 5);
    }

    #[tokio::test]
    async fn test_handler_timeout_is_a_retryable_failure() {
        // Arrange
        let h = Harness::new();
        let event = h.enqueue("EMAIL_SEND", serde_json::json!({})).await;
        let dispatcher = h.dispatcher(
            registry_with(EventKind::EmailSend, Arc::new(SlowHandler)),
            DispatchConfig {
                handler_timeout: Some(Duration::from_millis(20)),
                ..DispatchConfig::default()
            },
        );

        // Act
        let summary = dispatcher.run_batch(None).await.unwrap();

        // Assert
        let result = &summary.results[0];
        assert_eq!(result.id, event.id);
        assert!(!result.ok);
        assert_eq!(result.status, EventStatus::Retry);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_dead_letter_policy_kills_unknown_kind_immediately() {
        // Arrange
        let h = Harness::new();
        let event = h.enqueue("LEGACY_FAX", serde_json::json!({})).await;
        let dispatcher = h.dispatcher(
            HandlerRegistry::default(),
            DispatchConfig {
                unknown_kind_policy: UnknownKindPolicy::DeadLetter,
                ..DispatchConfig::default()
            },
        );

        // Act
        let summary = dispatcher.run_batch(None).await.unwrap();

        // Assert
        assert_eq!(summary.results[0].status, EventStatus::Dead);
        let stored = h.ledger.get(event.id).await.unwrap();
        assert_eq!(stored.status, EventStatus::Dead);
        assert_eq!(stored.attempt_count, 5);
        assert_eq!(
            h.audit
                .records_for(event.id, AuditAction::OutboxFailed)
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_batch_size_is_validated_and_clamped() {
        // Arrange
        let h = Harness::new();
        for _ in 0..3 {
            h.enqueue("EMAIL_SEND", serde_json::json!({})).await;
        }
        let dispatcher = h.dispatcher(
            registry_with(EventKind::EmailSend, Arc::new(ScriptedHandler::default())),
            DispatchConfig {
                max_batch_size: 2,
                ..DispatchConfig::default()
            },
        );

        // Act
        let zero = dispatcher.run_batch(Some(0)).await;
        let clamped = dispatcher.run_batch(Some(50)).await.unwrap();

        // Assert
        assert!(matches!(zero, Err(OutboxError::Validation(_))));
        assert_eq!(clamped.claimed, 2);
    }

    #[tokio::test]
    async fn test_claim_failure_is_returned() {
        let clock = Arc::new(ManualClock::new(start()));
        let dispatcher = Dispatcher::new(
            Arc::new(FailingEventLedger),
            Arc::new(RecordingAuditSink::new()),
            HandlerRegistry::default(),
            clock,
            DispatchConfig::default(),
        );

        let result = dispatcher.run_batch(None).await;

        assert!(matches!(result, Err(OutboxError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_block_delivery() {
        // Arrange
        let h = Harness::new();
        let event = h.enqueue("EMAIL_SEND", serde_json::json!({})).await;
        let dispatcher = Dispatcher::new(
            h.ledger.clone(),
            Arc::new(FailingAuditSink),
            registry_with(EventKind::EmailSend, Arc::new(ScriptedHandler::default())),
            h.clock.clone(),
            DispatchConfig::default(),
        );

        // Act
        let summary = dispatcher.run_batch(None).await.unwrap();

        // Assert
        assert!(summary.results[0].ok);
        assert_eq!(h.ledger.get(event.id).await.unwrap().status, EventStatus::Sent);
    }

    #[tokio::test]
    async fn test_lost_report_is_audited_as_failure() {
        // Arrange
        let h = Harness::new();
        let event = h.enqueue("EMAIL_SEND", serde_json::json!({})).await;
        let dispatcher = Dispatcher::new(
            Arc::new(UnreportableLedger(h.ledger.clone())),
            h.audit.clone(),
            registry_with(EventKind::EmailSend, Arc::new(ScriptedHandler::default())),
            h.clock.clone(),
            DispatchConfig::default(),
        );

        // Act
        let summary = dispatcher.run_batch(None).await.unwrap();

        // Assert
        let result = &summary.results[0];
        assert!(!result.ok);
        assert_eq!(result.status, EventStatus::Processing);
        assert!(
            result
                .error
                .as_deref()
                .unwrap()
                .contains("connection reset")
        );
        assert_eq!(
            h.ledger.get(event.id).await.unwrap().status,
            EventStatus::Processing
        );

        let records = h.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::OutboxFailed);
        assert_eq!(records[0].metadata["status"], "PROCESSING");
        assert!(
            records[0].metadata["error"]
                .as_str()
                .unwrap()
                .starts_with("report failed:")
        );
    }

    #[tokio::test]
    async fn test_each_invocation_uses_a_fresh_worker_id() {
        let h = Harness::new();
        let dispatcher = h.dispatcher(HandlerRegistry::default(), DispatchConfig::default());

        let first = dispatcher.run_batch(None).await.unwrap();
        let second = dispatcher.run_batch(None).await.unwrap();

        assert_ne!(first.worker_id, second.worker_id);
        assert!(first.worker_id.starts_with("dispatch-"));
    }

    #[test]
    fn test_unknown_kind_policy_parses() {
        assert_eq!(
            "retry".parse::<UnknownKindPolicy>().unwrap(),
            UnknownKindPolicy::Retry
        );
        assert_eq!(
            "dead_letter".parse::<UnknownKindPolicy>().unwrap(),
            UnknownKindPolicy::DeadLetter
        );
        assert!("drop".parse::<UnknownKindPolicy>().is_err());
    }
}
