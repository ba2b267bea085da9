//! `EventLedger` implementations for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::clock::{Clock, minutes_since};
use courier_core::error::OutboxError;
use courier_core::event::{EventStatus, NewEvent, OutboxEvent};
use courier_core::jitter::JitterSource;
use courier_core::ledger::{EventLedger, StatusCounts};
use courier_core::retry::RetryPolicy;
use uuid::Uuid;

use crate::jitter::NoJitter;

/// A fully working ledger held in memory. Every operation runs under one
/// mutex, which makes `claim` linearizable the same way the Postgres
/// `FOR UPDATE SKIP LOCKED` claim is.
pub struct InMemoryEventLedger {
    events: Mutex<Vec<OutboxEvent>>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    jitter: Mutex<Box<dyn JitterSource + Send>>,
}

impl std::fmt::Debug for InMemoryEventLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventLedger")
            .field("events", &self.events)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl InMemoryEventLedger {
    /// Creates an empty ledger with the default retry policy and no jitter.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_policy(clock, RetryPolicy::default())
    }

    /// Creates an empty ledger with a custom retry policy and no jitter.
    #[must_use]
    pub fn with_policy(clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            clock,
            policy,
            jitter: Mutex::new(Box::new(NoJitter)),
        }
    }

    /// Inserts an event in whatever state the test needs.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, event: OutboxEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Returns a snapshot of every stored event in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<OutboxEvent> {
        self.events.lock().unwrap().clone()
    }

    fn is_claimable(&self, event: &OutboxEvent, now: DateTime<Utc>) -> bool {
        match event.status {
            EventStatus::Pending => true,
            EventStatus::Retry => event.next_attempt_at.is_none_or(|at| at <= now),
            EventStatus::Processing => event
                .claimed_at
                .is_none_or(|at| at <= self.policy.lease_cutoff(now)),
            EventStatus::Sent | EventStatus::Dead => false,
        }
    }

    fn append(&self, new_event: NewEvent, replay_of: Option<Uuid>) -> OutboxEvent {
        let mut event = OutboxEvent::pending(Uuid::now_v7(), new_event, self.clock.now());
        event.replay_of = replay_of;
        self.events.lock().unwrap().push(event.clone());
        event
    }
}

fn processing_mut(events: &mut [OutboxEvent], event_id: Uuid) -> Result<&mut OutboxEvent, OutboxError> {
    let event = events
        .iter_mut()
        .find(|e| e.id == event_id)
        .ok_or(OutboxError::EventNotFound(event_id))?;
    if event.status != EventStatus::Processing {
        return Err(OutboxError::InvalidTransition {
            event_id,
            status: event.status,
        });
    }
    Ok(event)
}

#[async_trait]
impl EventLedger for InMemoryEventLedger {
    async fn enqueue(&self, event: NewEvent) -> Result<OutboxEvent, OutboxError> {
        Ok(self.append(event, None))
    }

    async fn claim(
        &self,
        batch_size: u32,
        worker_id: &str,
    ) -> Result<Vec<OutboxEvent>, OutboxError> {
        let now = self.clock.now();
        let mut events = self.events.lock().unwrap();

        let mut eligible: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| self.is_claimable(e, now))
            .map(|(i, _)| i)
            .collect();
        eligible.sort_by_key(|&i| (events[i].created_at, events[i].id));
        eligible.truncate(batch_size as usize);

        let claimed = eligible
            .into_iter()
            .map(|i| {
                let event = &mut events[i];
                event.status = EventStatus::Processing;
                event.worker_id = Some(worker_id.to_owned());
                event.claimed_at = Some(now);
                event.next_attempt_at = None;
                event.updated_at = now;
                event.clone()
            })
            .collect();
        Ok(claimed)
    }

    async fn report_result(
        &self,
        event_id: Uuid,
        ok: bool,
        error: Option<&str>,
    ) -> Result<EventStatus, OutboxError> {
        let now = self.clock.now();
        let fraction = self.jitter.lock().unwrap().next_fraction();
        let mut events = self.events.lock().unwrap();
        let event = processing_mut(&mut events, event_id)?;

        event.worker_id = None;
        event.updated_at = now;
        if ok {
            event.status = EventStatus::Sent;
            return Ok(event.status);
        }

        event.attempt_count += 1;
        event.status = self.policy.status_after_failure(event.attempt_count);
        event.last_error = error.map(str::to_owned);
        if event.status == EventStatus::Retry {
            event.next_attempt_at = Some(now + self.policy.backoff_delay(event.attempt_count, fraction));
        }
        Ok(event.status)
    }

    async fn dead_letter(&self, event_id: Uuid, error: &str) -> Result<EventStatus, OutboxError> {
        let now = self.clock.now();
        let mut events = self.events.lock().unwrap();
        let event = processing_mut(&mut events, event_id)?;

        event.worker_id = None;
        event.updated_at = now;
        event.attempt_count = self.policy.max_attempts;
        event.status = EventStatus::Dead;
        event.last_error = Some(error.to_owned());
        Ok(event.status)
    }

    async fn get(&self, event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
            .ok_or(OutboxError::EventNotFound(event_id))
    }

    async fn replay(&self, event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
        let source = self.get(event_id).await?;
        if source.status != EventStatus::Dead {
            return Err(OutboxError::InvalidTransition {
                event_id,
                status: source.status,
            });
        }
        let new_event = NewEvent {
            kind: source.kind,
            payload: source.payload,
            tenant_id: source.tenant_id,
        };
        Ok(self.append(new_event, Some(event_id)))
    }

    async fn status_counts(&self, now: DateTime<Utc>) -> Result<StatusCounts, OutboxError> {
        let events = self.events.lock().unwrap();
        let mut counts = StatusCounts::default();
        for event in events.iter() {
            match event.status {
                EventStatus::Pending => counts.pending += 1,
                EventStatus::Processing => counts.processing += 1,
                EventStatus::Retry => counts.retry += 1,
                EventStatus::Sent => counts.sent += 1,
                EventStatus::Dead => counts.dead += 1,
            }
        }
        counts.oldest_pending_minutes = events
            .iter()
            .filter(|e| matches!(e.status, EventStatus::Pending | EventStatus::Retry))
            .map(|e| e.created_at)
            .min()
            .map_or(0, |oldest| minutes_since(oldest, now));
        Ok(counts)
    }
}

/// A ledger that always returns an infrastructure error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingEventLedger;

fn connection_refused<T>() -> Result<T, OutboxError> {
    Err(OutboxError::Infrastructure("connection refused".into()))
}

#[async_trait]
impl EventLedger for FailingEventLedger {
    async fn enqueue(&self, _event: NewEvent) -> Result<OutboxEvent, OutboxError> {
        connection_refused()
    }

    async fn claim(
        &self,
        _batch_size: u32,
        _worker_id: &str,
    ) -> Result<Vec<OutboxEvent>, OutboxError> {
        connection_refused()
    }

    async fn report_result(
        &self,
        _event_id: Uuid,
        _ok: bool,
        _error: Option<&str>,
    ) -> Result<EventStatus, OutboxError> {
        connection_refused()
    }

    async fn dead_letter(&self, _event_id: Uuid, _error: &str) -> Result<EventStatus, OutboxError> {
        connection_refused()
    }

    async fn get(&self, _event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
        connection_refused()
    }

    async fn replay(&self, _event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
        connection_refused()
    }

    async fn status_counts(&self, _now: DateTime<Utc>) -> Result<StatusCounts, OutboxError> {
        connection_refused()
    }
}
