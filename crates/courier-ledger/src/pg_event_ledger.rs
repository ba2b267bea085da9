//! `PostgreSQL` implementation of the `EventLedger` trait.
//!
//! Claims use `FOR UPDATE SKIP LOCKED`, so concurrent dispatchers partition
//! the eligible rows between them instead of blocking on each other. Every
//! status change after a claim runs in a transaction holding the row lock.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use courier_core::clock::{Clock, minutes_since};
use courier_core::error::OutboxError;
use courier_core::event::{EventKind, EventStatus, NewEvent, OutboxEvent};
use courier_core::jitter::JitterSource;
use courier_core::ledger::{EventLedger, StatusCounts};
use courier_core::retry::RetryPolicy;

use crate::schema::{OUTBOX_EVENTS_TABLE, OUTBOX_EVENT_COLUMNS};

/// Row shape of `outbox_events`.
#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    kind: String,
    payload: serde_json::Value,
    tenant_id: Uuid,
    status: String,
    attempt_count: i32,
    worker_id: Option<String>,
    claimed_at: Option<DateTime<Utc>>,
    next_attempt_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    replay_of: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for OutboxEvent {
    type Error = OutboxError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            kind: EventKind::from(row.kind),
            payload: row.payload,
            tenant_id: row.tenant_id,
            status: row.status.parse()?,
            attempt_count: row.attempt_count,
            worker_id: row.worker_id,
            claimed_at: row.claimed_at,
            next_attempt_at: row.next_attempt_at,
            last_error: row.last_error,
            replay_of: row.replay_of,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CountsRow {
    pending: i64,
    processing: i64,
    retry: i64,
    sent: i64,
    dead: i64,
    oldest_open_at: Option<DateTime<Utc>>,
}

fn db_error(context: &str, err: &sqlx::Error) -> OutboxError {
    OutboxError::Infrastructure(format!("{context}: {err}"))
}

/// PostgreSQL-backed outbox ledger.
#[derive(Clone)]
pub struct PgEventLedger {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    jitter: Arc<Mutex<dyn JitterSource + Send>>,
}

impl std::fmt::Debug for PgEventLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgEventLedger")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PgEventLedger {
    /// Creates a new `PgEventLedger`.
    #[must_use]
    pub fn new(
        pool: PgPool,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        jitter: Arc<Mutex<dyn JitterSource + Send>>,
    ) -> Self {
        Self {
            pool,
            clock,
            policy,
            jitter,
        }
    }

    fn next_jitter(&self) -> f64 {
        self.jitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_fraction()
    }

    async fn insert(
        &self,
        event: NewEvent,
        replay_of: Option<Uuid>,
    ) -> Result<OutboxEvent, OutboxError> {
        let now = self.clock.now();
        let sql = format!(
            "INSERT INTO {OUTBOX_EVENTS_TABLE}
                (id, kind, payload, tenant_id, status, attempt_count, replay_of, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $7)
             RETURNING {OUTBOX_EVENT_COLUMNS}"
        );
        let row: EventRow = sqlx::query_as(&sql)
            .bind(Uuid::now_v7())
            .bind(event.kind.as_str())
            .bind(&event.payload)
            .bind(event.tenant_id)
            .bind(EventStatus::Pending.as_str())
            .bind(replay_of)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("failed to insert outbox event", &e))?;
        row.try_into()
    }

    /// Locks an event row for the rest of `tx`, requiring it to be in
    /// `PROCESSING`.
    async fn lock_processing(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<OutboxEvent, OutboxError> {
        let sql = format!(
            "SELECT {OUTBOX_EVENT_COLUMNS} FROM {OUTBOX_EVENTS_TABLE} WHERE id = $1 FOR UPDATE"
        );
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| db_error("failed to lock outbox event", &e))?;
        let event: OutboxEvent = row.ok_or(OutboxError::EventNotFound(event_id))?.try_into()?;
        if event.status != EventStatus::Processing {
            return Err(OutboxError::InvalidTransition {
                event_id,
                status: event.status,
            });
        }
        Ok(event)
    }

    async fn settle(
        tx: &mut Transaction<'_, Postgres>,
        event: &OutboxEvent,
    ) -> Result<(), OutboxError> {
        let sql = format!(
            "UPDATE {OUTBOX_EVENTS_TABLE}
             SET status = $2, attempt_count = $3, worker_id = NULL, next_attempt_at = $4,
                 last_error = $5, updated_at = $6
             WHERE id = $1"
        );
        sqlx::query(&sql)
            .bind(event.id)
            .bind(event.status.as_str())
            .bind(event.attempt_count)
            .bind(event.next_attempt_at)
            .bind(event.last_error.as_deref())
            .bind(event.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| db_error("failed to update outbox event", &e))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, OutboxError> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("failed to begin transaction", &e))
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), OutboxError> {
    tx.commit()
        .await
        .map_err(|e| db_error("failed to commit transaction", &e))
}

#[async_trait]
impl EventLedger for PgEventLedger {
    #[instrument(skip(self, event), fields(kind = %event.kind, tenant_id = %event.tenant_id))]
    async fn enqueue(&self, event: NewEvent) -> Result<OutboxEvent, OutboxError> {
        self.insert(event, None).await
    }

    #[instrument(skip(self))]
    async fn claim(
        &self,
        batch_size: u32,
        worker_id: &str,
    ) -> Result<Vec<OutboxEvent>, OutboxError> {
        let now = self.clock.now();
        let sql = format!(
            "WITH candidates AS (
                 SELECT id FROM {OUTBOX_EVENTS_TABLE}
                 WHERE status = 'PENDING'
                    OR (status = 'RETRY' AND (next_attempt_at IS NULL OR next_attempt_at <= $1))
                    OR (status = 'PROCESSING' AND (claimed_at IS NULL OR claimed_at <= $2))
                 ORDER BY created_at, id
                 LIMIT $3
                 FOR UPDATE SKIP LOCKED
             )
             UPDATE {OUTBOX_EVENTS_TABLE}
             SET status = 'PROCESSING', worker_id = $4, claimed_at = $1,
                 next_attempt_at = NULL, updated_at = $1
             WHERE id IN (SELECT id FROM candidates)
             RETURNING {OUTBOX_EVENT_COLUMNS}"
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(now)
            .bind(self.policy.lease_cutoff(now))
            .bind(i64::from(batch_size))
            .bind(worker_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to claim outbox events", &e))?;

        let mut events = rows
            .into_iter()
            .map(OutboxEvent::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // UPDATE ... RETURNING does not preserve the CTE order.
        events.sort_by_key(|e| (e.created_at, e.id));
        debug!(claimed = events.len(), "claimed outbox events");
        Ok(events)
    }

    #[instrument(skip(self, error))]
    async fn report_result(
        &self,
        event_id: Uuid,
        ok: bool,
        error: Option<&str>,
    ) -> Result<EventStatus, OutboxError> {
        let now = self.clock.now();
        let mut tx = self.begin().await?;
        let mut event = Self::lock_processing(&mut tx, event_id).await?;

        event.updated_at = now;
        event.next_attempt_at = None;
        if ok {
            event.status = EventStatus::Sent;
        } else {
            event.attempt_count += 1;
            event.status = self.policy.status_after_failure(event.attempt_count);
            event.last_error = error.map(str::to_owned);
            if event.status == EventStatus::Retry {
                let delay = self
                    .policy
                    .backoff_delay(event.attempt_count, self.next_jitter());
                event.next_attempt_at = Some(now + delay);
            }
        }

        Self::settle(&mut tx, &event).await?;
        commit(tx).await?;
        Ok(event.status)
    }

    #[instrument(skip(self, error))]
    async fn dead_letter(&self, event_id: Uuid, error: &str) -> Result<EventStatus, OutboxError> {
        let now = self.clock.now();
        let mut tx = self.begin().await?;
        let mut event = Self::lock_processing(&mut tx, event_id).await?;

        event.status = EventStatus::Dead;
        event.attempt_count = self.policy.max_attempts;
        event.next_attempt_at = None;
        event.last_error = Some(error.to_owned());
        event.updated_at = now;

        Self::settle(&mut tx, &event).await?;
        commit(tx).await?;
        Ok(event.status)
    }

    async fn get(&self, event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
        let sql = format!("SELECT {OUTBOX_EVENT_COLUMNS} FROM {OUTBOX_EVENTS_TABLE} WHERE id = $1");
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to load outbox event", &e))?;
        row.ok_or(OutboxError::EventNotFound(event_id))?.try_into()
    }

    #[instrument(skip(self))]
    async fn replay(&self, event_id: Uuid) -> Result<OutboxEvent, OutboxError> {
        let source = self.get(event_id).await?;
        if source.status != EventStatus::Dead {
            return Err(OutboxError::InvalidTransition {
                event_id,
                status: source.status,
            });
        }
        let replayed = self
            .insert(
                NewEvent {
                    kind: source.kind,
                    payload: source.payload,
                    tenant_id: source.tenant_id,
                },
                Some(event_id),
            )
            .await?;
        debug!(replay_id = %replayed.id, "dead event replayed");
        Ok(replayed)
    }

    async fn status_counts(&self, now: DateTime<Utc>) -> Result<StatusCounts, OutboxError> {
        let sql = format!(
            "SELECT
                 COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                 COUNT(*) FILTER (WHERE status = 'PROCESSING') AS processing,
                 COUNT(*) FILTER (WHERE status = 'RETRY') AS retry,
                 COUNT(*) FILTER (WHERE status = 'SENT') AS sent,
                 COUNT(*) FILTER (WHERE status = 'DEAD') AS dead,
                 MIN(created_at) FILTER (WHERE status IN ('PENDING', 'RETRY')) AS oldest_open_at
             FROM {OUTBOX_EVENTS_TABLE}"
        );
        let row: CountsRow = sqlx::query_as(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("failed to count outbox events", &e))?;
        Ok(StatusCounts {
            pending: row.pending,
            processing: row.processing,
            retry: row.retry,
            sent: row.sent,
            dead: row.dead,
            oldest_pending_minutes: row
                .oldest_open_at
                .map_or(0, |oldest| minutes_since(oldest, now)),
        })
    }
}
