//! Audit trail for outbox delivery attempts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OutboxError;

/// Entity label stamped on every outbox audit record.
pub const OUTBOX_AUDIT_ENTITY: &str = "outbox_event";

/// Outcome recorded for one processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// The handler succeeded.
    OutboxSent,
    /// The handler failed; the event will retry or is now dead.
    OutboxFailed,
}

impl AuditAction {
    /// Returns the stored text form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutboxSent => "OUTBOX_SENT",
            Self::OutboxFailed => "OUTBOX_FAILED",
        }
    }
}

/// One append-only forensic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// What happened.
    pub action: AuditAction,
    /// Entity type the record is about.
    pub entity: String,
    /// Identifier of that entity.
    pub entity_id: Uuid,
    /// Kind, tenant and, on failure, the error text.
    pub metadata: serde_json::Value,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

/// Port for persisting audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one record.
    async fn create_audit(&self, record: AuditRecord) -> Result<(), OutboxError>;
}
