//! Outbox event model.
//!
//! An [`OutboxEvent`] is appended by a producer transaction and afterwards
//! mutated only through the ledger's `claim` / `report_result` operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OutboxError;

/// Wire name for [`EventKind::IdentityProvision`].
pub const IDENTITY_PROVISION_KIND: &str = "IDENTITY_PROVISION";

/// Wire name for [`EventKind::EmailSend`].
pub const EMAIL_SEND_KIND: &str = "EMAIL_SEND";

/// Wire name for [`EventKind::MessageSend`].
pub const MESSAGE_SEND_KIND: &str = "MESSAGE_SEND";

/// Wire name for [`EventKind::ArchiveDocument`].
pub const ARCHIVE_DOCUMENT_KIND: &str = "ARCHIVE_DOCUMENT";

/// Selects the handler an event is routed to.
///
/// Parsing never fails: strings that name no known kind are kept verbatim in
/// [`EventKind::Unrecognized`] so the dispatcher can fail them visibly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Ensure an external account exists for a subject.
    IdentityProvision,
    /// Send an email through the email gateway.
    EmailSend,
    /// Send a message (SMS, chat) through the messaging gateway.
    MessageSend,
    /// Copy a document into the tenant's retention store.
    ArchiveDocument,
    /// Any kind this build does not know about.
    Unrecognized(String),
}

impl EventKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::IdentityProvision => IDENTITY_PROVISION_KIND,
            Self::EmailSend => EMAIL_SEND_KIND,
            Self::MessageSend => MESSAGE_SEND_KIND,
            Self::ArchiveDocument => ARCHIVE_DOCUMENT_KIND,
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for EventKind {
    fn from(raw: &str) -> Self {
        match raw {
            IDENTITY_PROVISION_KIND => Self::IdentityProvision,
            EMAIL_SEND_KIND => Self::EmailSend,
            MESSAGE_SEND_KIND => Self::MessageSend,
            ARCHIVE_DOCUMENT_KIND => Self::ArchiveDocument,
            other => Self::Unrecognized(other.to_owned()),
        }
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Unrecognized(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an outbox event.
///
/// ```text
/// PENDING --claim--> PROCESSING --ok--> SENT
/// PROCESSING --fail, attempts < max--> RETRY --backoff elapses--> claimable
/// PROCESSING --fail, attempts >= max--> DEAD
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Appended and never claimed.
    Pending,
    /// Leased by a worker.
    Processing,
    /// Failed at least once; claimable again once the backoff window elapses.
    Retry,
    /// Delivered. Terminal.
    Sent,
    /// Retries exhausted. Terminal.
    Dead,
}

impl EventStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Retry,
        Self::Sent,
        Self::Dead,
    ];

    /// Returns the stored text form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Retry => "RETRY",
            Self::Sent => "SENT",
            Self::Dead => "DEAD",
        }
    }

    /// `SENT` and `DEAD` never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Dead)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = OutboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OutboxError::Infrastructure(format!("unknown event status: {s}")))
    }
}

/// Producer input for appending an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    /// Handler selector.
    pub kind: EventKind,
    /// Handler-specific payload.
    pub payload: serde_json::Value,
    /// Tenant the event belongs to.
    pub tenant_id: Uuid,
}

/// Snapshot of an event as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Handler selector.
    pub kind: EventKind,
    /// Handler-specific payload.
    pub payload: serde_json::Value,
    /// Tenant the event belongs to.
    pub tenant_id: Uuid,
    /// Current lifecycle status.
    pub status: EventStatus,
    /// Failed processing attempts so far.
    pub attempt_count: i32,
    /// Lease holder; set only while `PROCESSING`.
    pub worker_id: Option<String>,
    /// Time of the most recent claim.
    pub claimed_at: Option<DateTime<Utc>>,
    /// End of the backoff window; set only while `RETRY`.
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Most recent failure message.
    pub last_error: Option<String>,
    /// The dead event this one was replayed from, if any.
    pub replay_of: Option<Uuid>,
    /// Append time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl OutboxEvent {
    /// Builds a fresh `PENDING` event from producer input.
    #[must_use]
    pub fn pending(id: Uuid, new_event: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: new_event.kind,
            payload: new_event.payload,
            tenant_id: new_event.tenant_id,
            status: EventStatus::Pending,
            attempt_count: 0,
            worker_id: None,
            claimed_at: None,
            next_attempt_at: None,
            last_error: None,
            replay_of: None,
            created_at: now,
            updated_at: now,
        }
    }
}
