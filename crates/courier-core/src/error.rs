//! Outbox error types.

use thiserror::Error;
use uuid::Uuid;

use crate::event::EventStatus;

/// Errors raised by the event ledger and the operations built on it.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// No event exists with the given identifier.
    #[error("outbox event not found: {0}")]
    EventNotFound(Uuid),

    /// The requested state change is not allowed from the event's current status.
    #[error("invalid transition for outbox event {event_id}: status is {status}")]
    InvalidTransition {
        /// The event the transition was attempted on.
        event_id: Uuid,
        /// The status the event was found in.
        status: EventStatus,
    },

    /// Caller-supplied input was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
