//! Handler trait and the errors a handler can raise.

use std::time::Duration;

use async_trait::async_trait;
use courier_core::event::OutboxEvent;
use courier_core::gateway::GatewayError;
use thiserror::Error;

/// Why a handler attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Nothing is registered for the event's kind.
    #[error("no handler registered for kind {kind}")]
    NoHandler {
        /// The kind that missed.
        kind: String,
    },

    /// The payload could not be decoded or failed validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The external gateway call failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The handler did not finish within the configured bound.
    #[error("handler timed out after {0:?}")]
    Timeout(Duration),
}

impl HandlerError {
    /// Errors that no amount of retrying will fix.
    ///
    /// These still travel the regular retry path unless the dispatcher is
    /// configured otherwise; the flag only feeds logging and policy.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NoHandler { .. } | Self::InvalidPayload(_))
    }
}

/// Side-effecting function for one event kind.
///
/// Implementations must be idempotent: an event may be handled again after
/// a crash between the side effect and the ledger report.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Performs the side effect for `event`.
    async fn handle(&self, event: &OutboxEvent) -> Result<(), HandlerError>;
}

/// Decodes an event payload into a handler-specific type.
///
/// # Errors
///
/// Returns `HandlerError::InvalidPayload` when the JSON does not match `T`.
pub fn decode_payload<T: serde::de::DeserializeOwned>(
    event: &OutboxEvent,
) -> Result<T, HandlerError> {
    T::deserialize(&event.payload).map_err(|e| HandlerError::InvalidPayload(e.to_string()))
}
