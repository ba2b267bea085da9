//! `MESSAGE_SEND` handler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::event::OutboxEvent;
use courier_core::gateway::{MessageGateway, OutboundMessage};
use courier_core::idempotency::idempotency_key;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::render::render;
use crate::domain::handler::{Handler, HandlerError, decode_payload};

/// Payload of a `MESSAGE_SEND` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSendPayload {
    /// Delivery channel, e.g. `sms`.
    pub channel: String,
    /// Channel-specific recipient address.
    pub recipient: String,
    /// Body template.
    pub body: String,
    /// Values for `{{placeholders}}` in the body.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Sends SMS/chat notifications through the messaging gateway.
pub struct MessageSendHandler {
    gateway: Arc<dyn MessageGateway>,
}

impl MessageSendHandler {
    /// Creates a handler sending through `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<dyn MessageGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Handler for MessageSendHandler {
    #[instrument(skip(self, event), fields(event_id = %event.id, tenant_id = %event.tenant_id))]
    async fn handle(&self, event: &OutboxEvent) -> Result<(), HandlerError> {
        let payload: MessageSendPayload = decode_payload(event)?;
        if payload.recipient.trim().is_empty() {
            return Err(HandlerError::InvalidPayload("empty recipient".into()));
        }

        let message = OutboundMessage {
            idempotency_key: idempotency_key(event.id, &event.kind),
            tenant_id: event.tenant_id,
            body: render(&payload.body, &payload.variables)?,
            channel: payload.channel,
            recipient: payload.recipient,
        };
        self.gateway.send_message(&message).await?;
        debug!(channel = %message.channel, "message handed to gateway");
        Ok(())
    }
}
