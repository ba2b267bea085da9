//! `EMAIL_SEND` handler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::event::OutboxEvent;
use courier_core::gateway::{EmailGateway, EmailMessage};
use courier_core::idempotency::idempotency_key;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::render::render;
use crate::domain::handler::{Handler, HandlerError, decode_payload};

/// Payload of an `EMAIL_SEND` event.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSendPayload {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject template.
    pub subject: String,
    /// Plain-text body template.
    pub text_body: String,
    /// HTML body template.
    #[serde(default)]
    pub html_body: Option<String>,
    /// Values for `{{placeholders}}` in the templates.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Renders the payload and hands it to the email gateway. Deduplication is
/// left to the provider through the idempotency key.
pub struct EmailSendHandler {
    gateway: Arc<dyn EmailGateway>,
}

impl EmailSendHandler {
    /// Creates a handler sending through `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<dyn EmailGateway>) -> Self {
        Self { gateway }
    }

    fn build_message(event: &OutboxEvent) -> Result<EmailMessage, HandlerError> {
        let payload: EmailSendPayload = decode_payload(event)?;
        if payload.to.is_empty() {
            return Err(HandlerError::InvalidPayload("no recipients".into()));
        }
        if let Some(bad) = payload.to.iter().find(|addr| !addr.contains('@')) {
            return Err(HandlerError::InvalidPayload(format!(
                "invalid recipient address: {bad}"
            )));
        }

        let html_body = payload
            .html_body
            .as_deref()
            .map(|html| render(html, &payload.variables))
            .transpose()?;

        Ok(EmailMessage {
            idempotency_key: idempotency_key(event.id, &event.kind),
            tenant_id: event.tenant_id,
            subject: render(&payload.subject, &payload.variables)?,
            text_body: render(&payload.text_body, &payload.variables)?,
            html_body,
            to: payload.to,
        })
    }
}

#[async_trait]
impl Handler for EmailSendHandler {
    #[instrument(skip(self, event), fields(event_id = %event.id, tenant_id = %event.tenant_id))]
    async fn handle(&self, event: &OutboxEvent) -> Result<(), HandlerError> {
        let message = Self::build_message(event)?;
        self.gateway.send_email(&message).await?;
        debug!(recipients = message.to.len(), "email handed to gateway");
        Ok(())
    }
}
