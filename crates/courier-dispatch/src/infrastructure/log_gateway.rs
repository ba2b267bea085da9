//! Gateways that write to the tracing log instead of a provider.
//!
//! Used when no provider is configured, e.g. local development.

use async_trait::async_trait;
use courier_core::gateway::{
    EmailGateway, EmailMessage, GatewayError, MessageGateway, OutboundMessage,
};
use tracing::info;

/// Logs each email instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailGateway;

#[async_trait]
impl EmailGateway for LogEmailGateway {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), GatewayError> {
        info!(
            idempotency_key = %message.idempotency_key,
            tenant_id = %message.tenant_id,
            recipients = ?message.to,
            subject = %message.subject,
            "email delivered to log gateway"
        );
        Ok(())
    }
}

/// Logs each message instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMessageGateway;

#[async_trait]
impl MessageGateway for LogMessageGateway {
    async fn send_message(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        info!(
            idempotency_key = %message.idempotency_key,
            tenant_id = %message.tenant_id,
            channel = %message.channel,
            recipient = %message.recipient,
            "message delivered to log gateway"
        );
        Ok(())
    }
}
