//! Ports for the external systems handlers talk to.
//!
//! Concrete providers (SMTP relays, SMS vendors, identity providers, object
//! storage) live outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by an external gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The target already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The source or target does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or failed internally.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// A rendered email ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Provider-level deduplication key.
    pub idempotency_key: String,
    /// Tenant sending the email.
    pub tenant_id: Uuid,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Rendered subject line.
    pub subject: String,
    /// Rendered plain-text body.
    pub text_body: String,
    /// Rendered HTML body, if any.
    pub html_body: Option<String>,
}

/// Sends email.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Hands one message to the provider.
    async fn send_email(&self, message: &EmailMessage) -> Result<(), GatewayError>;
}

/// A rendered short message (SMS, chat) ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Provider-level deduplication key.
    pub idempotency_key: String,
    /// Tenant sending the message.
    pub tenant_id: Uuid,
    /// Delivery channel, e.g. `sms` or `whatsapp`.
    pub channel: String,
    /// Channel-specific recipient address.
    pub recipient: String,
    /// Rendered body.
    pub body: String,
}

/// Sends short messages.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Hands one message to the provider.
    async fn send_message(&self, message: &OutboundMessage) -> Result<(), GatewayError>;
}

/// Account data needed to provision an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIdentityAccount {
    /// Application-side subject (student, guardian, staff member).
    pub subject_id: Uuid,
    /// Login email.
    pub email: String,
    /// Name shown to the user.
    pub display_name: String,
    /// Role granted on first login.
    pub role: String,
}

/// An account that exists in the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAccount {
    /// Tenant the account is scoped to.
    pub tenant_id: Uuid,
    /// Application-side subject.
    pub subject_id: Uuid,
    /// Login email.
    pub email: String,
    /// Name shown to the user.
    pub display_name: String,
    /// Granted role.
    pub role: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Directory of external identities, scoped per tenant.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Looks up the account for a subject.
    async fn find_account(
        &self,
        tenant_id: Uuid,
        subject_id: Uuid,
    ) -> Result<Option<IdentityAccount>, GatewayError>;

    /// Creates an account. Returns `AlreadyExists` if one is already present.
    async fn create_account(
        &self,
        tenant_id: Uuid,
        account: &NewIdentityAccount,
    ) -> Result<IdentityAccount, GatewayError>;
}

/// Blob storage spanning the working area and the long-term retention area.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copies `source` (working area) to `destination` (retention area).
    ///
    /// Returns `AlreadyExists` if the destination is already present and
    /// `NotFound` if the source is missing.
    async fn copy(&self, source: &str, destination: &str) -> Result<(), GatewayError>;
}
