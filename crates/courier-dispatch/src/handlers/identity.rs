//! `IDENTITY_PROVISION` handler.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::event::OutboxEvent;
use courier_core::gateway::{GatewayError, IdentityDirectory, NewIdentityAccount};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::handler::{Handler, HandlerError, decode_payload};

/// Payload of an `IDENTITY_PROVISION` event.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityProvisionPayload {
    /// Application-side subject to provision.
    pub subject_id: Uuid,
    /// Login email.
    pub email: String,
    /// Name shown to the user.
    pub display_name: String,
    /// Role granted to the account.
    pub role: String,
}

/// Ensures an external account exists for the subject. Re-running for an
/// already provisioned subject is a no-op.
pub struct IdentityProvisionHandler {
    directory: Arc<dyn IdentityDirectory>,
}

impl IdentityProvisionHandler {
    /// Creates a handler provisioning into `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Handler for IdentityProvisionHandler {
    #[instrument(skip(self, event), fields(event_id = %event.id, tenant_id = %event.tenant_id))]
    async fn handle(&self, event: &OutboxEvent) -> Result<(), HandlerError> {
        let payload: IdentityProvisionPayload = decode_payload(event)?;
        if !payload.email.contains('@') {
            return Err(HandlerError::InvalidPayload(format!(
                "invalid email: {}",
                payload.email
            )));
        }

        if self
            .directory
            .find_account(event.tenant_id, payload.subject_id)
            .await?
            .is_some()
        {
            debug!(subject_id = %payload.subject_id, "account already provisioned");
            return Ok(());
        }

        let account = NewIdentityAccount {
            subject_id: payload.subject_id,
            email: payload.email,
            display_name: payload.display_name,
            role: payload.role,
        };
        match self.directory.create_account(event.tenant_id, &account).await {
            Ok(_) => {
                info!(subject_id = %account.subject_id, "identity account provisioned");
                Ok(())
            }
            // Another worker provisioned it between our lookup and create.
            Err(GatewayError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
