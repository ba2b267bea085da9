//! Fake gateways for handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use courier_core::gateway::{
    BlobStore, EmailGateway, EmailMessage, GatewayError, IdentityAccount, IdentityDirectory,
    MessageGateway, NewIdentityAccount, OutboundMessage,
};
use uuid::Uuid;

/// An email gateway that records every message and accepts them all.
#[derive(Debug, Default)]
pub struct RecordingEmailGateway {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all sent messages.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailGateway for RecordingEmailGateway {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// An email gateway that is always down.
#[derive(Debug)]
pub struct FailingEmailGateway;

#[async_trait]
impl EmailGateway for FailingEmailGateway {
    async fn send_email(&self, _message: &EmailMessage) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("smtp relay unreachable".into()))
    }
}

/// A messaging gateway that records every message and accepts them all.
#[derive(Debug, Default)]
pub struct RecordingMessageGateway {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingMessageGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all sent messages.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageGateway for RecordingMessageGateway {
    async fn send_message(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// An identity directory held in memory, keyed by tenant and subject.
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    accounts: Mutex<HashMap<(Uuid, Uuid), IdentityAccount>>,
    create_calls: Mutex<usize>,
}

impl InMemoryIdentityDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all accounts.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn accounts(&self) -> Vec<IdentityAccount> {
        self.accounts.lock().unwrap().values().cloned().collect()
    }

    /// Number of `create_account` calls received, successful or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn create_calls(&self) -> usize {
        *self.create_calls.lock().unwrap()
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn find_account(
        &self,
        tenant_id: Uuid,
        subject_id: Uuid,
    ) -> Result<Option<IdentityAccount>, GatewayError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(&(tenant_id, subject_id))
            .cloned())
    }

    async fn create_account(
        &self,
        tenant_id: Uuid,
        account: &NewIdentityAccount,
    ) -> Result<IdentityAccount, GatewayError> {
        *self.create_calls.lock().unwrap() += 1;
        let mut accounts = self.accounts.lock().unwrap();
        let key = (tenant_id, account.subject_id);
        if accounts.contains_key(&key) {
            return Err(GatewayError::AlreadyExists(format!(
                "account for subject {}",
                account.subject_id
            )));
        }
        let created = IdentityAccount {
            tenant_id,
            subject_id: account.subject_id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            role: account.role.clone(),
            created_at: Utc::now(),
        };
        accounts.insert(key, created.clone());
        Ok(created)
    }
}

/// A blob store held in memory. Sources must be registered with
/// [`InMemoryBlobStore::put_source`] before they can be copied.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    sources: Mutex<HashSet<String>>,
    archived: Mutex<HashMap<String, String>>,
}

impl InMemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a blob in the working area.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn put_source(&self, key: &str) {
        self.sources.lock().unwrap().insert(key.to_owned());
    }

    /// Maps each archived destination to the source it was copied from.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn archived(&self) -> HashMap<String, String> {
        self.archived.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn copy(&self, source: &str, destination: &str) -> Result<(), GatewayError> {
        if !self.sources.lock().unwrap().contains(source) {
            return Err(GatewayError::NotFound(source.to_owned()));
        }
        let mut archived = self.archived.lock().unwrap();
        if archived.contains_key(destination) {
            return Err(GatewayError::AlreadyExists(destination.to_owned()));
        }
        archived.insert(destination.to_owned(), source.to_owned());
        Ok(())
    }
}
