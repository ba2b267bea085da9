//! `ARCHIVE_DOCUMENT` handler.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::event::OutboxEvent;
use courier_core::gateway::{BlobStore, GatewayError};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::handler::{Handler, HandlerError, decode_payload};

/// Payload of an `ARCHIVE_DOCUMENT` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveDocumentPayload {
    /// Document being archived.
    pub document_id: Uuid,
    /// Key of the blob in the working area; must sit under the event's
    /// tenant prefix.
    pub source_key: String,
    /// File name to store under in the retention area.
    pub file_name: String,
}

/// Retention-area key for a tenant's document.
#[must_use]
pub fn archive_destination(tenant_id: Uuid, document_id: Uuid, file_name: &str) -> String {
    format!("tenants/{tenant_id}/documents/{document_id}/{file_name}")
}

fn validate_file_name(file_name: &str) -> Result<(), HandlerError> {
    if file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\'])
    {
        return Err(HandlerError::InvalidPayload(format!(
            "invalid file name: {file_name:?}"
        )));
    }
    Ok(())
}

fn validate_source_key(tenant_id: Uuid, source_key: &str) -> Result<(), HandlerError> {
    let prefix = format!("tenants/{tenant_id}/");
    let escapes = source_key
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "..");
    if escapes || !source_key.starts_with(&prefix) {
        return Err(HandlerError::InvalidPayload(format!(
            "source key {source_key:?} is outside tenant {tenant_id}"
        )));
    }
    Ok(())
}

/// Copies a document into the tenant's retention path. A destination that
/// already exists counts as success, so re-running is harmless.
pub struct DocumentArchivalHandler {
    store: Arc<dyn BlobStore>,
}

impl DocumentArchivalHandler {
    /// Creates a handler archiving through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for DocumentArchivalHandler {
    #[instrument(skip(self, event), fields(event_id = %event.id, tenant_id = %event.tenant_id))]
    async fn handle(&self, event: &OutboxEvent) -> Result<(), HandlerError> {
        let payload: ArchiveDocumentPayload = decode_payload(event)?;
        validate_file_name(&payload.file_name)?;
        validate_source_key(event.tenant_id, &payload.source_key)?;

        let destination =
            archive_destination(event.tenant_id, payload.document_id, &payload.file_name);
        match self.store.copy(&payload.source_key, &destination).await {
            Ok(()) => {
                info!(%destination, "document archived");
                Ok(())
            }
            Err(GatewayError::AlreadyExists(_)) => {
                debug!(%destination, "document already archived");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use courier_core::event::{EventKind, NewEvent};
    use courier_test_support::InMemoryBlobStore;

    use super::*;

    fn archive_event(tenant_id: Uuid, payload: serde_json::Value) -> OutboxEvent {
        OutboxEvent::pending(
            Uuid::new_v4(),
            NewEvent {
                kind: EventKind::ArchiveDocument,
                payload,
                tenant_id,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_copies_into_tenant_scoped_path() {
        // Arrange
        let store = Arc::new(InMemoryBlobStore::new());
        let handler = DocumentArchivalHandler::new(store.clone());
        let tenant_id = Uuid::new_v4();
        let document_id = Uuid::new_v4();
        let source = format!("tenants/{tenant_id}/uploads/tc-2026.pdf");
        store.put_source(&source);
        let event = archive_event(
            tenant_id,
            serde_json::json!({
                "document_id": document_id,
                "source_key": source,
                "file_name": "transfer-certificate.pdf"
            }),
        );

        // Act
        handler.handle(&event).await.unwrap();

        // Assert
        let archived = store.archived();
        let destination = format!("tenants/{tenant_id}/documents/{document_id}/transfer-certificate.pdf");
        assert_eq!(archived.get(&destination), Some(&source));
    }

    #[tokio::test]
    async fn test_second_run_for_same_pair_succeeds() {
        // Arrange
        let store = Arc::new(InMemoryBlobStore::new());
        let handler = DocumentArchivalHandler::new(store.clone());
        let tenant_id = Uuid::new_v4();
        let source = format!("tenants/{tenant_id}/uploads/report.pdf");
        store.put_source(&source);
        let event = archive_event(
            tenant_id,
            serde_json::json!({
                "document_id": Uuid::new_v4(),
                "source_key": source,
                "file_name": "report.pdf"
            }),
        );

        // Act
        let first = handler.handle(&event).await;
        let second = handler.handle(&event).await;

        // Assert
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(store.archived().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let store = Arc::new(InMemoryBlobStore::new());
        let handler = DocumentArchivalHandler::new(store);
        let tenant_id = Uuid::new_v4();
        let event = archive_event(
            tenant_id,
            serde_json::json!({
                "document_id": Uuid::new_v4(),
                "source_key": format!("tenants/{tenant_id}/uploads/gone.pdf"),
                "file_name": "gone.pdf"
            }),
        );

        let err = handler.handle(&event).await.unwrap_err();

        assert!(matches!(err, HandlerError::Gateway(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_source_from_another_tenant() {
        let store = Arc::new(InMemoryBlobStore::new());
        let handler = DocumentArchivalHandler::new(store.clone());
        let other_tenant = Uuid::new_v4();
        let source = format!("tenants/{other_tenant}/uploads/secret.pdf");
        store.put_source(&source);
        let event = archive_event(
            Uuid::new_v4(),
            serde_json::json!({
                "document_id": Uuid::new_v4(),
                "source_key": source,
                "file_name": "secret.pdf"
            }),
        );

        let err = handler.handle(&event).await.unwrap_err();

        assert!(matches!(err, HandlerError::InvalidPayload(_)));
        assert!(store.archived().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let handler = DocumentArchivalHandler::new(Arc::new(InMemoryBlobStore::new()));
        let tenant_id = Uuid::new_v4();

        for (source_key, file_name) in [
            (format!("tenants/{tenant_id}/../x/a.pdf"), "a.pdf"),
            (format!("tenants/{tenant_id}/a.pdf"), "../a.pdf"),
            (format!("tenants/{tenant_id}/a.pdf"), ""),
        ] {
            let event = archive_event(
                tenant_id,
                serde_json::json!({
                    "document_id": Uuid::new_v4(),
                    "source_key": source_key,
                    "file_name": file_name
                }),
            );

            let err = handler.handle(&event).await.unwrap_err();
            assert!(matches!(err, HandlerError::InvalidPayload(_)));
        }
    }
}
