//! Test audit sinks.

use std::sync::Mutex;

use async_trait::async_trait;
use courier_core::audit::{AuditAction, AuditRecord, AuditSink};
use courier_core::error::OutboxError;
use uuid::Uuid;

/// An audit sink that keeps every record it receives.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Records written for one entity with the given action.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn records_for(&self, entity_id: Uuid, action: AuditAction) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.entity_id == entity_id && r.action == action)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn create_audit(&self, record: AuditRecord) -> Result<(), OutboxError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

/// An audit sink whose writes always fail.
#[derive(Debug)]
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn create_audit(&self, _record: AuditRecord) -> Result<(), OutboxError> {
        Err(OutboxError::Infrastructure("audit table unavailable".into()))
    }
}
