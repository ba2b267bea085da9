//! `PostgreSQL` audit trail.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use courier_core::audit::{AuditRecord, AuditSink};
use courier_core::error::OutboxError;

use crate::schema::AUDIT_LOG_TABLE;

/// Appends audit records to the `audit_log` table.
#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    /// Creates a new `PgAuditSink`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn create_audit(&self, record: AuditRecord) -> Result<(), OutboxError> {
        let sql = format!(
            "INSERT INTO {AUDIT_LOG_TABLE} (id, action, entity, entity_id, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)"
        );
        sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(record.action.as_str())
            .bind(&record.entity)
            .bind(record.entity_id)
            .bind(&record.metadata)
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| OutboxError::Infrastructure(format!("failed to write audit record: {e}")))?;
        Ok(())
    }
}
