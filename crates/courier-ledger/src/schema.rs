//! Table names and column lists shared by the `PostgreSQL` adapters.
//!
//! The DDL itself lives in the workspace `migrations/` directory.

/// Outbox event table.
pub const OUTBOX_EVENTS_TABLE: &str = "outbox_events";

/// Audit trail table.
pub const AUDIT_LOG_TABLE: &str = "audit_log";

/// Identity account table.
pub const IDENTITY_ACCOUNTS_TABLE: &str = "identity_accounts";

/// Columns selected for every outbox event row, in `EventRow` order.
pub const OUTBOX_EVENT_COLUMNS: &str = "id, kind, payload, tenant_id, status, attempt_count, \
     worker_id, claimed_at, next_attempt_at, last_error, replay_of, created_at, updated_at";

/// Columns selected for every identity account row.
pub const IDENTITY_ACCOUNT_COLUMNS: &str =
    "tenant_id, subject_id, email, display_name, role, created_at";
