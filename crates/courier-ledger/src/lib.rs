//! `PostgreSQL` adapters for the outbox.
//!
//! [`PgEventLedger`](pg_event_ledger::PgEventLedger) is the durable ledger
//! the dispatcher claims from. The audit log and identity directory share
//! the same pool and schema (see `migrations/`).

pub mod pg_audit_sink;
pub mod pg_event_ledger;
pub mod pg_identity_directory;
pub mod schema;

pub use pg_audit_sink::PgAuditSink;
pub use pg_event_ledger::PgEventLedger;
pub use pg_identity_directory::PgIdentityDirectory;
