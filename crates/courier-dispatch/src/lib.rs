//! Courier outbox dispatch.
//!
//! Responsible for routing claimed events to their handlers, reporting
//! outcomes back to the ledger, and writing the audit trail.

pub mod application;
pub mod domain;
pub mod handlers;
pub mod infrastructure;
