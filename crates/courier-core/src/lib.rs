//! Courier Core: outbox domain model and ports.
//!
//! This crate defines the event model, the ledger contract the dispatcher
//! depends on, the audit sink, retry/lease policy, and the ports for the
//! external gateways handlers talk to. It contains no infrastructure code.

pub mod audit;
pub mod clock;
pub mod error;
pub mod event;
pub mod gateway;
pub mod idempotency;
pub mod jitter;
pub mod ledger;
pub mod retry;
