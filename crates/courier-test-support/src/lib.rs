//! Shared test fakes and utilities for the Courier outbox dispatcher.

mod audit;
mod clock;
mod gateway;
mod jitter;
mod ledger;

pub use audit::{FailingAuditSink, RecordingAuditSink};
pub use clock::{FixedClock, ManualClock};
pub use gateway::{
    FailingEmailGateway, InMemoryBlobStore, InMemoryIdentityDirectory, RecordingEmailGateway,
    RecordingMessageGateway,
};
pub use jitter::{FixedJitter, NoJitter};
pub use ledger::{FailingEventLedger, InMemoryEventLedger};
