//! Idempotency keys handed to external gateways.
//!
//! A retried or reclaimed event must present the same key on every attempt
//! so providers can collapse duplicate sends.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::event::EventKind;

/// Derives a stable key from the event identity.
#[must_use]
pub fn idempotency_key(event_id: Uuid, kind: &EventKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event_id.as_bytes());
    hasher.update(kind.as_str().as_bytes());
    let digest = hasher.finalize();

    let mut key = String::with_capacity(8 + digest.len() * 2);
    key.push_str("outbox-");
    for byte in digest {
        // Writing to a String cannot fail.
        let _ = write!(key, "{byte:02x}");
    }
    key
}
