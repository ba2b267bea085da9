//! Handler abstraction and the registry that routes events to handlers.

pub mod handler;
pub mod registry;
