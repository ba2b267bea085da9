//! The handler set shipped with the dispatcher.

pub mod archive;
pub mod email;
pub mod identity;
pub mod message;
mod render;

pub use archive::DocumentArchivalHandler;
pub use email::EmailSendHandler;
pub use identity::IdentityProvisionHandler;
pub use message::MessageSendHandler;
