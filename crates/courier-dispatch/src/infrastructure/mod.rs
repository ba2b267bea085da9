//! Development-grade adapters for the gateway ports.

pub mod fs_blob_store;
pub mod log_gateway;

pub use fs_blob_store::FsBlobStore;
pub use log_gateway::{LogEmailGateway, LogMessageGateway};
