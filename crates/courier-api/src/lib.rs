//! Courier API server library.
//!
//! Exposes the router, configuration and state so the binary and the
//! integration tests build the same application.

pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod telemetry;
