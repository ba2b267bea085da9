//! HTTP routes.

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod outbox;

/// Builds the full application router. `main.rs` adds the tower layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/outbox", outbox::router())
        .with_state(state)
}
