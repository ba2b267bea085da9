//! Routes for the outbox: the dispatch invocation endpoint and the
//! operator surface.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use courier_core::event::{EventKind, NewEvent, OutboxEvent};
use courier_dispatch::application::dispatcher::DispatchSummary;
use courier_dispatch::application::operations::{self, OutboxStats};

use crate::error::ApiError;
use crate::state::AppState;

/// Query string for POST /dispatch.
#[derive(Debug, Default, Deserialize)]
pub struct DispatchParams {
    /// Events to claim; the configured default when absent.
    pub batch_size: Option<u32>,
}

/// Request body for POST /events.
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    /// Wire name of the event kind.
    pub kind: String,
    /// Kind-specific payload.
    pub payload: serde_json::Value,
    /// Owning tenant.
    pub tenant_id: Uuid,
}

/// POST /dispatch
#[instrument(skip(state))]
async fn dispatch(
    State(state): State<AppState>,
    Query(params): Query<DispatchParams>,
) -> Result<Json<DispatchSummary>, ApiError> {
    let summary = state.dispatcher.run_batch(params.batch_size).await?;
    info!(worker_id = %summary.worker_id, claimed = summary.claimed, "dispatch invocation finished");
    Ok(Json(summary))
}

/// GET /stats
#[instrument(skip(state))]
async fn stats(State(state): State<AppState>) -> Result<Json<OutboxStats>, ApiError> {
    let stats = operations::outbox_stats(&*state.ledger, state.clock.as_ref()).await?;
    Ok(Json(stats))
}

/// POST /events
#[instrument(skip(state, request), fields(kind = %request.kind, tenant_id = %request.tenant_id))]
async fn enqueue(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<OutboxEvent>), ApiError> {
    let event = NewEvent {
        kind: EventKind::from(request.kind),
        payload: request.payload,
        tenant_id: request.tenant_id,
    };
    let stored = operations::enqueue_event(&*state.ledger, event).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /events/{id}
#[instrument(skip(state))]
async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<OutboxEvent>, ApiError> {
    let event = operations::get_event(&*state.ledger, event_id).await?;
    Ok(Json(event))
}

/// POST /events/{id}/replay
#[instrument(skip(state))]
async fn replay(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<(StatusCode, Json<OutboxEvent>), ApiError> {
    let replayed = operations::replay_dead_event(&*state.ledger, event_id).await?;
    Ok((StatusCode::CREATED, Json(replayed)))
}

/// Returns the router for the outbox.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dispatch", post(dispatch))
        .route("/stats", get(stats))
        .route("/events", post(enqueue))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/replay", post(replay))
}
