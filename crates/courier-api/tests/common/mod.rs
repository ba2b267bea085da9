//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use courier_core::clock::Clock;
use courier_core::event::EventKind;
use courier_core::gateway::{BlobStore, EmailGateway};
use courier_core::retry::RetryPolicy;
use courier_dispatch::application::dispatcher::{DispatchConfig, Dispatcher};
use courier_dispatch::domain::registry::HandlerRegistry;
use courier_dispatch::handlers::{
    DocumentArchivalHandler, EmailSendHandler, IdentityProvisionHandler, MessageSendHandler,
};
use courier_ledger::{PgAuditSink, PgEventLedger, PgIdentityDirectory};
use courier_test_support::{
    InMemoryBlobStore, ManualClock, NoJitter, RecordingEmailGateway, RecordingMessageGateway,
};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use courier_api::routes;
use courier_api::state::AppState;

/// Start time used across all integration tests.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// Collaborators a test may want to inspect or steer.
pub struct TestDeps {
    pub clock: Arc<ManualClock>,
    pub email: Arc<dyn EmailGateway>,
    pub blobs: Arc<InMemoryBlobStore>,
}

impl Default for TestDeps {
    fn default() -> Self {
        Self {
            clock: Arc::new(ManualClock::new(start())),
            email: Arc::new(RecordingEmailGateway::new()),
            blobs: Arc::new(InMemoryBlobStore::new()),
        }
    }
}

/// Build the full app router over Postgres with default test collaborators.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, &TestDeps::default())
}

/// Build the full app router over Postgres. Uses the same route structure
/// and handler set as `main.rs`, with fake providers.
pub fn build_test_app_with(pool: PgPool, deps: &TestDeps) -> Router {
    let clock: Arc<dyn Clock> = deps.clock.clone();
    let ledger = Arc::new(PgEventLedger::new(
        pool.clone(),
        clock.clone(),
        RetryPolicy::default(),
        Arc::new(Mutex::new(NoJitter)),
    ));
    let blobs: Arc<dyn BlobStore> = deps.blobs.clone();
    let registry = HandlerRegistry::builder()
        .register(
            EventKind::IdentityProvision,
            Arc::new(IdentityProvisionHandler::new(Arc::new(
                PgIdentityDirectory::new(pool.clone()),
            ))),
        )
        .register(
            EventKind::EmailSend,
            Arc::new(EmailSendHandler::new(deps.email.clone())),
        )
        .register(
            EventKind::MessageSend,
            Arc::new(MessageSendHandler::new(Arc::new(RecordingMessageGateway::new()))),
        )
        .register(
            EventKind::ArchiveDocument,
            Arc::new(DocumentArchivalHandler::new(blobs)),
        )
        .build();
    let dispatcher = Arc::new(Dispatcher::new(
        ledger.clone(),
        Arc::new(PgAuditSink::new(pool)),
        registry,
        clock.clone(),
        DispatchConfig::default(),
    ));

    routes::build_router(AppState::new(clock, ledger, dispatcher))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
