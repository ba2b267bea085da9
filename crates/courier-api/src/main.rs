//! Courier API server entry point.

use std::sync::{Arc, Mutex};

use courier_api::config::AppConfig;
use courier_api::error::AppError;
use courier_api::state::AppState;
use courier_api::{routes, scheduler, telemetry};
use courier_core::clock::{Clock, SystemClock};
use courier_core::event::EventKind;
use courier_core::jitter::{JitterSource, RandomJitter};
use courier_dispatch::application::dispatcher::Dispatcher;
use courier_dispatch::domain::registry::HandlerRegistry;
use courier_dispatch::handlers::{
    DocumentArchivalHandler, EmailSendHandler, IdentityProvisionHandler, MessageSendHandler,
};
use courier_dispatch::infrastructure::{FsBlobStore, LogEmailGateway, LogMessageGateway};
use courier_ledger::{PgAuditSink, PgEventLedger, PgIdentityDirectory};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

fn handler_registry(pool: &PgPool, config: &AppConfig) -> HandlerRegistry {
    HandlerRegistry::builder()
        .register(
            EventKind::IdentityProvision,
            Arc::new(IdentityProvisionHandler::new(Arc::new(
                PgIdentityDirectory::new(pool.clone()),
            ))),
        )
        .register(
            EventKind::EmailSend,
            Arc::new(EmailSendHandler::new(Arc::new(LogEmailGateway))),
        )
        .register(
            EventKind::MessageSend,
            Arc::new(MessageSendHandler::new(Arc::new(LogMessageGateway))),
        )
        .register(
            EventKind::ArchiveDocument,
            Arc::new(DocumentArchivalHandler::new(Arc::new(FsBlobStore::new(
                config.blob_working_root.clone(),
                config.blob_archive_root.clone(),
            )))),
        )
        .build()
}

async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
    shutdown.send_replace(true);
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    info!("Starting Courier outbox dispatcher");
    if let Some(warning) = config.lease_warning() {
        warn!("{warning}");
    }

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    // Build application state.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let jitter: Arc<Mutex<dyn JitterSource + Send>> =
        Arc::new(Mutex::new(RandomJitter::from_os()));
    let ledger = Arc::new(PgEventLedger::new(
        pool.clone(),
        clock.clone(),
        config.retry,
        jitter,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        ledger.clone(),
        Arc::new(PgAuditSink::new(pool.clone())),
        handler_registry(&pool, &config),
        clock.clone(),
        config.dispatch,
    ));
    let app_state = AppState::new(clock, ledger, dispatcher.clone());

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let trigger = config
        .dispatch_interval
        .map(|period| tokio::spawn(scheduler::run_interval(dispatcher, period, shutdown_rx)));

    // Start server.
    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    if let Some(trigger) = trigger
        && let Err(e) = trigger.await
    {
        error!(error = %e, "interval dispatch trigger panicked");
    }
    pool.close().await;
    telemetry::shutdown(tracer_provider);

    Ok(())
}
