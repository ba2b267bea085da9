//! Built-in interval trigger for the dispatch loop.
//!
//! Runs one batch per tick until the shutdown channel flips. A batch in
//! progress when shutdown arrives is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use courier_dispatch::application::dispatcher::Dispatcher;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Runs `dispatcher` every `period` until `shutdown` reports `true` or its
/// sender is dropped.
pub async fn run_interval(
    dispatcher: Arc<Dispatcher>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_secs = period.as_secs(), "interval dispatch trigger started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = dispatcher.run_batch(None).await {
                    error!(error = %e, "scheduled dispatch failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("interval dispatch trigger stopped");
}
