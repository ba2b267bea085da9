//! Shared application state.

use std::sync::Arc;

use courier_core::clock::Clock;
use courier_core::ledger::EventLedger;
use courier_dispatch::application::dispatcher::Dispatcher;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock used for backlog age calculations.
    pub clock: Arc<dyn Clock>,
    /// Outbox ledger.
    pub ledger: Arc<dyn EventLedger>,
    /// Dispatch loop run by the invocation endpoint.
    pub dispatcher: Arc<Dispatcher>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        ledger: Arc<dyn EventLedger>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            clock,
            ledger,
            dispatcher,
        }
    }
}
