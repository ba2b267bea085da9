//! Lookup table from event kind to handler.

use std::collections::HashMap;
use std::sync::Arc;

use courier_core::event::EventKind;

use super::handler::{Handler, HandlerError};

/// Immutable map from [`EventKind`] to handler, built once at startup and
/// passed into the dispatcher.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Arc<dyn Handler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(EventKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

impl HandlerRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Returns the handler for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `HandlerError::NoHandler` when nothing is registered, which
    /// is always the case for [`EventKind::Unrecognized`].
    pub fn lookup(&self, kind: &EventKind) -> Result<Arc<dyn Handler>, HandlerError> {
        self.handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| HandlerError::NoHandler {
                kind: kind.to_string(),
            })
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Builder for [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<EventKind, Arc<dyn Handler>>,
}

impl HandlerRegistryBuilder {
    /// Registers `handler` for `kind`, replacing any earlier registration.
    ///
    /// Registering [`EventKind::Unrecognized`] is ignored so unknown kinds
    /// always take the visible "no handler" path.
    #[must_use]
    pub fn register(mut self, kind: EventKind, handler: Arc<dyn Handler>) -> Self {
        if matches!(kind, EventKind::Unrecognized(_)) {
            tracing::warn!(kind = %kind, "refusing to register handler for unrecognized kind");
            return self;
        }
        self.handlers.insert(kind, handler);
        self
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}
