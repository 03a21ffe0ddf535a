//! Handler registry: immutable event-name → handler mapping.

use std::collections::HashMap;
use std::sync::Arc;

use gatehouse_core::handler::EventHandler;

/// Builder for [`HandlerRegistry`].
///
/// Registration happens explicitly, once, during process composition; the
/// built registry never changes afterwards.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistryBuilder {
    /// Registers a handler for each of the given event names.
    ///
    /// A handler already registered under a name (same handler name) is not
    /// added twice; otherwise handlers keep registration order.
    #[must_use]
    pub fn register(mut self, event_names: &[&str], handler: Arc<dyn EventHandler>) -> Self {
        for name in event_names {
            let entry = self.handlers.entry((*name).to_owned()).or_default();
            if entry.iter().any(|existing| existing.name() == handler.name()) {
                continue;
            }
            entry.push(Arc::clone(&handler));
        }
        self
    }

    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}

/// The immutable mapping the dispatcher consults per message.
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Handlers registered for an event name, in registration order.
    #[must_use]
    pub fn handlers_for(&self, event_name: &str) -> &[Arc<dyn EventHandler>] {
        self.handlers.get(event_name).map_or(&[], Vec::as_slice)
    }
}
