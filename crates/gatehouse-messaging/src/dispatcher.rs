//! Queue dispatcher: messages to registered handlers, failures isolated.

use std::sync::Arc;

use tracing::{error, warn};

use gatehouse_core::event::Event;
use gatehouse_core::queue::QueueMessage;

use crate::registry::HandlerRegistry;

/// Invokes every registered handler for each queue message.
///
/// Failure handling is per handler and per message: a failed handler is
/// logged with full context and the remaining handlers and messages still
/// run. Nothing is retried here; the dispatcher only reports which
/// messages were fully handled, and the caller acknowledges those and
/// leaves the rest queued for redelivery.
pub struct QueueDispatcher {
    registry: Arc<HandlerRegistry>,
}

impl QueueDispatcher {
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatches one message to every registered handler; returns whether
    /// the message may be acknowledged.
    ///
    /// An undecodable body can never succeed and reports `true` so it is
    /// dropped rather than left to block its queue. A handler failure
    /// reports `false`, leaving the message for redelivery; the handlers
    /// that did succeed will run again, so their apply logic must converge
    /// on repeats.
    #[must_use]
    pub async fn dispatch(&self, message: &QueueMessage) -> bool {
        let event: Event = match serde_json::from_str(&message.body) {
            Ok(event) => event,
            Err(source) => {
                error!(
                    message_id = %message.id,
                    error = %source,
                    "discarding undecodable queue message"
                );
                return true;
            }
        };
        let handlers = self.registry.handlers_for(&event.name);
        if handlers.is_empty() {
            warn!(event_name = %event.name, "no handlers registered for event");
            return true;
        }
        let mut handled = true;
        for handler in handlers {
            if let Err(error) = handler.handle(&event).await {
                error!(
                    handler = handler.name(),
                    event_name = %event.name,
                    event_id = %event.id,
                    message_id = %message.id,
                    error = %error,
                    "event handler failed"
                );
                handled = false;
            }
        }
        handled
    }

    /// Dispatches a batch in order; returns the ids of the fully handled
    /// messages.
    ///
    /// A failed message does not stop the rest of the batch.
    #[must_use]
    pub async fn dispatch_batch(&self, messages: &[QueueMessage]) -> Vec<String> {
        let mut handled = Vec::new();
        for message in messages {
            if self.dispatch(message).await {
                handled.push(message.id.clone());
            }
        }
        handled
    }
}
