//! Event handler abstraction.

use async_trait::async_trait;

use crate::error::Error;
use crate::event::Event;

/// A consumer invoked by the queue dispatcher for registered event names.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable identifier, used for registry de-duplication and logging.
    fn name(&self) -> &'static str;

    /// Handles one event.
    ///
    /// # Errors
    /// Implementations surface their own failures; the dispatcher logs them
    /// with full context and moves on without aborting sibling handlers.
    async fn handle(&self, event: &Event) -> Result<(), Error>;
}
