//! Aggregate abstraction.

use uuid::Uuid;

use crate::dispatch::{self, DispatchTable};
use crate::error::Error;
use crate::event::Event;

/// Trait for event-sourced aggregates.
///
/// State changes flow exclusively through [`Aggregate::apply`]: transition
/// methods validate domain rules, construct the event, and hand it here;
/// replay folds stored events through the same path. Transitions also push
/// each applied event onto the uncommitted list for the owning service to
/// persist.
pub trait Aggregate: Sized + Send + Sync + 'static {
    /// Type name used in error reporting (`"User"`).
    const KIND: &'static str;

    /// Lowercase aggregate segment as it appears in event names (`"user"`).
    const NAME: &'static str;

    /// Event-name → mutator table for this aggregate.
    const MUTATORS: DispatchTable<Self>;

    /// Creates the zero-value instance replay starts from.
    #[must_use]
    fn hydrate(id: Uuid) -> Self;

    /// Returns the aggregate identifier.
    fn id(&self) -> Uuid;

    /// Current version; 0 until the first event is applied.
    fn version(&self) -> u64;

    /// Overrides the version (the event store is authoritative after replay).
    fn set_version(&mut self, version: u64);

    /// Events produced by transitions since the last persist.
    fn uncommitted_events(&self) -> &[Event];

    /// Clears the uncommitted list after persistence.
    fn clear_uncommitted_events(&mut self);

    /// Applies one event through the dispatch table and advances the version.
    ///
    /// # Errors
    /// Returns [`Error::MethodNotFound`] when the event name has no mutator;
    /// otherwise whatever the mutator returns.
    fn apply(&mut self, event: &Event) -> Result<(), Error> {
        dispatch::dispatch(Self::KIND, Self::MUTATORS, self, event)?;
        self.set_version(self.version() + 1);
        Ok(())
    }
}
