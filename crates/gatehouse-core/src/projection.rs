//! Projection abstraction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::dispatch::{self, DispatchTable};
use crate::error::Error;
use crate::event::Event;

/// Trait for denormalized read models maintained incrementally from events.
///
/// A projection has an independent lifecycle from its source aggregate(s):
/// it is created lazily as a zero-value instance on the first relevant
/// event, mutated incrementally, and never reconstructed from scratch.
/// Mutators must be convergent — applying the same event twice is safe for
/// set-style fields (de-duplicate by id).
pub trait Projection: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type name used in error reporting (`"UserProjection"`).
    const KIND: &'static str;

    /// Event-name → mutator table for this projection.
    const MUTATORS: DispatchTable<Self>;

    /// Returns the projection identifier.
    fn id(&self) -> Uuid;

    /// Stamps the last-applied-event time.
    fn set_timestamp(&mut self, timestamp: DateTime<Utc>);

    /// Applies one event through the dispatch table and stamps the
    /// projection's timestamp from the event.
    ///
    /// # Errors
    /// Returns [`Error::MethodNotFound`] when the event name has no mutator;
    /// otherwise whatever the mutator returns.
    fn apply(&mut self, event: &Event) -> Result<(), Error> {
        dispatch::dispatch(Self::KIND, Self::MUTATORS, self, event)?;
        self.set_timestamp(event.timestamp);
        Ok(())
    }
}
