//! Event enrichment.

use crate::error::Error;
use crate::event::Event;

/// Attaches point-in-time snapshots of related aggregates to an event.
///
/// The domain service looks up the policy for the event it just produced and
/// runs it strictly before publish; the event store never distinguishes
/// enriched events. Snapshots are captured once, from the in-memory
/// aggregates that triggered the event, and never re-fetched.
pub trait Enricher {
    /// Returns the event with its `enrichment_data` populated.
    ///
    /// # Errors
    /// Policies surface their own failures, typically
    /// [`Error::Internal`] for snapshots that cannot be serialized.
    fn enrich(&self, event: Event) -> Result<Event, Error>;
}
