//! Append/replay event store.

use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use gatehouse_core::aggregate::Aggregate;
use gatehouse_core::error::Error;
use gatehouse_core::event::{Event, EventLogRecord};
use gatehouse_core::table::{KeyValueTable, ListFilter, SaveCondition};

/// Append-only event log with optimistic concurrency.
///
/// Records key on the `(id, version)` pair carried in the event envelope; a
/// conditional insert that finds the slot taken means a concurrent writer
/// won the race.
pub struct EventStore {
    table: Arc<dyn KeyValueTable>,
    table_name: String,
}

impl EventStore {
    #[must_use]
    pub fn new(table: Arc<dyn KeyValueTable>, table_name: String) -> Self {
        Self { table, table_name }
    }

    /// Appends one event to the log.
    ///
    /// The producing transition must already have stamped the event's
    /// version and timestamp.
    ///
    /// # Errors
    /// Returns [`Error::ConcurrencyConflict`] when the `(id, version)` slot
    /// is already taken, [`Error::Validation`] for an unstamped version, and
    /// [`Error::Internal`] on storage failure.
    pub async fn append(&self, event: &Event) -> Result<(), Error> {
        if event.version == 0 {
            return Err(Error::Validation(format!(
                "event {} has no stamped version",
                event.name
            )));
        }
        let image = EventLogRecord::new(event.clone()).to_image()?;
        match self
            .table
            .save(&self.table_name, image, SaveCondition::MustNotExist)
            .await
        {
            Ok(()) => Ok(()),
            Err(Error::UniqueConstraintViolated(_)) => Err(Error::ConcurrencyConflict {
                aggregate_id: event.id,
                version: event.version,
            }),
            Err(other) => {
                error!(
                    event_name = %event.name,
                    aggregate_id = %event.id,
                    version = event.version,
                    error = %other,
                    "event append failed"
                );
                Err(other)
            }
        }
    }

    /// Reconstructs an aggregate from its full event history.
    ///
    /// Fetches every log record for the id with no result cap, folds them in
    /// version order through the aggregate's dispatch, and forces the final
    /// version to the last record's (the store is authoritative). Returns
    /// `None` when no records exist.
    ///
    /// # Errors
    /// Returns [`Error::MethodNotFound`] when a stored event has no mutator
    /// and [`Error::Internal`] on storage or decode failure.
    pub async fn replay<A: Aggregate>(&self, aggregate_id: Uuid) -> Result<Option<A>, Error> {
        let filter = ListFilter {
            contains: Some(format!("id:{aggregate_id}")),
            limit: None,
        };
        let images = self.table.list(&self.table_name, filter).await?;
        if images.is_empty() {
            return Ok(None);
        }
        let mut records = Vec::with_capacity(images.len());
        for image in &images {
            records.push(EventLogRecord::from_image(image)?);
        }
        records.sort_by_key(EventLogRecord::version);

        let mut aggregate = A::hydrate(aggregate_id);
        for record in &records {
            aggregate.apply(&record.event)?;
        }
        if let Some(last) = records.last() {
            aggregate.set_version(last.version());
        }
        Ok(Some(aggregate))
    }
}
