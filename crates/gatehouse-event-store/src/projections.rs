//! Read-model storage and the projection event handler skeleton.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use gatehouse_core::error::Error;
use gatehouse_core::event::Event;
use gatehouse_core::projection::Projection;
use gatehouse_core::table::{KeyValueTable, ListFilter, SaveCondition};

/// Typed storage for one projection kind.
pub struct ProjectionStore<P> {
    table: Arc<dyn KeyValueTable>,
    table_name: String,
    _kind: PhantomData<P>,
}

impl<P: Projection> ProjectionStore<P> {
    #[must_use]
    pub fn new(table: Arc<dyn KeyValueTable>, table_name: String) -> Self {
        Self {
            table,
            table_name,
            _kind: PhantomData,
        }
    }

    /// Loads one projection by id.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] when no row exists and
    /// [`Error::Internal`] on storage or decode failure.
    pub async fn get(&self, id: Uuid) -> Result<P, Error> {
        let image = self
            .table
            .get(&self.table_name, "id", &id.to_string())
            .await?;
        let Some(image) = image else {
            return Err(Error::RecordNotFound(format!("{} {id}", P::KIND)));
        };
        serde_json::from_value(image)
            .map_err(|source| Error::Internal(format!("decoding {} {id}: {source}", P::KIND)))
    }

    /// Upserts one projection.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on storage or encode failure.
    pub async fn save(&self, projection: &P) -> Result<(), Error> {
        let image = serde_json::to_value(projection)
            .map_err(|source| Error::Internal(format!("encoding {}: {source}", P::KIND)))?;
        self.table
            .save(&self.table_name, image, SaveCondition::None)
            .await
    }

    /// Lists projections matching `filter`; the limit is capped at 100.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on storage or decode failure.
    pub async fn list(&self, mut filter: ListFilter) -> Result<Vec<P>, Error> {
        filter.limit = Some(filter.limit.map_or(100, |limit| limit.min(100)));
        let images = self.table.list(&self.table_name, filter).await?;
        let mut projections = Vec::with_capacity(images.len());
        for image in images {
            let projection = serde_json::from_value(image)
                .map_err(|source| Error::Internal(format!("decoding {}: {source}", P::KIND)))?;
            projections.push(projection);
        }
        Ok(projections)
    }
}

/// Routes inbound events to a projection, by ownership.
///
/// An event whose aggregate segment matches [`Self::AGGREGATE`] is applied
/// to the handler's own projection (created from zero on first sight);
/// anything else lands in the enrichment branch, which concrete handlers
/// override when they maintain read models fed by other aggregates' events.
#[async_trait]
pub trait ProjectionEventHandler: Send + Sync {
    /// The read model this handler maintains.
    type Target: Projection;

    /// Lowercase aggregate segment this handler owns (`"user"`).
    const AGGREGATE: &'static str;

    /// Storage for [`Self::Target`].
    fn store(&self) -> &ProjectionStore<Self::Target>;

    /// Routes one event to the own-aggregate or enrichment branch.
    ///
    /// # Errors
    /// Whatever the selected branch returns.
    async fn handle(&self, event: &Event) -> Result<(), Error> {
        if event.aggregate() == Some(Self::AGGREGATE) {
            self.apply_own(event).await
        } else {
            self.apply_enrichment(event).await
        }
    }

    /// Own-aggregate branch: load by the event's id, treating "not found" as
    /// the first event, apply, upsert.
    ///
    /// # Errors
    /// Propagates load errors other than [`Error::RecordNotFound`], dispatch
    /// errors, and save failures.
    async fn apply_own(&self, event: &Event) -> Result<(), Error> {
        let mut projection = match self.store().get(event.id).await {
            Ok(existing) => existing,
            Err(Error::RecordNotFound(_)) => Self::Target::default(),
            Err(other) => return Err(other),
        };
        projection.apply(event)?;
        self.store().save(&projection).await
    }

    /// Enrichment branch: a required extension point for handlers registered
    /// against other aggregates' events. The default fails loudly.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] unless overridden.
    async fn apply_enrichment(&self, event: &Event) -> Result<(), Error> {
        Err(Error::Internal(format!(
            "{} received {} but implements no enrichment branch",
            Self::Target::KIND,
            event.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use gatehouse_core::dispatch::DispatchTable;
    use gatehouse_test_support::FailingTable;

    use crate::memory::MemoryTable;

    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct TallyProjection {
        id: Uuid,
        timestamp: Option<DateTime<Utc>>,
        count: u32,
    }

    fn apply_bumped(projection: &mut TallyProjection, event: &Event) -> Result<(), Error> {
        projection.id = event.id;
        projection.count += 1;
        Ok(())
    }

    impl Projection for TallyProjection {
        const KIND: &'static str = "TallyProjection";
        const MUTATORS: DispatchTable<Self> = &[("org/test/tally/bumped", apply_bumped)];

        fn id(&self) -> Uuid {
            self.id
        }

        fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
            self.timestamp = Some(timestamp);
        }
    }

    struct TallyHandler {
        store: ProjectionStore<TallyProjection>,
    }

    impl ProjectionEventHandler for TallyHandler {
        type Target = TallyProjection;
        const AGGREGATE: &'static str = "tally";

        fn store(&self) -> &ProjectionStore<TallyProjection> {
            &self.store
        }
    }

    fn memory_store() -> ProjectionStore<TallyProjection> {
        let table = MemoryTable::new();
        table.declare("tallies", &["id"]);
        ProjectionStore::new(Arc::new(table), "tallies".to_owned())
    }

    fn bumped_event(id: Uuid) -> Event {
        Event::new("org/test/tally/bumped", id, 1, Utc::now(), None, &json!({})).unwrap()
    }

    #[tokio::test]
    async fn test_own_branch_creates_the_projection_on_first_event() {
        // Arrange
        let handler = TallyHandler {
            store: memory_store(),
        };
        let id = Uuid::new_v4();

        // Act
        handler.handle(&bumped_event(id)).await.unwrap();

        // Assert
        let projection = handler.store().get(id).await.unwrap();
        assert_eq!(projection.id, id);
        assert_eq!(projection.count, 1);
        assert!(projection.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_own_branch_mutates_the_existing_projection() {
        // Arrange
        let handler = TallyHandler {
            store: memory_store(),
        };
        let id = Uuid::new_v4();

        // Act
        handler.handle(&bumped_event(id)).await.unwrap();
        handler.handle(&bumped_event(id)).await.unwrap();

        // Assert
        let projection = handler.store().get(id).await.unwrap();
        assert_eq!(projection.count, 2);
    }

    #[tokio::test]
    async fn test_load_failures_other_than_not_found_propagate() {
        // Arrange
        let handler = TallyHandler {
            store: ProjectionStore::new(Arc::new(FailingTable), "tallies".to_owned()),
        };

        // Act
        let result = handler.handle(&bumped_event(Uuid::new_v4())).await;

        // Assert
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_foreign_event_without_an_override_fails_loudly() {
        // Arrange
        let handler = TallyHandler {
            store: memory_store(),
        };
        let event = Event::new(
            "org/test/other/changed",
            Uuid::new_v4(),
            1,
            Utc::now(),
            None,
            &json!({}),
        )
        .unwrap();

        // Act
        let result = handler.handle(&event).await;

        // Assert
        match result {
            Err(Error::Internal(message)) => {
                assert!(message.contains("no enrichment branch"), "{message}");
            }
            other => panic!("expected Internal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_applies_the_requested_limit() {
        // Arrange
        let store = memory_store();
        for _ in 0..3 {
            let projection = TallyProjection {
                id: Uuid::new_v4(),
                ..TallyProjection::default()
            };
            store.save(&projection).await.unwrap();
        }

        // Act
        let listed = store
            .list(ListFilter {
                contains: None,
                limit: Some(2),
            })
            .await
            .unwrap();
        let unbounded = store.list(ListFilter::default()).await.unwrap();

        // Assert
        assert_eq!(listed.len(), 2);
        assert_eq!(unbounded.len(), 3);
    }
}
