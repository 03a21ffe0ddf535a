//! Queue-facing projection handlers for the IAM context.
//!
//! Each handler owns one read model and is registered against every event
//! name that can mutate it. Events of the handler's own aggregate flow
//! through the shared own-aggregate branch; user events reaching the role
//! handler flow through its enrichment branch.

use async_trait::async_trait;
use uuid::Uuid;

use gatehouse_core::aggregate::Aggregate;
use gatehouse_core::error::Error;
use gatehouse_core::event::Event;
use gatehouse_core::handler::EventHandler;
use gatehouse_core::projection::Projection;
use gatehouse_event_store::projections::{ProjectionEventHandler, ProjectionStore};

use crate::domain::aggregates::{Role, User};
use crate::domain::enrichers::{RoleSnapshot, UserSnapshot};
use crate::projections::role::RoleProjection;
use crate::projections::user::UserProjection;

/// Maintains [`UserProjection`] rows from user events.
pub struct UserProjectionHandler {
    store: ProjectionStore<UserProjection>,
}

impl UserProjectionHandler {
    #[must_use]
    pub fn new(store: ProjectionStore<UserProjection>) -> Self {
        Self { store }
    }
}

impl ProjectionEventHandler for UserProjectionHandler {
    type Target = UserProjection;

    const AGGREGATE: &'static str = User::NAME;

    fn store(&self) -> &ProjectionStore<UserProjection> {
        &self.store
    }
}

#[async_trait]
impl EventHandler for UserProjectionHandler {
    fn name(&self) -> &'static str {
        "user-projection"
    }

    async fn handle(&self, event: &Event) -> Result<(), Error> {
        ProjectionEventHandler::handle(self, event).await
    }
}

/// Maintains [`RoleProjection`] rows from role events and, through the
/// enrichment branch, from user events that change role membership.
pub struct RoleProjectionHandler {
    store: ProjectionStore<RoleProjection>,
}

impl RoleProjectionHandler {
    #[must_use]
    pub fn new(store: ProjectionStore<RoleProjection>) -> Self {
        Self { store }
    }

    /// Loads the role's projection, applies the event, and saves. A missing
    /// projection propagates as [`Error::RecordNotFound`]: the role's own
    /// created event is dispatched on another queue and may not have landed
    /// yet.
    async fn apply_to_role(&self, role_id: Uuid, event: &Event) -> Result<(), Error> {
        let mut projection = self.store.get(role_id).await?;
        projection.apply(event)?;
        self.store.save(&projection).await
    }
}

#[async_trait]
impl ProjectionEventHandler for RoleProjectionHandler {
    type Target = RoleProjection;

    const AGGREGATE: &'static str = Role::NAME;

    fn store(&self) -> &ProjectionStore<RoleProjection> {
        &self.store
    }

    async fn apply_enrichment(&self, event: &Event) -> Result<(), Error> {
        // a user snapshot with roles means the change affects every role
        // the user holds
        let user: Option<UserSnapshot> = event.enrichment_as(User::KIND)?;
        if let Some(roles) = user.and_then(|snapshot| snapshot.roles) {
            for role_id in roles {
                self.apply_to_role(role_id, event).await?;
            }
            return Ok(());
        }

        let role: Option<RoleSnapshot> = event.enrichment_as(Role::KIND)?;
        let Some(role) = role else {
            return Err(Error::Internal(format!(
                "{} carries neither a user-with-roles nor a role enrichment",
                event.name
            )));
        };
        self.apply_to_role(role.id, event).await
    }
}

#[async_trait]
impl EventHandler for RoleProjectionHandler {
    fn name(&self) -> &'static str {
        "role-projection"
    }

    async fn handle(&self, event: &Event) -> Result<(), Error> {
        ProjectionEventHandler::handle(self, event).await
    }
}
