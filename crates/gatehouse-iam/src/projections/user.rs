//! User read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatehouse_core::aggregate::Aggregate;
use gatehouse_core::dispatch::DispatchTable;
use gatehouse_core::error::Error;
use gatehouse_core::event::Event;
use gatehouse_core::projection::Projection;

use crate::domain::aggregates::Role;
use crate::domain::enrichers::RoleSnapshot;
use crate::domain::events::{
    USER_DISABLED_EVENT_NAME, USER_REGISTERED_EVENT_NAME, USER_ROLE_ADDED_EVENT_NAME,
    USER_ROLE_REMOVED_EVENT_NAME, USER_UPDATED_EVENT_NAME, UserRegistered, UserRoleAdded,
    UserRoleRemoved, UserUpdated,
};

/// A role granted to a user, as shown on the user read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    /// The role's identifier.
    pub id: Uuid,
    /// The role's name at grant time.
    pub name: String,
}

/// Denormalized view of a user, maintained from the five user events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProjection {
    /// The user's identifier.
    pub id: Uuid,
    /// Time of the last applied event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Registered email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// First name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Whether the user has been disabled.
    pub disabled: bool,
    /// The user's granted roles, with names captured from enrichment.
    pub roles: Vec<RoleSummary>,
}

impl UserProjection {
    fn when_registered(&mut self, event: &Event) -> Result<(), Error> {
        let payload: UserRegistered = event.payload_as()?;
        self.id = event.id;
        self.email = Some(payload.email);
        Ok(())
    }

    fn when_updated(&mut self, event: &Event) -> Result<(), Error> {
        let payload: UserUpdated = event.payload_as()?;
        self.first_name = Some(payload.first_name);
        self.last_name = Some(payload.last_name);
        Ok(())
    }

    fn when_disabled(&mut self, _event: &Event) -> Result<(), Error> {
        self.disabled = true;
        Ok(())
    }

    fn when_role_added(&mut self, event: &Event) -> Result<(), Error> {
        let payload: UserRoleAdded = event.payload_as()?;
        let snapshot: RoleSnapshot = event
            .enrichment_as(Role::KIND)?
            .ok_or_else(|| {
                Error::Internal(format!("{} carries no role enrichment", event.name))
            })?;
        let name = snapshot.name.ok_or_else(|| {
            Error::Internal(format!("role enrichment on {} has no name", event.name))
        })?;
        // de-duplicate on redelivery
        self.roles.retain(|role| role.id != payload.role_id);
        self.roles.push(RoleSummary {
            id: payload.role_id,
            name,
        });
        Ok(())
    }

    fn when_role_removed(&mut self, event: &Event) -> Result<(), Error> {
        let payload: UserRoleRemoved = event.payload_as()?;
        self.roles.retain(|role| role.id != payload.role_id);
        Ok(())
    }
}

impl Projection for UserProjection {
    const KIND: &'static str = "UserProjection";
    const MUTATORS: DispatchTable<Self> = &[
        (USER_REGISTERED_EVENT_NAME, Self::when_registered),
        (USER_UPDATED_EVENT_NAME, Self::when_updated),
        (USER_DISABLED_EVENT_NAME, Self::when_disabled),
        (USER_ROLE_ADDED_EVENT_NAME, Self::when_role_added),
        (USER_ROLE_REMOVED_EVENT_NAME, Self::when_role_removed),
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = Some(timestamp);
    }
}
