//! Role read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatehouse_core::aggregate::Aggregate;
use gatehouse_core::dispatch::DispatchTable;
use gatehouse_core::error::Error;
use gatehouse_core::event::Event;
use gatehouse_core::projection::Projection;

use crate::domain::aggregates::User;
use crate::domain::enrichers::UserSnapshot;
use crate::domain::events::{
    ROLE_CREATED_EVENT_NAME, ROLE_DISABLED_EVENT_NAME, RoleCreated, USER_ROLE_ADDED_EVENT_NAME,
    USER_ROLE_REMOVED_EVENT_NAME, USER_UPDATED_EVENT_NAME,
};

/// A user holding a role, as shown on the role read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// The user's identifier.
    pub id: Uuid,
    /// First name, when known at snapshot time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name, when known at snapshot time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email, when known at snapshot time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserSummary {
    fn from_snapshot(snapshot: UserSnapshot) -> Self {
        Self {
            id: snapshot.id,
            first_name: snapshot.first_name,
            last_name: snapshot.last_name,
            email: snapshot.email,
        }
    }
}

/// Denormalized view of a role and the users holding it.
///
/// The member list is maintained entirely from user-event enrichment; this
/// store never reads the user store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleProjection {
    /// The role's identifier.
    pub id: Uuid,
    /// Time of the last applied event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// The role's name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the role has been disabled.
    pub disabled: bool,
    /// Users currently holding the role.
    pub users: Vec<UserSummary>,
}

impl RoleProjection {
    fn user_snapshot(event: &Event) -> Result<UserSnapshot, Error> {
        event.enrichment_as(User::KIND)?.ok_or_else(|| {
            Error::Internal(format!("{} carries no user enrichment", event.name))
        })
    }

    fn when_created(&mut self, event: &Event) -> Result<(), Error> {
        let payload: RoleCreated = event.payload_as()?;
        self.id = event.id;
        self.name = Some(payload.name);
        Ok(())
    }

    fn when_disabled(&mut self, _event: &Event) -> Result<(), Error> {
        self.disabled = true;
        Ok(())
    }

    fn when_user_role_added(&mut self, event: &Event) -> Result<(), Error> {
        let snapshot = Self::user_snapshot(event)?;
        // de-duplicate on redelivery
        self.users.retain(|user| user.id != snapshot.id);
        self.users.push(UserSummary::from_snapshot(snapshot));
        Ok(())
    }

    fn when_user_updated(&mut self, event: &Event) -> Result<(), Error> {
        let snapshot = Self::user_snapshot(event)?;
        let summary = UserSummary::from_snapshot(snapshot);
        match self.users.iter_mut().find(|user| user.id == summary.id) {
            Some(existing) => *existing = summary,
            // membership can lag the grant under cross-queue delivery;
            // treat the update as the grant we have not seen yet
            None => self.users.push(summary),
        }
        Ok(())
    }

    fn when_user_role_removed(&mut self, event: &Event) -> Result<(), Error> {
        self.users.retain(|user| user.id != event.id);
        Ok(())
    }
}

impl Projection for RoleProjection {
    const KIND: &'static str = "RoleProjection";
    const MUTATORS: DispatchTable<Self> = &[
        (ROLE_CREATED_EVENT_NAME, Self::when_created),
        (ROLE_DISABLED_EVENT_NAME, Self::when_disabled),
        (USER_ROLE_ADDED_EVENT_NAME, Self::when_user_role_added),
        (USER_UPDATED_EVENT_NAME, Self::when_user_updated),
        (USER_ROLE_REMOVED_EVENT_NAME, Self::when_user_role_removed),
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = Some(timestamp);
    }
}
