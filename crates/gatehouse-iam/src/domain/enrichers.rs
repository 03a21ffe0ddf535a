//! Enrichment policies for user events.
//!
//! Each policy attaches partial snapshots of the aggregates a downstream
//! projection needs, captured from the in-memory instances the service
//! already holds. Snapshot field sets are deliberately minimal per event.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatehouse_core::aggregate::Aggregate;
use gatehouse_core::enrich::Enricher;
use gatehouse_core::error::Error;
use gatehouse_core::event::{EnrichmentData, Event};

use super::aggregates::{Role, User};

/// Partial view of a user carried in enrichment data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    /// The user's identifier.
    pub id: Uuid,
    /// First name, when the policy includes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name, when the policy includes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email, when the policy includes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Granted role ids, when the policy includes them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Uuid>>,
}

/// Partial view of a role carried in enrichment data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSnapshot {
    /// The role's identifier.
    pub id: Uuid,
    /// Role name, when the policy includes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn push_snapshot<S: Serialize>(
    event: &mut Event,
    aggregate_name: &str,
    snapshot: &S,
) -> Result<(), Error> {
    let data = serde_json::to_value(snapshot).map_err(|source| {
        Error::Internal(format!("serializing {aggregate_name} snapshot: {source}"))
    })?;
    event.enrichment_data.push(EnrichmentData {
        aggregate_name: aggregate_name.to_owned(),
        data,
    });
    Ok(())
}

/// Attaches the full user snapshot, granted roles included, so role
/// projections can fan the update out to every role the user holds.
pub struct UserUpdatedEnricher<'a> {
    /// The user whose update triggered the event.
    pub user: &'a User,
}

impl Enricher for UserUpdatedEnricher<'_> {
    fn enrich(&self, mut event: Event) -> Result<Event, Error> {
        push_snapshot(
            &mut event,
            User::KIND,
            &UserSnapshot {
                id: self.user.id,
                first_name: self.user.first_name.clone(),
                last_name: self.user.last_name.clone(),
                email: Some(self.user.email.clone()),
                roles: Some(self.user.roles.iter().copied().collect()),
            },
        )?;
        Ok(event)
    }
}

/// Attaches the user's contact fields and the granted role's name.
pub struct UserRoleAddedEnricher<'a> {
    /// The user receiving the role.
    pub user: &'a User,
    /// The granted role.
    pub role: &'a Role,
}

impl Enricher for UserRoleAddedEnricher<'_> {
    fn enrich(&self, mut event: Event) -> Result<Event, Error> {
        push_snapshot(
            &mut event,
            User::KIND,
            &UserSnapshot {
                id: self.user.id,
                first_name: self.user.first_name.clone(),
                last_name: self.user.last_name.clone(),
                email: Some(self.user.email.clone()),
                roles: None,
            },
        )?;
        push_snapshot(
            &mut event,
            Role::KIND,
            &RoleSnapshot {
                id: self.role.id,
                name: Some(self.role.name.clone()),
            },
        )?;
        Ok(event)
    }
}

/// Attaches only the two identifiers; removal needs nothing else downstream.
pub struct UserRoleRemovedEnricher<'a> {
    /// The user losing the role.
    pub user: &'a User,
    /// The revoked role.
    pub role: &'a Role,
}

impl Enricher for UserRoleRemovedEnricher<'_> {
    fn enrich(&self, mut event: Event) -> Result<Event, Error> {
        push_snapshot(
            &mut event,
            User::KIND,
            &UserSnapshot {
                id: self.user.id,
                first_name: None,
                last_name: None,
                email: None,
                roles: None,
            },
        )?;
        push_snapshot(
            &mut event,
            Role::KIND,
            &RoleSnapshot {
                id: self.role.id,
                name: None,
            },
        )?;
        Ok(event)
    }
}
