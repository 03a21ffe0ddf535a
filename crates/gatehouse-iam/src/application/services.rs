//! Domain services for the IAM context.
//!
//! Each command flow is: replay the aggregate (or run its creation
//! transition), execute the transition, enrich the produced events where a
//! policy applies, append every uncommitted event, clear. Creation flows
//! additionally reserve a uniqueness constraint first and release it again
//! if the append fails.

use std::sync::Arc;

use uuid::Uuid;

use gatehouse_core::aggregate::Aggregate;
use gatehouse_core::clock::Clock;
use gatehouse_core::enrich::Enricher;
use gatehouse_core::error::Error;
use gatehouse_core::event::Event;
use gatehouse_event_store::constraints::{ConstraintScope, ConstraintStore};
use gatehouse_event_store::store::EventStore;

use crate::domain::aggregates::{Role, User};
use crate::domain::commands::{
    AddUserRole, CreateRole, DisableRole, DisableUser, RegisterUser, RemoveUserRole, UpdateUser,
};
use crate::domain::enrichers::{
    UserRoleAddedEnricher, UserRoleRemovedEnricher, UserUpdatedEnricher,
};
use crate::domain::events::{ROLE_CREATED_EVENT_NAME, USER_REGISTERED_EVENT_NAME};

fn enrich_events(enricher: &dyn Enricher, events: &[Event]) -> Result<Vec<Event>, Error> {
    events
        .iter()
        .map(|event| enricher.enrich(event.clone()))
        .collect()
}

/// Appends every event in order; on the first failure, releases the
/// reserved constraint (if any) and surfaces the append error.
async fn commit_events(
    store: &EventStore,
    constraints: &ConstraintStore,
    events: &[Event],
    reserved: Option<&str>,
) -> Result<(), Error> {
    for event in events {
        if let Err(error) = store.append(event).await {
            if let Some(key) = reserved
                && let Err(cleanup) = constraints.remove(key).await
            {
                tracing::error!(
                    constraint = key,
                    error = %cleanup,
                    "failed to release constraint after append failure"
                );
            }
            return Err(error);
        }
    }
    Ok(())
}

/// Command side of the user aggregate.
pub struct UserService {
    events: Arc<EventStore>,
    constraints: Arc<ConstraintStore>,
    roles: Arc<RoleService>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    #[must_use]
    pub fn new(
        events: Arc<EventStore>,
        constraints: Arc<ConstraintStore>,
        roles: Arc<RoleService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            constraints,
            roles,
            clock,
        }
    }

    /// Replays the user from the event log.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] when no events exist for the id.
    pub async fn get_aggregate_root(&self, id: Uuid) -> Result<User, Error> {
        self.events.replay::<User>(id).await?.ok_or_else(|| {
            Error::RecordNotFound(format!(
                "aggregate {} with id {id} not found",
                User::KIND
            ))
        })
    }

    /// Registers a new user, reserving the email as unique per aggregate
    /// type.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a malformed email,
    /// [`Error::UniqueConstraintViolated`] for an already-registered one,
    /// and append errors otherwise.
    pub async fn register(&self, command: &RegisterUser) -> Result<(), Error> {
        let mut user = User::register(
            command.id,
            &command.email,
            command.correlation_id,
            self.clock.as_ref(),
        )?;
        let reserved = match self
            .constraints
            .insert(
                USER_REGISTERED_EVENT_NAME,
                ConstraintScope::Aggregate,
                "email",
                &user.email,
            )
            .await
        {
            Ok(key) => key,
            Err(Error::UniqueConstraintViolated(_)) => {
                return Err(Error::UniqueConstraintViolated(format!(
                    "{} is already registered",
                    user.email
                )));
            }
            Err(other) => return Err(other),
        };
        commit_events(
            &self.events,
            &self.constraints,
            user.uncommitted_events(),
            Some(&reserved),
        )
        .await?;
        user.clear_uncommitted_events();
        Ok(())
    }

    /// Updates the user's name and publishes the enriched event.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] for an unknown user,
    /// [`Error::Validation`] from the transition, and append errors
    /// otherwise.
    pub async fn update(&self, command: &UpdateUser) -> Result<(), Error> {
        let mut user = self.get_aggregate_root(command.id).await?;
        user.update(
            &command.first_name,
            &command.last_name,
            command.correlation_id,
            self.clock.as_ref(),
        )?;
        let enriched = enrich_events(
            &UserUpdatedEnricher { user: &user },
            user.uncommitted_events(),
        )?;
        commit_events(&self.events, &self.constraints, &enriched, None).await?;
        user.clear_uncommitted_events();
        Ok(())
    }

    /// Grants a role to the user. The role is loaded first so it must exist
    /// and its data can be attached for enrichment.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] for an unknown user or role,
    /// [`Error::Validation`] from the transition, and append errors
    /// otherwise.
    pub async fn add_role(&self, command: &AddUserRole) -> Result<(), Error> {
        let mut user = self.get_aggregate_root(command.id).await?;
        let role = self.roles.get_aggregate_root(command.role_id).await?;
        user.add_role(command.role_id, command.correlation_id, self.clock.as_ref())?;
        let enriched = enrich_events(
            &UserRoleAddedEnricher {
                user: &user,
                role: &role,
            },
            user.uncommitted_events(),
        )?;
        commit_events(&self.events, &self.constraints, &enriched, None).await?;
        user.clear_uncommitted_events();
        Ok(())
    }

    /// Revokes a role from the user.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] for an unknown user or role,
    /// [`Error::Validation`] from the transition, and append errors
    /// otherwise.
    pub async fn remove_role(&self, command: &RemoveUserRole) -> Result<(), Error> {
        let mut user = self.get_aggregate_root(command.id).await?;
        let role = self.roles.get_aggregate_root(command.role_id).await?;
        user.remove_role(command.role_id, command.correlation_id, self.clock.as_ref())?;
        let enriched = enrich_events(
            &UserRoleRemovedEnricher {
                user: &user,
                role: &role,
            },
            user.uncommitted_events(),
        )?;
        commit_events(&self.events, &self.constraints, &enriched, None).await?;
        user.clear_uncommitted_events();
        Ok(())
    }

    /// Disables the user.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] for an unknown user,
    /// [`Error::Validation`] when already disabled, and append errors
    /// otherwise.
    pub async fn disable(&self, command: &DisableUser) -> Result<(), Error> {
        let mut user = self.get_aggregate_root(command.id).await?;
        user.disable(command.correlation_id, self.clock.as_ref())?;
        commit_events(
            &self.events,
            &self.constraints,
            user.uncommitted_events(),
            None,
        )
        .await?;
        user.clear_uncommitted_events();
        Ok(())
    }
}

/// Command side of the role aggregate.
pub struct RoleService {
    events: Arc<EventStore>,
    constraints: Arc<ConstraintStore>,
    clock: Arc<dyn Clock>,
}

impl RoleService {
    #[must_use]
    pub fn new(
        events: Arc<EventStore>,
        constraints: Arc<ConstraintStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            constraints,
            clock,
        }
    }

    /// Replays the role from the event log.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] when no events exist for the id.
    pub async fn get_aggregate_root(&self, id: Uuid) -> Result<Role, Error> {
        self.events.replay::<Role>(id).await?.ok_or_else(|| {
            Error::RecordNotFound(format!(
                "aggregate {} with id {id} not found",
                Role::KIND
            ))
        })
    }

    /// Creates a new role, reserving the name as unique per aggregate type.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a malformed name,
    /// [`Error::UniqueConstraintViolated`] for a taken one, and append
    /// errors otherwise.
    pub async fn create(&self, command: &CreateRole) -> Result<(), Error> {
        let mut role = Role::create(
            command.id,
            &command.name,
            command.correlation_id,
            self.clock.as_ref(),
        )?;
        let reserved = match self
            .constraints
            .insert(
                ROLE_CREATED_EVENT_NAME,
                ConstraintScope::Aggregate,
                "name",
                &role.name,
            )
            .await
        {
            Ok(key) => key,
            Err(Error::UniqueConstraintViolated(_)) => {
                return Err(Error::UniqueConstraintViolated(format!(
                    "{} already exists",
                    role.name
                )));
            }
            Err(other) => return Err(other),
        };
        commit_events(
            &self.events,
            &self.constraints,
            role.uncommitted_events(),
            Some(&reserved),
        )
        .await?;
        role.clear_uncommitted_events();
        Ok(())
    }

    /// Disables the role.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] for an unknown role,
    /// [`Error::Validation`] when already disabled, and append errors
    /// otherwise.
    pub async fn disable(&self, command: &DisableRole) -> Result<(), Error> {
        let mut role = self.get_aggregate_root(command.id).await?;
        role.disable(command.correlation_id, self.clock.as_ref())?;
        commit_events(
            &self.events,
            &self.constraints,
            role.uncommitted_events(),
            None,
        )
        .await?;
        role.clear_uncommitted_events();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use gatehouse_test_support::FixedClock;
    use serde_json::Value;

    use gatehouse_core::table::{KeyValueTable, ListFilter};
    use gatehouse_event_store::memory::MemoryTable;

    use super::*;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn services() -> (UserService, Arc<RoleService>, Arc<MemoryTable>) {
        let table = Arc::new(MemoryTable::new());
        table.declare("event-log", &["id", "version"]);
        table.declare("constraints", &["constraint"]);
        let events = Arc::new(EventStore::new(table.clone(), "event-log".to_owned()));
        let constraints = Arc::new(ConstraintStore::new(
            table.clone(),
            "constraints".to_owned(),
        ));
        let clock = Arc::new(clock());
        let roles = Arc::new(RoleService::new(
            events.clone(),
            constraints.clone(),
            clock.clone(),
        ));
        let users = UserService::new(events, constraints, roles.clone(), clock);
        (users, roles, table)
    }

    async fn logged_events(table: &MemoryTable, id: Uuid) -> Vec<Value> {
        table
            .list(
                "event-log",
                ListFilter {
                    contains: Some(format!("id:{id}")),
                    limit: None,
                },
            )
            .await
            .unwrap()
    }

    fn register(id: Uuid, email: &str) -> RegisterUser {
        RegisterUser {
            correlation_id: None,
            id,
            email: email.to_owned(),
        }
    }

    // --- user ---

    #[tokio::test]
    async fn test_register_appends_and_replays_the_user() {
        // Arrange
        let (users, _, _) = services();
        let id = Uuid::new_v4();

        // Act
        users.register(&register(id, "ann@example.io")).await.unwrap();

        // Assert
        let user = users.get_aggregate_root(id).await.unwrap();
        assert_eq!(user.email, "ann@example.io");
        assert_eq!(user.version, 1);
        assert!(user.uncommitted_events().is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_an_already_registered_email() {
        // Arrange
        let (users, _, _) = services();
        users
            .register(&register(Uuid::new_v4(), "ann@example.io"))
            .await
            .unwrap();

        // Act
        let second = users
            .register(&register(Uuid::new_v4(), "ann@example.io"))
            .await;

        // Assert
        match second {
            Err(Error::UniqueConstraintViolated(message)) => {
                assert_eq!(message, "ann@example.io is already registered");
            }
            other => panic!("expected a constraint violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_releases_the_constraint_when_append_fails() {
        // Arrange: the same aggregate id twice forces an append conflict
        let (users, _, _) = services();
        let id = Uuid::new_v4();
        users.register(&register(id, "ann@example.io")).await.unwrap();

        // Act
        let conflicted = users.register(&register(id, "bea@example.io")).await;
        let retried = users
            .register(&register(Uuid::new_v4(), "bea@example.io"))
            .await;

        // Assert: the failed attempt did not leave bea@example.io reserved
        assert!(matches!(conflicted, Err(Error::ConcurrencyConflict { .. })));
        assert!(retried.is_ok());
    }

    #[tokio::test]
    async fn test_update_requires_an_existing_user() {
        let (users, _, _) = services();

        let result = users
            .update(&UpdateUser {
                correlation_id: None,
                id: Uuid::new_v4(),
                first_name: "Ann".to_owned(),
                last_name: "Stone".to_owned(),
            })
            .await;

        assert!(matches!(result, Err(Error::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_appends_an_enriched_event() {
        // Arrange
        let (users, _, table) = services();
        let id = Uuid::new_v4();
        users.register(&register(id, "ann@example.io")).await.unwrap();

        // Act
        users
            .update(&UpdateUser {
                correlation_id: None,
                id,
                first_name: "Ann".to_owned(),
                last_name: "Stone".to_owned(),
            })
            .await
            .unwrap();

        // Assert
        let user = users.get_aggregate_root(id).await.unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Ann"));
        assert_eq!(user.version, 2);
        let updated = logged_events(&table, id)
            .await
            .into_iter()
            .find(|event| event["version"] == 2)
            .unwrap();
        assert_eq!(updated["enrichmentData"][0]["aggregateName"], "User");
        assert_eq!(
            updated["enrichmentData"][0]["data"]["email"],
            "ann@example.io"
        );
    }

    #[tokio::test]
    async fn test_add_role_requires_the_role_to_exist() {
        // Arrange
        let (users, _, _) = services();
        let id = Uuid::new_v4();
        users.register(&register(id, "ann@example.io")).await.unwrap();

        // Act
        let result = users
            .add_role(&AddUserRole {
                correlation_id: None,
                id,
                role_id: Uuid::new_v4(),
            })
            .await;

        // Assert
        match result {
            Err(Error::RecordNotFound(message)) => {
                assert!(message.contains("Role"), "{message}");
            }
            other => panic!("expected RecordNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_role_appends_user_and_role_enrichment() {
        // Arrange
        let (users, roles, table) = services();
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        users
            .register(&register(user_id, "ann@example.io"))
            .await
            .unwrap();
        roles
            .create(&CreateRole {
                correlation_id: None,
                id: role_id,
                name: "Admin".to_owned(),
            })
            .await
            .unwrap();

        // Act
        users
            .add_role(&AddUserRole {
                correlation_id: None,
                id: user_id,
                role_id,
            })
            .await
            .unwrap();

        // Assert
        let user = users.get_aggregate_root(user_id).await.unwrap();
        assert!(user.roles.contains(&role_id));
        let added = logged_events(&table, user_id)
            .await
            .into_iter()
            .find(|event| event["version"] == 2)
            .unwrap();
        assert_eq!(added["enrichmentData"][1]["aggregateName"], "Role");
        assert_eq!(added["enrichmentData"][1]["data"]["name"], "Admin");
    }

    #[tokio::test]
    async fn test_remove_role_revokes_the_grant() {
        // Arrange
        let (users, roles, _) = services();
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        users
            .register(&register(user_id, "ann@example.io"))
            .await
            .unwrap();
        roles
            .create(&CreateRole {
                correlation_id: None,
                id: role_id,
                name: "Admin".to_owned(),
            })
            .await
            .unwrap();
        users
            .add_role(&AddUserRole {
                correlation_id: None,
                id: user_id,
                role_id,
            })
            .await
            .unwrap();

        // Act
        users
            .remove_role(&RemoveUserRole {
                correlation_id: None,
                id: user_id,
                role_id,
            })
            .await
            .unwrap();

        // Assert
        let user = users.get_aggregate_root(user_id).await.unwrap();
        assert!(user.roles.is_empty());
        assert_eq!(user.version, 3);
    }

    #[tokio::test]
    async fn test_disable_blocks_subsequent_updates() {
        // Arrange
        let (users, _, _) = services();
        let id = Uuid::new_v4();
        users.register(&register(id, "ann@example.io")).await.unwrap();
        users
            .disable(&DisableUser {
                correlation_id: None,
                id,
            })
            .await
            .unwrap();

        // Act
        let result = users
            .update(&UpdateUser {
                correlation_id: None,
                id,
                first_name: "Ann".to_owned(),
                last_name: "Stone".to_owned(),
            })
            .await;

        // Assert
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    // --- role ---

    #[tokio::test]
    async fn test_create_role_rejects_a_taken_name() {
        // Arrange
        let (_, roles, _) = services();
        roles
            .create(&CreateRole {
                correlation_id: None,
                id: Uuid::new_v4(),
                name: "Admin".to_owned(),
            })
            .await
            .unwrap();

        // Act
        let second = roles
            .create(&CreateRole {
                correlation_id: None,
                id: Uuid::new_v4(),
                name: "Admin".to_owned(),
            })
            .await;

        // Assert
        match second {
            Err(Error::UniqueConstraintViolated(message)) => {
                assert_eq!(message, "Admin already exists");
            }
            other => panic!("expected a constraint violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disable_role_appends_and_replays() {
        // Arrange
        let (_, roles, _) = services();
        let id = Uuid::new_v4();
        roles
            .create(&CreateRole {
                correlation_id: None,
                id,
                name: "Admin".to_owned(),
            })
            .await
            .unwrap();

        // Act
        roles
            .disable(&DisableRole {
                correlation_id: None,
                id,
            })
            .await
            .unwrap();

        // Assert
        let role = roles.get_aggregate_root(id).await.unwrap();
        assert!(role.disabled);
        assert_eq!(role.version, 2);
    }
}
