//! Aggregate roots for the IAM context.
//!
//! Transitions validate against current state, construct the event, and
//! route it through [`Aggregate::apply`]; no state changes outside that
//! path. Each applied event is also queued on the uncommitted list for the
//! owning service to persist.

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use gatehouse_core::aggregate::Aggregate;
use gatehouse_core::clock::Clock;
use gatehouse_core::dispatch::DispatchTable;
use gatehouse_core::error::Error;
use gatehouse_core::event::Event;

use super::events::{
    ROLE_CREATED_EVENT_NAME, ROLE_DISABLED_EVENT_NAME, RoleCreated, RoleDisabled,
    USER_DISABLED_EVENT_NAME, USER_REGISTERED_EVENT_NAME, USER_ROLE_ADDED_EVENT_NAME,
    USER_ROLE_REMOVED_EVENT_NAME, USER_UPDATED_EVENT_NAME, UserDisabled, UserRegistered,
    UserRoleAdded, UserRoleRemoved, UserUpdated,
};

const EMAIL_MAX_LENGTH: usize = 255;
const PERSON_NAME_MAX_LENGTH: usize = 50;
const ROLE_NAME_MAX_LENGTH: usize = 30;

fn validate_email(email: &str) -> Result<(), Error> {
    if email.len() > EMAIL_MAX_LENGTH {
        return Err(Error::Validation(format!(
            "email must be at most {EMAIL_MAX_LENGTH} characters"
        )));
    }
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        });
    if !well_formed {
        return Err(Error::Validation(format!(
            "{email} is not a valid email address"
        )));
    }
    Ok(())
}

fn validate_alpha(field: &str, value: &str, max_length: usize) -> Result<(), Error> {
    if value.is_empty() || value.chars().count() > max_length {
        return Err(Error::Validation(format!(
            "{field} must be 1 to {max_length} characters"
        )));
    }
    if !value.chars().all(char::is_alphabetic) {
        return Err(Error::Validation(format!(
            "{field} must contain only alphabetic characters"
        )));
    }
    Ok(())
}

/// The aggregate root for a user.
#[derive(Debug, Clone)]
pub struct User {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version; 0 until the first event is applied.
    pub version: u64,
    /// Registered email address.
    pub email: String,
    /// First name (set after the first update).
    pub first_name: Option<String>,
    /// Last name (set after the first update).
    pub last_name: Option<String>,
    /// Identifiers of the roles granted to this user.
    pub roles: BTreeSet<Uuid>,
    /// Whether the user has been disabled.
    pub disabled: bool,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<Event>,
}

impl User {
    /// Creation transition. Aggregates are never constructed directly by
    /// callers.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a malformed or overlong email.
    pub fn register(
        id: Uuid,
        email: &str,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<Self, Error> {
        validate_email(email)?;
        let mut user = Self::hydrate(id);
        user.emit(
            USER_REGISTERED_EVENT_NAME,
            &UserRegistered {
                email: email.to_owned(),
            },
            correlation_id,
            clock,
        )?;
        Ok(user)
    }

    /// Updates the user's name.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a non-alphabetic or out-of-range
    /// name, or when the user is disabled.
    pub fn update(
        &mut self,
        first_name: &str,
        last_name: &str,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<(), Error> {
        validate_alpha("firstName", first_name, PERSON_NAME_MAX_LENGTH)?;
        validate_alpha("lastName", last_name, PERSON_NAME_MAX_LENGTH)?;
        self.ensure_enabled()?;
        self.emit(
            USER_UPDATED_EVENT_NAME,
            &UserUpdated {
                first_name: first_name.to_owned(),
                last_name: last_name.to_owned(),
            },
            correlation_id,
            clock,
        )
    }

    /// Disables the user.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the user is already disabled.
    pub fn disable(
        &mut self,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<(), Error> {
        self.ensure_enabled()?;
        self.emit(
            USER_DISABLED_EVENT_NAME,
            &UserDisabled {},
            correlation_id,
            clock,
        )
    }

    /// Grants a role to the user.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the user is disabled or already
    /// holds the role.
    pub fn add_role(
        &mut self,
        role_id: Uuid,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<(), Error> {
        self.ensure_enabled()?;
        if self.roles.contains(&role_id) {
            return Err(Error::Validation(format!(
                "role {role_id} is already assigned to user {}",
                self.id
            )));
        }
        self.emit(
            USER_ROLE_ADDED_EVENT_NAME,
            &UserRoleAdded { role_id },
            correlation_id,
            clock,
        )
    }

    /// Revokes a role from the user. Disabled users keep this transition so
    /// access can still be withdrawn after deactivation.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the user does not hold the role.
    pub fn remove_role(
        &mut self,
        role_id: Uuid,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<(), Error> {
        if !self.roles.contains(&role_id) {
            return Err(Error::Validation(format!(
                "role {role_id} is not assigned to user {}",
                self.id
            )));
        }
        self.emit(
            USER_ROLE_REMOVED_EVENT_NAME,
            &UserRoleRemoved { role_id },
            correlation_id,
            clock,
        )
    }

    fn ensure_enabled(&self) -> Result<(), Error> {
        if self.disabled {
            return Err(Error::Validation(format!("user {} is disabled", self.id)));
        }
        Ok(())
    }

    fn emit<P: Serialize>(
        &mut self,
        name: &str,
        payload: &P,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<(), Error> {
        let event = Event::new(
            name,
            self.id,
            self.version + 1,
            clock.now(),
            correlation_id,
            payload,
        )?;
        self.apply(&event)?;
        self.uncommitted_events.push(event);
        Ok(())
    }

    fn when_registered(&mut self, event: &Event) -> Result<(), Error> {
        let payload: UserRegistered = event.payload_as()?;
        self.email = payload.email;
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
        self.roles.insert(payload.role_id);
        Ok(())
    }

    fn when_role_removed(&mut self, event: &Event) -> Result<(), Error> {
        let payload: UserRoleRemoved = event.payload_as()?;
        self.roles.remove(&payload.role_id);
        Ok(())
    }
}

impl Aggregate for User {
    const KIND: &'static str = "User";
    const NAME: &'static str = "user";
    const MUTATORS: DispatchTable<Self> = &[
        (USER_REGISTERED_EVENT_NAME, Self::when_registered),
        (USER_UPDATED_EVENT_NAME, Self::when_updated),
        (USER_DISABLED_EVENT_NAME, Self::when_disabled),
        (USER_ROLE_ADDED_EVENT_NAME, Self::when_role_added),
        (USER_ROLE_REMOVED_EVENT_NAME, Self::when_role_removed),
    ];

    fn hydrate(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            email: String::new(),
            first_name: None,
            last_name: None,
            roles: BTreeSet::new(),
            disabled: false,
            uncommitted_events: Vec::new(),
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

/// The aggregate root for a role.
#[derive(Debug, Clone)]
pub struct Role {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version; 0 until the first event is applied.
    pub version: u64,
    /// The role's unique name.
    pub name: String,
    /// Whether the role has been disabled.
    pub disabled: bool,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<Event>,
}

impl Role {
    /// Creation transition. Aggregates are never constructed directly by
    /// callers.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a non-alphabetic or out-of-range
    /// name.
    pub fn create(
        id: Uuid,
        name: &str,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<Self, Error> {
        validate_alpha("name", name, ROLE_NAME_MAX_LENGTH)?;
        let mut role = Self::hydrate(id);
        role.emit(
            ROLE_CREATED_EVENT_NAME,
            &RoleCreated {
                name: name.to_owned(),
            },
            correlation_id,
            clock,
        )?;
        Ok(role)
    }

    /// Disables the role.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the role is already disabled.
    pub fn disable(
        &mut self,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<(), Error> {
        if self.disabled {
            return Err(Error::Validation(format!("role {} is disabled", self.id)));
        }
        self.emit(
            ROLE_DISABLED_EVENT_NAME,
            &RoleDisabled {},
            correlation_id,
            clock,
        )
    }

    fn emit<P: Serialize>(
        &mut self,
        name: &str,
        payload: &P,
        correlation_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<(), Error> {
        let event = Event::new(
            name,
            self.id,
            self.version + 1,
            clock.now(),
            correlation_id,
            payload,
        )?;
        self.apply(&event)?;
        self.uncommitted_events.push(event);
        Ok(())
    }

    fn when_created(&mut self, event: &Event) -> Result<(), Error> {
        let payload: RoleCreated = event.payload_as()?;
        self.name = payload.name;
        Ok(())
    }

    fn when_disabled(&mut self, _event: &Event) -> Result<(), Error> {
        self.disabled = true;
        Ok(())
    }
}

impl Aggregate for Role {
    const KIND: &'static str = "Role";
    const NAME: &'static str = "role";
    const MUTATORS: DispatchTable<Self> = &[
        (ROLE_CREATED_EVENT_NAME, Self::when_created),
        (ROLE_DISABLED_EVENT_NAME, Self::when_disabled),
    ];

    fn hydrate(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            name: String::new(),
            disabled: false,
            uncommitted_events: Vec::new(),
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
