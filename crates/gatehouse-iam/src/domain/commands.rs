//! Commands for the IAM context.

use gatehouse_core::command::Command;
use uuid::Uuid;

/// Command to register a new user.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    /// Correlation ID for tracing, when the caller supplies one.
    pub correlation_id: Option<Uuid>,
    /// The new user's identifier.
    pub id: Uuid,
    /// The email to register with.
    pub email: String,
}

impl Command for RegisterUser {
    fn command_type(&self) -> &'static str {
        "iam.register_user"
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}

/// Command to update a user's name.
#[derive(Debug, Clone)]
pub struct UpdateUser {
    /// Correlation ID for tracing, when the caller supplies one.
    pub correlation_id: Option<Uuid>,
    /// The user to update.
    pub id: Uuid,
    /// The new first name.
    pub first_name: String,
    /// The new last name.
    pub last_name: String,
}

impl Command for UpdateUser {
    fn command_type(&self) -> &'static str {
        "iam.update_user"
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}

/// Command to disable a user.
#[derive(Debug, Clone)]
pub struct DisableUser {
    /// Correlation ID for tracing, when the caller supplies one.
    pub correlation_id: Option<Uuid>,
    /// The user to disable.
    pub id: Uuid,
}

impl Command for DisableUser {
    fn command_type(&self) -> &'static str {
        "iam.disable_user"
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}

/// Command to grant a role to a user.
#[derive(Debug, Clone)]
pub struct AddUserRole {
    /// Correlation ID for tracing, when the caller supplies one.
    pub correlation_id: Option<Uuid>,
    /// The user receiving the role.
    pub id: Uuid,
    /// The role to grant.
    pub role_id: Uuid,
}

impl Command for AddUserRole {
    fn command_type(&self) -> &'static str {
        "iam.add_user_role"
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}

/// Command to revoke a role from a user.
#[derive(Debug, Clone)]
pub struct RemoveUserRole {
    /// Correlation ID for tracing, when the caller supplies one.
    pub correlation_id: Option<Uuid>,
    /// The user losing the role.
    pub id: Uuid,
    /// The role to revoke.
    pub role_id: Uuid,
}

impl Command for RemoveUserRole {
    fn command_type(&self) -> &'static str {
        "iam.remove_user_role"
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}

/// Command to create a new role.
#[derive(Debug, Clone)]
pub struct CreateRole {
    /// Correlation ID for tracing, when the caller supplies one.
    pub correlation_id: Option<Uuid>,
    /// The new role's identifier.
    pub id: Uuid,
    /// The role's unique name.
    pub name: String,
}

impl Command for CreateRole {
    fn command_type(&self) -> &'static str {
        "iam.create_role"
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}

/// Command to disable a role.
#[derive(Debug, Clone)]
pub struct DisableRole {
    /// Correlation ID for tracing, when the caller supplies one.
    pub correlation_id: Option<Uuid>,
    /// The role to disable.
    pub id: Uuid,
}

impl Command for DisableRole {
    fn command_type(&self) -> &'static str {
        "iam.disable_role"
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}
