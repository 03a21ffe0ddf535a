//! Domain events for the IAM context.
//!
//! Payload structs hold only the type-specific fields; the envelope carries
//! identity, version, and timing. Payloads serialize camelCase and are
//! flattened onto the envelope on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when a user is registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistered {
    /// The email the user registered with.
    pub email: String,
}

/// Emitted when a user's name is updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdated {
    /// The user's first name.
    pub first_name: String,
    /// The user's last name.
    pub last_name: String,
}

/// Emitted when a user is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDisabled {}

/// Emitted when a role is granted to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleAdded {
    /// The granted role's identifier.
    pub role_id: Uuid,
}

/// Emitted when a role is revoked from a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleRemoved {
    /// The revoked role's identifier.
    pub role_id: Uuid,
}

/// Emitted when a role is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCreated {
    /// The role's unique name.
    pub name: String,
}

/// Emitted when a role is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDisabled {}

/// Event name for [`UserRegistered`].
pub const USER_REGISTERED_EVENT_NAME: &str = "org/iam/user/registered";

/// Event name for [`UserUpdated`].
pub const USER_UPDATED_EVENT_NAME: &str = "org/iam/user/updated";

/// Event name for [`UserDisabled`].
pub const USER_DISABLED_EVENT_NAME: &str = "org/iam/user/disabled";

/// Event name for [`UserRoleAdded`].
pub const USER_ROLE_ADDED_EVENT_NAME: &str = "org/iam/user/roleAdded";

/// Event name for [`UserRoleRemoved`].
pub const USER_ROLE_REMOVED_EVENT_NAME: &str = "org/iam/user/roleRemoved";

/// Event name for [`RoleCreated`].
pub const ROLE_CREATED_EVENT_NAME: &str = "org/iam/role/created";

/// Event name for [`RoleDisabled`].
pub const ROLE_DISABLED_EVENT_NAME: &str = "org/iam/role/disabled";
