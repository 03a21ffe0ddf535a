//! Read-side queries over the IAM projections.
//!
//! Queries never touch the event log; they read the denormalized views the
//! projection handlers maintain.

use uuid::Uuid;

use gatehouse_core::error::Error;
use gatehouse_core::table::ListFilter;
use gatehouse_event_store::projections::ProjectionStore;

use crate::projections::role::RoleProjection;
use crate::projections::user::UserProjection;

/// Typed list filter for user views.
#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    /// Fragment the email must contain.
    pub email_contains: Option<String>,
    /// Maximum rows to return; storage caps this at 100.
    pub limit: Option<usize>,
}

/// Typed list filter for role views.
#[derive(Debug, Clone, Default)]
pub struct RoleListQuery {
    /// Fragment the name must contain.
    pub name_contains: Option<String>,
    /// Maximum rows to return; storage caps this at 100.
    pub limit: Option<usize>,
}

/// Fetches one user view by id.
///
/// # Errors
/// Returns [`Error::RecordNotFound`] when no view exists.
pub async fn get_user(
    store: &ProjectionStore<UserProjection>,
    id: Uuid,
) -> Result<UserProjection, Error> {
    store.get(id).await
}

/// Lists user views matching the query.
///
/// # Errors
/// Returns [`Error::Internal`] on storage failure.
pub async fn list_users(
    store: &ProjectionStore<UserProjection>,
    query: UserListQuery,
) -> Result<Vec<UserProjection>, Error> {
    store
        .list(ListFilter {
            contains: query
                .email_contains
                .map(|fragment| format!("email:{fragment}")),
            limit: query.limit,
        })
        .await
}

/// Fetches one role view by id.
///
/// # Errors
/// Returns [`Error::RecordNotFound`] when no view exists.
pub async fn get_role(
    store: &ProjectionStore<RoleProjection>,
    id: Uuid,
) -> Result<RoleProjection, Error> {
    store.get(id).await
}

/// Lists role views matching the query.
///
/// # Errors
/// Returns [`Error::Internal`] on storage failure.
pub async fn list_roles(
    store: &ProjectionStore<RoleProjection>,
    query: RoleListQuery,
) -> Result<Vec<RoleProjection>, Error> {
    store
        .list(ListFilter {
            contains: query
                .name_contains
                .map(|fragment| format!("name:{fragment}")),
            limit: query.limit,
        })
        .await
}
