//! Uniqueness index backed by conditional writes.
//!
//! Domain services reserve unique field values (an email, a role name) here
//! before publishing the creation event. The row is nothing but the key: a
//! namespaced `<scope>#<field>:<value>` string whose conditional insert is
//! the whole check.

use std::sync::Arc;

use serde_json::json;

use gatehouse_core::error::Error;
use gatehouse_core::table::{KeyValueTable, SaveCondition};

/// How far the event namespace prefixes the constraint key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintScope {
    /// Prefix is the event name up to the aggregate segment
    /// (`org/iam/user`): the value is unique per aggregate type.
    Aggregate,
    /// Prefix is truncated one segment further (`org/iam`): the value is
    /// unique across the bounded context.
    Context,
}

/// The uniqueness index.
pub struct ConstraintStore {
    table: Arc<dyn KeyValueTable>,
    table_name: String,
}

impl ConstraintStore {
    #[must_use]
    pub fn new(table: Arc<dyn KeyValueTable>, table_name: String) -> Self {
        Self { table, table_name }
    }

    /// Builds the index key for a field/value under an event's namespace.
    #[must_use]
    pub fn constraint_key(
        event_name: &str,
        scope: ConstraintScope,
        field: &str,
        value: &str,
    ) -> String {
        let aggregate_prefix = event_name
            .rsplit_once('/')
            .map_or(event_name, |(prefix, _)| prefix);
        let prefix = match scope {
            ConstraintScope::Aggregate => aggregate_prefix,
            ConstraintScope::Context => aggregate_prefix
                .rsplit_once('/')
                .map_or(aggregate_prefix, |(prefix, _)| prefix),
        };
        format!("{prefix}#{field}:{value}")
    }

    /// Reserves a unique value; returns the reserved key so the caller can
    /// release it if the rest of its work fails.
    ///
    /// # Errors
    /// Returns [`Error::UniqueConstraintViolated`] when the value is already
    /// taken, [`Error::Validation`] for an empty field or value, and
    /// [`Error::Internal`] on storage failure.
    pub async fn insert(
        &self,
        event_name: &str,
        scope: ConstraintScope,
        field: &str,
        value: &str,
    ) -> Result<String, Error> {
        if field.is_empty() || value.is_empty() {
            return Err(Error::Validation(
                "constraint field and value must be non-empty".to_owned(),
            ));
        }
        let key = Self::constraint_key(event_name, scope, field, value);
        let record = json!({ "constraint": key });
        match self
            .table
            .save(&self.table_name, record, SaveCondition::MustNotExist)
            .await
        {
            Ok(()) => Ok(key),
            Err(Error::UniqueConstraintViolated(_)) => {
                Err(Error::UniqueConstraintViolated(key))
            }
            Err(other) => Err(other),
        }
    }

    /// Releases a previously reserved key; returns whether a row existed.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on storage failure.
    pub async fn remove(&self, key: &str) -> Result<bool, Error> {
        self.table.delete(&self.table_name, "constraint", key).await
    }
}
