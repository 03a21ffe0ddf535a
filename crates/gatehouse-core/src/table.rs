//! Key-value table collaborator.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;

/// Filter for list operations.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// `"attr:fragment"` requirement: the named attribute's string value
    /// must contain the fragment.
    pub contains: Option<String>,
    /// Maximum number of records to return; `None` means unbounded.
    pub limit: Option<usize>,
}

/// Precondition applied to a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveCondition {
    /// Unconditional upsert.
    None,
    /// Insert only: fail when a row with the same key already exists.
    MustNotExist,
}

/// What happened to a row, as reported by a table's change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

/// One change-feed entry.
#[derive(Debug, Clone)]
pub struct ChangeNotification {
    /// Table the change happened in.
    pub table: String,
    pub kind: ChangeKind,
    /// The row after the change; absent for removals.
    pub new_image: Option<Value>,
}

/// Storage collaborator for record-shaped data.
///
/// "Not found" is a `None`/empty result, never an error; only transport
/// faults and precondition failures surface as errors.
#[async_trait]
pub trait KeyValueTable: Send + Sync {
    /// Fetches one record by key attribute.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on transport failure.
    async fn get(
        &self,
        table: &str,
        key_name: &str,
        key_value: &str,
    ) -> Result<Option<Value>, Error>;

    /// Lists records matching `filter`.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on transport failure.
    async fn list(&self, table: &str, filter: ListFilter) -> Result<Vec<Value>, Error>;

    /// Saves one record, honoring the precondition.
    ///
    /// # Errors
    /// Returns [`Error::UniqueConstraintViolated`] when
    /// [`SaveCondition::MustNotExist`] hits an existing key, and
    /// [`Error::Internal`] on transport failure. Callers contextualize the
    /// precondition failure (event log appends report it as a concurrency
    /// conflict).
    async fn save(&self, table: &str, record: Value, condition: SaveCondition)
    -> Result<(), Error>;

    /// Deletes one record by key attribute; returns whether a row existed.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on transport failure.
    async fn delete(&self, table: &str, key_name: &str, key_value: &str) -> Result<bool, Error>;
}
