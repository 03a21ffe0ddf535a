//! Error taxonomy shared across the backbone.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Unclassified failure; the catch-all for infrastructure faults.
    #[error("internal error: {0}")]
    Internal(String),

    /// A record was looked up by key and does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// A referenced file or named resource does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// No mutator is registered for an event name.
    ///
    /// Always a missing implementation, never a data problem; callers must
    /// not swallow it.
    #[error("no mutator registered on {kind} for event {event_name}")]
    MethodNotFound {
        /// The aggregate or projection type that was dispatched against.
        kind: &'static str,
        /// The event name that had no table entry.
        event_name: String,
    },

    /// A conditional insert hit an existing uniqueness-index row.
    #[error("unique constraint violated: {0}")]
    UniqueConstraintViolated(String),

    /// Optimistic concurrency conflict on the event log: another writer
    /// already claimed this version slot.
    #[error("concurrency conflict on aggregate {aggregate_id} at version {version}")]
    ConcurrencyConflict {
        /// The aggregate both writers targeted.
        aggregate_id: Uuid,
        /// The version slot that was already taken.
        version: u64,
    },

    /// A collaborator call exceeded its deadline.
    #[error("timed out: {0}")]
    TimedOut(String),

    /// A collaborator endpoint refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// A domain rule rejected the command.
    #[error("validation error: {0}")]
    Validation(String),
}
