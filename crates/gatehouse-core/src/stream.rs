//! Ordered partitioned stream collaborator.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;

/// One record on the stream.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    /// Ordering key; records sharing it are delivered in publish order.
    pub partition_key: String,
    /// Explicit sequence number within the partition.
    pub sequence_number: u64,
    /// Serialized event.
    pub payload: Value,
}

/// Stream collaborator.
///
/// Order is preserved among records sharing a partition key; no guarantee
/// exists across partitions.
#[async_trait]
pub trait OrderedStream: Send + Sync {
    /// Publishes one record.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on transport failure, [`Error::TimedOut`]
    /// when the collaborator's deadline elapses.
    async fn publish(
        &self,
        partition_key: &str,
        sequence_number: u64,
        payload: Value,
    ) -> Result<(), Error>;
}
