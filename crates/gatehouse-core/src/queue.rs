//! Message queue collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The queue message envelope, both for sending and receiving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    /// Entry identifier, unique within a batch.
    pub id: String,
    /// Serialized event.
    pub body: String,
    /// Deduplication key for the queue's delivery window.
    pub dedupe_id: String,
    /// Ordering group; messages sharing it are delivered in order.
    pub group_id: String,
}

/// Queue collaborator.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Resolves a queue name to its endpoint address.
    ///
    /// # Errors
    /// Returns [`Error::RecordNotFound`] when no queue has that name, and
    /// [`Error::Internal`] on transport failure.
    async fn resolve_endpoint(&self, queue_name: &str) -> Result<String, Error>;

    /// Sends a batch of messages to one endpoint.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on transport failure, [`Error::TimedOut`]
    /// when the collaborator's deadline elapses.
    async fn send_batch(&self, endpoint: &str, entries: Vec<QueueMessage>) -> Result<(), Error>;

    /// Receives up to `max` messages from the head of one endpoint.
    ///
    /// Receiving does not consume: a message stays queued until it is
    /// deleted, which is what makes redelivery of unacknowledged work
    /// possible.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on transport failure.
    async fn receive(&self, endpoint: &str, max: usize) -> Result<Vec<QueueMessage>, Error>;

    /// Deletes a handled message so it is not delivered again.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] on transport failure.
    async fn delete(&self, endpoint: &str, message_id: &str) -> Result<(), Error>;
}
