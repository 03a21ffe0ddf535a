//! In-memory stream and queue collaborators.
//!
//! Back local runs and the test suite with the same ordering contracts the
//! production collaborators guarantee: per-partition order on the stream,
//! FIFO per queue.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use gatehouse_core::error::Error;
use gatehouse_core::queue::{QueueMessage, QueueService};
use gatehouse_core::stream::{OrderedStream, StreamRecord};

fn guard<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, Error> {
    mutex
        .lock()
        .map_err(|_| Error::Internal(format!("{what} state poisoned")))
}

/// In-memory [`OrderedStream`] with per-partition buffers.
#[derive(Default)]
pub struct MemoryStream {
    partitions: Mutex<BTreeMap<String, VecDeque<StreamRecord>>>,
}

impl MemoryStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains up to `max` buffered records, partition by partition,
    /// preserving publish order within each partition.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when the buffer state is poisoned.
    pub fn drain(&self, max: usize) -> Result<Vec<StreamRecord>, Error> {
        let mut partitions = guard(&self.partitions, "memory stream")?;
        let mut drained = Vec::new();
        for records in partitions.values_mut() {
            while drained.len() < max {
                match records.pop_front() {
                    Some(record) => drained.push(record),
                    None => break,
                }
            }
            if drained.len() >= max {
                break;
            }
        }
        partitions.retain(|_, records| !records.is_empty());
        Ok(drained)
    }
}

#[async_trait]
impl OrderedStream for MemoryStream {
    async fn publish(
        &self,
        partition_key: &str,
        sequence_number: u64,
        payload: Value,
    ) -> Result<(), Error> {
        let mut partitions = guard(&self.partitions, "memory stream")?;
        partitions
            .entry(partition_key.to_owned())
            .or_default()
            .push_back(StreamRecord {
                partition_key: partition_key.to_owned(),
                sequence_number,
                payload,
            });
        Ok(())
    }
}

/// In-memory [`QueueService`] with declared queues and FIFO delivery.
///
/// Receiving peeks at the head of the queue; a message stays queued until
/// it is deleted, so unacknowledged work is redelivered on the next
/// receive.
#[derive(Default)]
pub struct MemoryQueue {
    endpoints: Mutex<HashMap<String, String>>,
    queues: Mutex<HashMap<String, VecDeque<QueueMessage>>>,
    resolutions: Mutex<HashMap<String, usize>>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a queue and returns its endpoint address.
    pub fn declare(&self, queue_name: &str) -> String {
        let endpoint = format!("memory://{queue_name}");
        if let Ok(mut endpoints) = self.endpoints.lock() {
            endpoints.insert(queue_name.to_owned(), endpoint.clone());
        }
        if let Ok(mut queues) = self.queues.lock() {
            queues.entry(endpoint.clone()).or_default();
        }
        endpoint
    }

    /// How many times a queue name has been resolved to its endpoint.
    ///
    /// Lets tests observe endpoint-cache behavior in the router.
    #[must_use]
    pub fn resolution_count(&self, queue_name: &str) -> usize {
        self.resolutions
            .lock()
            .map(|resolutions| resolutions.get(queue_name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl QueueService for MemoryQueue {
    async fn resolve_endpoint(&self, queue_name: &str) -> Result<String, Error> {
        {
            let mut resolutions = guard(&self.resolutions, "memory queue")?;
            *resolutions.entry(queue_name.to_owned()).or_insert(0) += 1;
        }
        let endpoints = guard(&self.endpoints, "memory queue")?;
        endpoints
            .get(queue_name)
            .cloned()
            .ok_or_else(|| Error::RecordNotFound(format!("queue {queue_name}")))
    }

    async fn send_batch(&self, endpoint: &str, entries: Vec<QueueMessage>) -> Result<(), Error> {
        let mut queues = guard(&self.queues, "memory queue")?;
        let Some(queue) = queues.get_mut(endpoint) else {
            return Err(Error::RecordNotFound(format!("endpoint {endpoint}")));
        };
        queue.extend(entries);
        Ok(())
    }

    async fn receive(&self, endpoint: &str, max: usize) -> Result<Vec<QueueMessage>, Error> {
        let queues = guard(&self.queues, "memory queue")?;
        let Some(queue) = queues.get(endpoint) else {
            return Err(Error::RecordNotFound(format!("endpoint {endpoint}")));
        };
        Ok(queue.iter().take(max).cloned().collect())
    }

    async fn delete(&self, endpoint: &str, message_id: &str) -> Result<(), Error> {
        let mut queues = guard(&self.queues, "memory queue")?;
        let Some(queue) = queues.get_mut(endpoint) else {
            return Err(Error::RecordNotFound(format!("endpoint {endpoint}")));
        };
        queue.retain(|message| message.id != message_id);
        Ok(())
    }
}
