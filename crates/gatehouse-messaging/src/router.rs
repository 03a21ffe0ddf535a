//! Fan-out router: stream records to per-aggregate queues.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gatehouse_core::error::Error;
use gatehouse_core::event::Event;
use gatehouse_core::queue::{QueueMessage, QueueService};
use gatehouse_core::stream::StreamRecord;

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Destination queue for an event: capitalized context and aggregate
/// segments concatenated, with a fixed suffix (`org/iam/user/registered` →
/// `IamUserQueue`).
///
/// # Errors
/// Returns [`Error::Internal`] when the event name is too short to carry
/// both segments.
pub fn queue_name(event: &Event) -> Result<String, Error> {
    let (Some(context), Some(aggregate)) = (event.context(), event.aggregate()) else {
        return Err(Error::Internal(format!(
            "event name {} lacks context/aggregate segments",
            event.name
        )));
    };
    Ok(format!(
        "{}{}Queue",
        capitalize(context),
        capitalize(aggregate)
    ))
}

/// Routes batches of stream records to their destination queues.
///
/// Queue endpoints are resolved once and memoized for the life of the
/// router; the cache is rebuilt on miss and never invalidated. Messages
/// carry the aggregate id as their ordering group, so FIFO holds per
/// aggregate and unrelated aggregates stay uncoupled.
pub struct FanOutRouter {
    queues: Arc<dyn QueueService>,
    endpoints: Mutex<HashMap<String, String>>,
}

impl FanOutRouter {
    #[must_use]
    pub fn new(queues: Arc<dyn QueueService>) -> Self {
        Self {
            queues,
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    /// Routes one batch: decode, group by destination, send per-queue
    /// batches.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] for undecodable payloads or malformed
    /// names, [`Error::RecordNotFound`] for an undeclared destination queue,
    /// and transport errors from the queue service.
    pub async fn route(&self, records: &[StreamRecord]) -> Result<(), Error> {
        let mut batches: Vec<(String, Vec<QueueMessage>)> = Vec::new();
        for record in records {
            let event: Event = serde_json::from_value(record.payload.clone()).map_err(|source| {
                Error::Internal(format!(
                    "decoding stream record {}/{}: {source}",
                    record.partition_key, record.sequence_number
                ))
            })?;
            let queue = queue_name(&event)?;
            let endpoint = self.endpoint_for(&queue).await?;
            let message = QueueMessage {
                id: format!("{}-{}", event.id, event.version),
                body: record.payload.to_string(),
                dedupe_id: format!("{}-{}", event.id, event.version),
                group_id: event.id.to_string(),
            };
            match batches.iter_mut().find(|(batch, _)| *batch == endpoint) {
                Some((_, entries)) => entries.push(message),
                None => batches.push((endpoint, vec![message])),
            }
        }
        for (endpoint, entries) in batches {
            self.queues.send_batch(&endpoint, entries).await?;
        }
        Ok(())
    }

    async fn endpoint_for(&self, queue: &str) -> Result<String, Error> {
        {
            let endpoints = self
                .endpoints
                .lock()
                .map_err(|_| Error::Internal("endpoint cache poisoned".to_owned()))?;
            if let Some(endpoint) = endpoints.get(queue) {
                return Ok(endpoint.clone());
            }
        }
        let resolved = self.queues.resolve_endpoint(queue).await?;
        let mut endpoints = self
            .endpoints
            .lock()
            .map_err(|_| Error::Internal("endpoint cache poisoned".to_owned()))?;
        // A concurrent first use may have raced us here; the first insert wins.
        Ok(endpoints.entry(queue.to_owned()).or_insert(resolved).clone())
    }
}
