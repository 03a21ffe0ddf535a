//! Event envelope and its durable log form.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Error;

/// A point-in-time snapshot of a related aggregate, embedded in an event so
/// downstream projections never need synchronous cross-aggregate reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentData {
    /// Capitalized aggregate kind the snapshot belongs to (`"User"`, `"Role"`).
    pub aggregate_name: String,
    /// Partial snapshot of that aggregate's public fields at enrichment time.
    pub data: Value,
}

/// The domain event envelope.
///
/// `name` is a hierarchical path `org/<context>/<aggregate>/<action>` that
/// encodes both routing and dispatch. Type-specific payload fields serialize
/// flattened at the top level of the JSON object, camelCase, alongside the
/// envelope fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Hierarchical event name.
    pub name: String,
    /// Aggregate version this event advances to; also the log sort key.
    pub version: u64,
    /// Aggregate identifier (doubles as the log partition key).
    pub id: Uuid,
    /// Creation time, stamped by the producing transition.
    pub timestamp: DateTime<Utc>,
    /// Correlation ID for tracing a command through its effects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    /// Snapshots of related aggregates, ordered as attached.
    #[serde(default)]
    pub enrichment_data: Vec<EnrichmentData>,
    /// Opaque caller-supplied metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Type-specific payload fields, flattened onto the envelope.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Builds an event from a typed payload.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when the payload does not serialize to a
    /// JSON object.
    pub fn new<P: Serialize>(
        name: &str,
        id: Uuid,
        version: u64,
        timestamp: DateTime<Utc>,
        correlation_id: Option<Uuid>,
        payload: &P,
    ) -> Result<Self, Error> {
        let value = serde_json::to_value(payload).map_err(|source| {
            Error::Internal(format!("serializing payload for {name}: {source}"))
        })?;
        let Value::Object(payload) = value else {
            return Err(Error::Internal(format!(
                "payload for {name} must serialize to an object"
            )));
        };
        Ok(Self {
            name: name.to_owned(),
            version,
            id,
            timestamp,
            correlation_id,
            enrichment_data: Vec::new(),
            metadata: Map::new(),
            payload,
        })
    }

    /// Last segment of the event name.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.name.rsplit('/').next()
    }

    /// Second-to-last segment of the event name.
    #[must_use]
    pub fn aggregate(&self) -> Option<&str> {
        self.name.rsplit('/').nth(1)
    }

    /// Third-to-last segment of the event name (the bounded context).
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.name.rsplit('/').nth(2)
    }

    /// Decodes the flattened payload into a typed struct.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when the payload fields do not match `P`.
    pub fn payload_as<P: DeserializeOwned>(&self) -> Result<P, Error> {
        serde_json::from_value(Value::Object(self.payload.clone())).map_err(|source| {
            Error::Internal(format!("decoding payload of {}: {source}", self.name))
        })
    }

    /// Finds the enrichment entry for an aggregate kind, if attached.
    #[must_use]
    pub fn enrichment_for(&self, aggregate_name: &str) -> Option<&EnrichmentData> {
        self.enrichment_data
            .iter()
            .find(|entry| entry.aggregate_name == aggregate_name)
    }

    /// Decodes the enrichment snapshot for an aggregate kind.
    ///
    /// Returns `Ok(None)` when no entry targets that kind; a present entry
    /// that fails to decode is an error.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when the snapshot does not match `S`.
    pub fn enrichment_as<S: DeserializeOwned>(
        &self,
        aggregate_name: &str,
    ) -> Result<Option<S>, Error> {
        let Some(entry) = self.enrichment_for(aggregate_name) else {
            return Ok(None);
        };
        let snapshot = serde_json::from_value(entry.data.clone()).map_err(|source| {
            Error::Internal(format!(
                "decoding {aggregate_name} enrichment of {}: {source}",
                self.name
            ))
        })?;
        Ok(Some(snapshot))
    }
}

/// Durable form of an event in the append-only log.
///
/// The stored image is the serialized event itself; the log keys on the
/// `(id, version)` pair carried in the envelope, and uniqueness of that
/// composite key is the optimistic-concurrency mechanism.
#[derive(Debug, Clone)]
pub struct EventLogRecord {
    /// The event as it entered the log.
    pub event: Event,
}

impl EventLogRecord {
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self { event }
    }

    /// The aggregate this record belongs to.
    #[must_use]
    pub fn aggregate_id(&self) -> Uuid {
        self.event.id
    }

    /// The version slot this record occupies.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.event.version
    }

    /// Serializes the record to its stored image.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when serialization fails.
    pub fn to_image(&self) -> Result<Value, Error> {
        serde_json::to_value(&self.event)
            .map_err(|source| Error::Internal(format!("serializing event log record: {source}")))
    }

    /// Reconstructs a record from a stored image.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when the image is not a valid event.
    pub fn from_image(image: &Value) -> Result<Self, Error> {
        let event = serde_json::from_value(image.clone())
            .map_err(|source| Error::Internal(format!("decoding event log record: {source}")))?;
        Ok(Self { event })
    }
}
