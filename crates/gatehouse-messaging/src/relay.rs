//! Change relay: event-log inserts onto the ordered stream.

use std::sync::Arc;

use tracing::warn;

use gatehouse_core::error::Error;
use gatehouse_core::event::EventLogRecord;
use gatehouse_core::stream::OrderedStream;
use gatehouse_core::table::{ChangeKind, ChangeNotification};

/// Republishes each inserted event-log record as a stream record, keyed by
/// aggregate id with the record's version as the explicit sequence number,
/// so per-aggregate order survives redelivery.
///
/// The log is append-only: modify/remove notifications must never occur and
/// are ignored with a warning rather than trusted.
pub struct ChangeRelay {
    stream: Arc<dyn OrderedStream>,
}

impl ChangeRelay {
    #[must_use]
    pub fn new(stream: Arc<dyn OrderedStream>) -> Self {
        Self { stream }
    }

    /// Relays one change notification; returns whether a record was
    /// published.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when the image is not a valid event log
    /// record or the stream publish fails.
    pub async fn relay(&self, notification: &ChangeNotification) -> Result<bool, Error> {
        if notification.kind != ChangeKind::Insert {
            warn!(
                table = %notification.table,
                kind = ?notification.kind,
                "ignoring non-insert change on the event log"
            );
            return Ok(false);
        }
        let Some(image) = &notification.new_image else {
            warn!(table = %notification.table, "insert notification carried no image");
            return Ok(false);
        };
        let record = EventLogRecord::from_image(image)?;
        self.stream
            .publish(
                &record.aggregate_id().to_string(),
                record.version(),
                image.clone(),
            )
            .await?;
        Ok(true)
    }
}
