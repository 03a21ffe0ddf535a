//! Delivery pumps: the background tasks that move events through the
//! pipeline.
//!
//! Three stages run concurrently: the change feed drives the relay, the
//! stream drains into the router, and each queue drains into the
//! dispatcher. Every stage logs failures and keeps running. The queue pump
//! acknowledges only fully-handled messages; anything left undeleted is
//! redelivered on the next poll, which is how a cross-aggregate event that
//! outran its counterpart on another queue eventually lands.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use gatehouse_core::queue::QueueService;

use crate::context::AppContext;

/// How long an idle or partially-failed pump waits before polling again.
const IDLE_POLL: Duration = Duration::from_millis(25);

/// Spawns the full pipeline and returns the task handles.
///
/// The tasks never finish on their own; abort the handles (or tear the
/// runtime down) to stop them. The change feed is subscribed before this
/// function returns, so commands issued afterwards cannot slip past it.
#[must_use]
pub fn spawn_pipeline(context: &AppContext) -> Vec<JoinHandle<()>> {
    let mut tasks = vec![spawn_change_feed_pump(context), spawn_stream_pump(context)];
    for endpoint in &context.queue_endpoints {
        tasks.push(spawn_queue_pump(context, endpoint.clone()));
    }
    tasks
}

fn spawn_change_feed_pump(context: &AppContext) -> JoinHandle<()> {
    let mut feed = context.table.subscribe(&context.config.event_log_table);
    let relay = Arc::clone(&context.relay);
    let table = context.config.event_log_table.clone();
    tokio::spawn(async move {
        info!(table = %table, "change feed pump started");
        while let Some(notification) = feed.recv().await {
            if let Err(error) = relay.relay(&notification).await {
                error!(table = %table, error = %error, "change relay failed");
            }
        }
        info!(table = %table, "change feed closed, pump stopping");
    })
}

fn spawn_stream_pump(context: &AppContext) -> JoinHandle<()> {
    let stream = Arc::clone(&context.stream);
    let router = Arc::clone(&context.router);
    let batch = context.config.relay_batch;
    let stream_name = context.config.event_stream.clone();
    tokio::spawn(async move {
        info!(stream = %stream_name, batch, "stream pump started");
        loop {
            let records = match stream.drain(batch) {
                Ok(records) => records,
                Err(error) => {
                    error!(stream = %stream_name, error = %error, "stream drain failed");
                    tokio::time::sleep(IDLE_POLL).await;
                    continue;
                }
            };
            if records.is_empty() {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
            if let Err(error) = router.route(&records).await {
                error!(
                    stream = %stream_name,
                    batch = records.len(),
                    error = %error,
                    "fan-out routing failed, batch dropped"
                );
            }
        }
    })
}

fn spawn_queue_pump(context: &AppContext, endpoint: String) -> JoinHandle<()> {
    let queues = Arc::clone(&context.queues) as Arc<dyn QueueService>;
    let dispatcher = Arc::clone(&context.dispatcher);
    let batch = context.config.dispatch_batch;
    tokio::spawn(async move {
        info!(endpoint = %endpoint, batch, "queue pump started");
        loop {
            let messages = match queues.receive(&endpoint, batch).await {
                Ok(messages) => messages,
                Err(error) => {
                    error!(endpoint = %endpoint, error = %error, "queue receive failed");
                    tokio::time::sleep(IDLE_POLL).await;
                    continue;
                }
            };
            if messages.is_empty() {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
            let handled = dispatcher.dispatch_batch(&messages).await;
            for message_id in &handled {
                if let Err(error) = queues.delete(&endpoint, message_id).await {
                    error!(
                        endpoint = %endpoint,
                        message_id = %message_id,
                        error = %error,
                        "failed to acknowledge handled message"
                    );
                }
            }
            // A partial batch means some handler failed; back off before the
            // retry instead of spinning on the same head.
            if handled.len() < messages.len() {
                tokio::time::sleep(IDLE_POLL).await;
            }
        }
    })
}
