//! Test handlers — mock `EventHandler` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use gatehouse_core::error::Error;
use gatehouse_core::event::Event;
use gatehouse_core::handler::EventHandler;

/// An event handler that records every event it is invoked with and always
/// succeeds.
#[derive(Debug)]
pub struct RecordingHandler {
    name: &'static str,
    handled: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handled: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all events handled so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn handled_events(&self) -> Vec<Event> {
        self.handled.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, event: &Event) -> Result<(), Error> {
        self.handled.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// An event handler that always fails. Useful for testing the dispatcher's
/// per-handler isolation.
#[derive(Debug)]
pub struct FailingHandler {
    name: &'static str,
}

impl FailingHandler {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl EventHandler for FailingHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, _event: &Event) -> Result<(), Error> {
        Err(Error::Internal("handler failed".to_owned()))
    }
}
