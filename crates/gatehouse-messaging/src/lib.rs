//! Gatehouse Messaging — the delivery pipeline between the event log and the
//! projection handlers: change relay, fan-out router, handler registry, and
//! queue dispatcher.

pub mod dispatcher;
pub mod memory;
pub mod registry;
pub mod relay;
pub mod router;
