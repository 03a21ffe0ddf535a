//! Gatehouse Core — shared abstractions for the event-sourcing backbone.
//!
//! This crate defines the event envelope, the error taxonomy, the aggregate
//! and projection contracts, and the collaborator traits (table, stream,
//! queue) that every other crate depends on. It contains no infrastructure
//! code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod dispatch;
pub mod enrich;
pub mod error;
pub mod event;
pub mod handler;
pub mod projection;
pub mod queue;
pub mod stream;
pub mod table;
