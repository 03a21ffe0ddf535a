//! Identity & Access Management bounded context.
//!
//! User and Role aggregates, the read models derived from their events,
//! and the application services that drive both through the event store.

pub mod application;
pub mod domain;
pub mod projections;
