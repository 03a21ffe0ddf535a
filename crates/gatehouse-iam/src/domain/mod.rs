//! Domain model for the IAM context.

pub mod aggregates;
pub mod commands;
pub mod enrichers;
pub mod events;
