//! Application layer for the IAM context.

pub mod query_handlers;
pub mod services;
