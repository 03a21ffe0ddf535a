//! Read models for the IAM context.

pub mod handlers;
pub mod role;
pub mod user;
