//! Gatehouse Runtime — process composition for the IAM backbone: the
//! configuration, the wired-up context, and the pumps that move events from
//! the log to the projections.

pub mod config;
pub mod context;
pub mod pumps;
