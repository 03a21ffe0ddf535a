//! Gatehouse Event Store — the append-only log, the uniqueness index, and
//! read-model storage, all speaking the key-value table collaborator.

pub mod constraints;
pub mod memory;
pub mod projections;
pub mod store;
