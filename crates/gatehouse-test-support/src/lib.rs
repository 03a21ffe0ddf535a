//! Shared test doubles for the Gatehouse backbone.

mod clock;
mod handler;
mod table;

pub use clock::FixedClock;
pub use handler::{FailingHandler, RecordingHandler};
pub use table::FailingTable;
