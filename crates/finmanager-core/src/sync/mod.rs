//! Background replication of the sync queue to the remote service.

mod engine;
mod error;

pub use engine::{DrainOutcome, DrainReport, SyncEngine};
pub use error::SyncError;
