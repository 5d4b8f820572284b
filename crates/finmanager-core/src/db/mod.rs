//! Database layer for FinManager

mod connection;
mod migrations;
mod queue_repository;
mod repository;

pub use connection::Database;
pub use queue_repository::{QueueRepository, SqliteQueueRepository, StoredEntry, UndecodableEntry};
pub use repository::{RecordRepository, SqliteRecordRepository};
