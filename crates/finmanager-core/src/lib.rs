//! finmanager-core - Core library for FinManager
//!
//! This crate is the local-first data layer shared by every FinManager
//! interface. Writes land in the on-device [`store::EntityStore`] together
//! with a queued statement of sync intent; the [`sync::SyncEngine`] later
//! drains that queue to the remote backend.

pub mod auth;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{
    Collection, EntityData, FieldPatch, QueueEntry, QueuePayload, Record, RecordId, SyncAction,
    SyncStatus,
};
pub use store::EntityStore;
pub use sync::{DrainOutcome, DrainReport, SyncEngine, SyncError};
