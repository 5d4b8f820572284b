//! Sync engine error taxonomy.

use thiserror::Error;

use crate::models::{Collection, RecordId, SyncAction};

/// Why a drain did nothing, stopped early, or skipped an entry.
///
/// None of these is fatal: the queue keeps the work for a later drain.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("A drain is already in progress")]
    DrainInProgress,
    #[error("No network connectivity")]
    NotConnected,
    #[error("No authenticated session")]
    NotAuthenticated,
    #[error("Remote rejected {action} for {collection} {entity_id}: {message}")]
    RemoteRejected {
        collection: Collection,
        entity_id: RecordId,
        action: SyncAction,
        message: String,
    },
    #[error("Queued {action} {entry_id} for {collection} cannot be decoded: {reason}")]
    UndecodableEntry {
        entry_id: String,
        collection: String,
        action: String,
        reason: String,
    },
    #[error("Remote service unreachable: {0}")]
    RemoteUnreachable(String),
    #[error("Local store failure: {0}")]
    Store(#[from] crate::Error),
}

impl SyncError {
    /// Expected steady states that are not worth reporting upward.
    pub const fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::DrainInProgress | Self::NotConnected | Self::NotAuthenticated
        )
    }
}
