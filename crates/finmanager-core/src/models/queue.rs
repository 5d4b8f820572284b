//! Sync queue entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Collection, FieldPatch, Record, RecordId};

/// Kind of mutation a queue entry replicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unknown sync action '{other}'")),
        }
    }
}

/// What a queue entry carries to the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "UPPERCASE")]
pub enum QueuePayload {
    /// Full record as it was created
    Create(Box<Record>),
    /// Exactly the fields the caller changed
    Update(FieldPatch),
    Delete,
}

impl QueuePayload {
    pub const fn action(&self) -> SyncAction {
        match self {
            Self::Create(_) => SyncAction::Create,
            Self::Update(_) => SyncAction::Update,
            Self::Delete => SyncAction::Delete,
        }
    }
}

/// A durable, ordered statement of intent to replicate one record mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Entry identifier
    pub id: Uuid,
    /// Collection of the target record
    pub collection: Collection,
    /// Target record
    pub entity_id: RecordId,
    /// Mutation to replicate
    pub payload: QueuePayload,
    /// Enqueue time
    pub timestamp: DateTime<Utc>,
}

impl QueueEntry {
    /// Build a new entry stamped with the given enqueue time
    #[must_use]
    pub fn new(
        collection: Collection,
        entity_id: RecordId,
        payload: QueuePayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection,
            entity_id,
            payload,
            timestamp,
        }
    }

    pub const fn action(&self) -> SyncAction {
        self.payload.action()
    }
}
