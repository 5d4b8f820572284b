//! Record identity and sync metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Collection, EntityData};

/// A unique identifier for a record, using UUID v7 (time-sortable)
///
/// Generated on the device at creation time and reused as the remote primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Reconciliation marker between the local and remote view of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Created locally, never confirmed remotely
    Pending,
    /// Modified locally after a previous sync
    Updated,
    /// Local state confirmed equal to remote state as of the last sync
    Synced,
}

impl SyncStatus {
    /// Storage representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Updated => "updated",
            Self::Synced => "synced",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "updated" => Ok(Self::Updated),
            "synced" => Ok(Self::Synced),
            other => Err(format!("unknown sync status '{other}'")),
        }
    }
}

/// A persisted domain entity with identity and sync metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, stable for the record's lifetime
    pub id: RecordId,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
    /// Local/remote reconciliation marker
    pub sync_status: SyncStatus,
    /// Typed domain payload
    pub data: EntityData,
}

impl Record {
    /// Build a brand-new, never-synced record around the given data
    #[must_use]
    pub fn new(data: EntityData) -> Self {
        let now = crate::util::now();
        Self {
            id: RecordId::new(),
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Pending,
            data,
        }
    }

    /// Collection this record belongs to
    pub const fn collection(&self) -> Collection {
        self.data.collection()
    }

    /// Whether the record has local changes the remote has not confirmed
    pub fn needs_sync(&self) -> bool {
        self.sync_status != SyncStatus::Synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Supplier;

    #[test]
    fn test_record_id_unique() {
        let id1 = RecordId::new();
        let id2 = RecordId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_record_id_parse() {
        let id = RecordId::new();
        let parsed: RecordId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_sync_status_roundtrip() {
        for status in [SyncStatus::Pending, SyncStatus::Updated, SyncStatus::Synced] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("done".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = Record::new(EntityData::Supplier(Supplier::new("Acme")));
        assert_eq!(record.sync_status, SyncStatus::Pending);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.collection(), Collection::Suppliers);
        assert!(record.needs_sync());
    }
}
