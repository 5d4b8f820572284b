//! Sync queue repository implementation

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Collection, QueueEntry, QueuePayload, RecordId, SyncAction};
use crate::util::{format_timestamp, parse_timestamp};

/// Trait for sync queue storage operations
pub trait QueueRepository {
    /// Append an entry at the tail of the queue
    fn enqueue(&self, entry: &QueueEntry) -> Result<()>;

    /// Every row in enqueue order, each decoded on its own
    fn scan(&self) -> Result<Vec<StoredEntry>>;

    /// Every decodable entry, in enqueue order
    fn list(&self) -> Result<Vec<QueueEntry>>;

    /// Decodable entries targeting one record, in enqueue order
    fn list_for(&self, collection: Collection, entity_id: &RecordId) -> Result<Vec<QueueEntry>>;

    /// Rows targeting one record, decodable or not
    fn count_for(&self, collection: Collection, entity_id: &RecordId) -> Result<usize>;

    /// Remove an entry; returns whether it was present
    fn remove(&self, id: &Uuid) -> Result<bool>;

    /// Number of outstanding entries
    fn count(&self) -> Result<usize>;
}

/// A queue row whose stored columns no longer decode into an entry.
///
/// It stays in the queue untouched; only its raw columns are exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodableEntry {
    pub id: String,
    pub collection: String,
    pub entity_id: String,
    pub action: String,
    pub reason: String,
}

/// One queue row as read back from storage.
pub type StoredEntry = std::result::Result<QueueEntry, UndecodableEntry>;

/// `SQLite` implementation of `QueueRepository`
pub struct SqliteQueueRepository<'a> {
    conn: &'a Connection,
}

struct QueueRow {
    id: String,
    collection: String,
    entity_id: String,
    action: String,
    payload: String,
    timestamp: String,
}

const SELECT_COLUMNS: &str = "SELECT id, collection, entity_id, action, payload, timestamp
     FROM sync_queue";

impl<'a> SqliteQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueRow> {
        Ok(QueueRow {
            id: row.get(0)?,
            collection: row.get(1)?,
            entity_id: row.get(2)?,
            action: row.get(3)?,
            payload: row.get(4)?,
            timestamp: row.get(5)?,
        })
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<StoredEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows.into_iter().map(QueueRow::decode).collect())
    }

    /// Serialize only the payload body; the action lives in its own column
    fn encode_payload(payload: &QueuePayload) -> Result<String> {
        let encoded = match payload {
            QueuePayload::Create(record) => serde_json::to_string(record)?,
            QueuePayload::Update(patch) => serde_json::to_string(patch)?,
            QueuePayload::Delete => "{}".to_string(),
        };
        Ok(encoded)
    }
}

impl QueueRow {
    fn decode(self) -> StoredEntry {
        match self.to_entry() {
            Ok(entry) => Ok(entry),
            Err(error) => Err(UndecodableEntry {
                id: self.id,
                collection: self.collection,
                entity_id: self.entity_id,
                action: self.action,
                reason: error.to_string(),
            }),
        }
    }

    fn to_entry(&self) -> Result<QueueEntry> {
        let invalid = |what: &str, value: &str| Error::Database(format!("invalid queue {what} '{value}'"));

        let id = Uuid::parse_str(&self.id).map_err(|_| invalid("id", &self.id))?;
        let collection: Collection = self.collection.parse().map_err(Error::Database)?;
        let entity_id: RecordId = self
            .entity_id
            .parse()
            .map_err(|_| invalid("entity id", &self.entity_id))?;
        let action: SyncAction = self.action.parse().map_err(Error::Database)?;
        let timestamp =
            parse_timestamp(&self.timestamp).ok_or_else(|| invalid("timestamp", &self.timestamp))?;

        let payload = match action {
            SyncAction::Create => QueuePayload::Create(Box::new(serde_json::from_str(&self.payload)?)),
            SyncAction::Update => QueuePayload::Update(serde_json::from_str(&self.payload)?),
            SyncAction::Delete => QueuePayload::Delete,
        };

        Ok(QueueEntry {
            id,
            collection,
            entity_id,
            payload,
            timestamp,
        })
    }
}

impl QueueRepository for SqliteQueueRepository<'_> {
    fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_queue (id, collection, entity_id, action, payload, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.id.to_string(),
                entry.collection.as_str(),
                entry.entity_id.as_str(),
                entry.action().as_str(),
                Self::encode_payload(&entry.payload)?,
                format_timestamp(&entry.timestamp),
            ],
        )?;
        Ok(())
    }

    fn scan(&self) -> Result<Vec<StoredEntry>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY seq"), [])
    }

    fn list(&self) -> Result<Vec<QueueEntry>> {
        Ok(decodable(self.scan()?))
    }

    fn list_for(&self, collection: Collection, entity_id: &RecordId) -> Result<Vec<QueueEntry>> {
        let rows = self.query(
            &format!("{SELECT_COLUMNS} WHERE collection = ? AND entity_id = ? ORDER BY seq"),
            params![collection.as_str(), entity_id.as_str()],
        )?;
        Ok(decodable(rows))
    }

    fn count_for(&self, collection: Collection, entity_id: &RecordId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE collection = ? AND entity_id = ?",
            params![collection.as_str(), entity_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn remove(&self, id: &Uuid) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM sync_queue WHERE id = ?", params![id.to_string()])?;
        Ok(rows > 0)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn decodable(rows: Vec<StoredEntry>) -> Vec<QueueEntry> {
    rows.into_iter()
        .filter_map(|row| match row {
            Ok(entry) => Some(entry),
            Err(undecodable) => {
                tracing::warn!(
                    "Skipping undecodable queue entry {}: {}",
                    undecodable.id,
                    undecodable.reason
                );
                None
            }
        })
        .collect()
}
