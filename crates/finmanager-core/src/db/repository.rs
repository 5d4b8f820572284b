//! Record repository implementation

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{Collection, EntityData, Record, RecordId, SyncStatus};
use crate::util::{format_timestamp, parse_timestamp};

/// Trait for record storage operations, scoped per collection
pub trait RecordRepository {
    /// All live records of a collection, in storage order
    fn list(&self, collection: Collection) -> Result<Vec<Record>>;

    /// Get a live record by ID
    fn get(&self, collection: Collection, id: &RecordId) -> Result<Option<Record>>;

    /// Insert a new record; fails if the key already exists
    fn add(&self, record: &Record) -> Result<()>;

    /// Insert or replace a record
    fn put(&self, record: &Record) -> Result<()>;

    /// Hide a record from reads until its deletion is confirmed remotely
    fn soft_delete(&self, collection: Collection, id: &RecordId, at: DateTime<Utc>)
        -> Result<bool>;

    /// Physically remove a record
    fn delete(&self, collection: Collection, id: &RecordId) -> Result<()>;
}

/// `SQLite` implementation of `RecordRepository`
pub struct SqliteRecordRepository<'a> {
    conn: &'a Connection,
}

struct RecordRow {
    id: String,
    created_at: String,
    updated_at: String,
    sync_status: String,
    data: String,
}

impl<'a> SqliteRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Read the raw columns of a record row
    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
        Ok(RecordRow {
            id: row.get(0)?,
            created_at: row.get(1)?,
            updated_at: row.get(2)?,
            sync_status: row.get(3)?,
            data: row.get(4)?,
        })
    }

    fn write(&self, sql: &str, record: &Record) -> Result<()> {
        let data = serde_json::to_string(&record.data.to_fields()?)?;
        self.conn.execute(
            sql,
            params![
                record.id.as_str(),
                format_timestamp(&record.created_at),
                format_timestamp(&record.updated_at),
                record.sync_status.as_str(),
                data,
            ],
        )?;
        Ok(())
    }
}

impl RecordRow {
    fn into_record(self, collection: Collection) -> Result<Record> {
        let id = self
            .id
            .parse()
            .map_err(|_| Error::Database(format!("invalid record id '{}'", self.id)))?;
        let sync_status: SyncStatus = self.sync_status.parse().map_err(Error::Database)?;
        let fields = serde_json::from_str(&self.data)?;

        Ok(Record {
            id,
            created_at: parse_stored_timestamp(&self.created_at)?,
            updated_at: parse_stored_timestamp(&self.updated_at)?,
            sync_status,
            data: EntityData::from_fields(collection, fields)?,
        })
    }
}

fn parse_stored_timestamp(value: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(value).ok_or_else(|| Error::Database(format!("invalid timestamp '{value}'")))
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn list(&self, collection: Collection) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, created_at, updated_at, sync_status, data
             FROM {}
             WHERE is_deleted = 0
             ORDER BY rowid",
            collection.as_str()
        ))?;

        let rows = stmt
            .query_map([], Self::read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|row| row.into_record(collection))
            .collect()
    }

    fn get(&self, collection: Collection, id: &RecordId) -> Result<Option<Record>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, created_at, updated_at, sync_status, data
                     FROM {}
                     WHERE id = ? AND is_deleted = 0",
                    collection.as_str()
                ),
                params![id.as_str()],
                Self::read_row,
            )
            .optional()?;

        row.map(|row| row.into_record(collection)).transpose()
    }

    fn add(&self, record: &Record) -> Result<()> {
        self.write(
            &format!(
                "INSERT INTO {} (id, created_at, updated_at, sync_status, data)
                 VALUES (?, ?, ?, ?, ?)",
                record.collection().as_str()
            ),
            record,
        )
    }

    fn put(&self, record: &Record) -> Result<()> {
        self.write(
            &format!(
                "INSERT INTO {} (id, created_at, updated_at, sync_status, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    sync_status = excluded.sync_status,
                    data = excluded.data",
                record.collection().as_str()
            ),
            record,
        )
    }

    fn soft_delete(
        &self,
        collection: Collection,
        id: &RecordId,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows = self.conn.execute(
            &format!(
                "UPDATE {} SET is_deleted = 1, sync_status = ?, updated_at = ?
                 WHERE id = ? AND is_deleted = 0",
                collection.as_str()
            ),
            params![
                SyncStatus::Updated.as_str(),
                format_timestamp(&at),
                id.as_str()
            ],
        )?;
        Ok(rows > 0)
    }

    fn delete(&self, collection: Collection, id: &RecordId) -> Result<()> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?", collection.as_str()),
            params![id.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{PayableStatus, Payable, Supplier};
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn supplier(name: &str) -> Record {
        Record::new(EntityData::Supplier(Supplier::new(name)))
    }

    #[test]
    fn test_add_and_get() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let record = supplier("Acme");
        repo.add(&record).unwrap();

        let fetched = repo.get(Collection::Suppliers, &record.id).unwrap().unwrap();
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.data, record.data);
        assert_eq!(fetched.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn test_add_rejects_existing_key() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let record = supplier("Acme");
        repo.add(&record).unwrap();
        assert!(repo.add(&record).is_err());
    }

    #[test]
    fn test_get_is_scoped_by_collection() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let record = supplier("Acme");
        repo.add(&record).unwrap();
        assert!(repo.get(Collection::Payables, &record.id).unwrap().is_none());
    }

    #[test]
    fn test_list_keeps_storage_order() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let first = supplier("Zeta");
        let second = supplier("Alpha");
        repo.add(&first).unwrap();
        repo.add(&second).unwrap();

        let ids: Vec<_> = repo
            .list(Collection::Suppliers)
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_put_replaces_data_and_status() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let mut record = Record::new(EntityData::Payable(Payable {
            supplier_name: "Acme".to_string(),
            description: String::new(),
            amount: 10.0,
            due_date: "2024-05-10".parse().unwrap(),
            status: PayableStatus::Pending,
            notes: String::new(),
        }));
        repo.add(&record).unwrap();

        if let EntityData::Payable(payable) = &mut record.data {
            payable.status = PayableStatus::Paid;
        }
        record.sync_status = SyncStatus::Updated;
        repo.put(&record).unwrap();

        let fetched = repo.get(Collection::Payables, &record.id).unwrap().unwrap();
        assert_eq!(fetched.data, record.data);
        assert_eq!(fetched.sync_status, SyncStatus::Updated);
        assert_eq!(fetched.created_at, record.created_at);
    }

    #[test]
    fn test_soft_delete_hides_record() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let record = supplier("Acme");
        repo.add(&record).unwrap();

        assert!(repo
            .soft_delete(Collection::Suppliers, &record.id, Utc::now())
            .unwrap());
        assert!(repo.get(Collection::Suppliers, &record.id).unwrap().is_none());
        assert!(repo.list(Collection::Suppliers).unwrap().is_empty());

        // Second soft delete finds nothing live
        assert!(!repo
            .soft_delete(Collection::Suppliers, &record.id, Utc::now())
            .unwrap());
    }

    #[test]
    fn test_delete_removes_row() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let record = supplier("Acme");
        repo.add(&record).unwrap();
        repo.delete(Collection::Suppliers, &record.id).unwrap();

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM suppliers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
