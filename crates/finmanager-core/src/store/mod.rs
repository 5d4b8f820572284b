//! Entity store: durable per-collection records with every mutation mirrored
//! into the sync queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::db::{
    Database, QueueRepository, RecordRepository, SqliteQueueRepository, SqliteRecordRepository,
    StoredEntry,
};
use crate::models::{
    Collection, EntityData, FieldPatch, QueueEntry, QueuePayload, Record, RecordId, SyncAction,
    SyncStatus,
};
use crate::util::now;
use crate::Result;

/// Thread-safe handle over the local database.
///
/// Record writes and their queue entries are committed in one transaction.
#[derive(Clone)]
pub struct EntityStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl EntityStore {
    /// Open a store backed by the database file at `db_path`.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::open(&db_path)?;
        tracing::debug!("Opened local store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing database file, if any.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Every live record of a collection, in storage order.
    pub async fn get_all(&self, collection: Collection) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).list(collection)
    }

    pub async fn get_by_id(&self, collection: Collection, id: &RecordId) -> Result<Option<Record>> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).get(collection, id)
    }

    /// Persist a new record and enqueue its CREATE.
    pub async fn create(&self, data: EntityData) -> Result<Record> {
        let record = Record::new(data);
        let entry = QueueEntry::new(
            record.collection(),
            record.id,
            QueuePayload::Create(Box::new(record.clone())),
            record.created_at,
        );

        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        SqliteRecordRepository::new(&tx).add(&record)?;
        SqliteQueueRepository::new(&tx).enqueue(&entry)?;
        tx.commit()?;

        tracing::debug!("Created {} {}", record.collection(), record.id);
        Ok(record)
    }

    /// Validate raw JSON fields against the collection's type, then create.
    pub async fn create_fields(
        &self,
        collection: Collection,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let data = EntityData::from_fields(collection, fields)?;
        self.create(data).await
    }

    /// Merge `patch` into an existing record and enqueue it as an UPDATE.
    ///
    /// A missing record is a silent no-op.
    pub async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        patch: FieldPatch,
    ) -> Result<()> {
        self.update_with_status(collection, id, patch, None)
            .await
            .map(|_| ())
    }

    /// Like [`update`](Self::update) with an explicit resulting status.
    ///
    /// `None` means `updated`. A resulting status of `synced` writes the
    /// record without enqueueing anything. Returns the record as written, or
    /// `None` when it does not exist.
    pub async fn update_with_status(
        &self,
        collection: Collection,
        id: &RecordId,
        patch: FieldPatch,
        status: Option<SyncStatus>,
    ) -> Result<Option<Record>> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        let updated = apply_update(&tx, collection, id, &patch, status)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Set the sync status without touching domain fields.
    pub async fn update_status(
        &self,
        collection: Collection,
        id: &RecordId,
        status: SyncStatus,
    ) -> Result<()> {
        self.update_with_status(collection, id, FieldPatch::new(), Some(status))
            .await
            .map(|_| ())
    }

    /// Hide a record locally and enqueue its DELETE.
    ///
    /// The row is purged once the remote delete is acknowledged.
    pub async fn delete(&self, collection: Collection, id: &RecordId) -> Result<()> {
        let at = now();
        let entry = QueueEntry::new(collection, *id, QueuePayload::Delete, at);

        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        if !SqliteRecordRepository::new(&tx).soft_delete(collection, id, at)? {
            tracing::debug!("Delete of missing {collection} {id} ignored");
            return Ok(());
        }
        SqliteQueueRepository::new(&tx).enqueue(&entry)?;
        tx.commit()?;

        tracing::debug!("Deleted {collection} {id}");
        Ok(())
    }

    /// Every decodable queue entry, in enqueue order.
    pub async fn queue_snapshot(&self) -> Result<Vec<QueueEntry>> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).list()
    }

    /// Every queue row in enqueue order, including rows that no longer decode.
    pub async fn queue_scan(&self) -> Result<Vec<StoredEntry>> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).scan()
    }

    pub async fn pending_count(&self) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).count()
    }

    /// Outstanding entries targeting one record.
    pub async fn pending_for(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Vec<QueueEntry>> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).list_for(collection, id)
    }

    /// Record that the remote side confirmed `entry`.
    ///
    /// Removes the entry and, once nothing else is outstanding for the same
    /// record, marks it `synced` (or purges it after a DELETE).
    pub async fn acknowledge(&self, entry: &QueueEntry) -> Result<()> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let queue = SqliteQueueRepository::new(&tx);
        if !queue.remove(&entry.id)? {
            tracing::debug!("Queue entry {} already acknowledged", entry.id);
        }

        let remaining = queue.count_for(entry.collection, &entry.entity_id)?;
        if remaining > 0 {
            tracing::debug!(
                "{} {} still has {remaining} queued change(s)",
                entry.collection,
                entry.entity_id
            );
        } else if entry.action() == SyncAction::Delete {
            SqliteRecordRepository::new(&tx).delete(entry.collection, &entry.entity_id)?;
        } else {
            apply_update(
                &tx,
                entry.collection,
                &entry.entity_id,
                &FieldPatch::new(),
                Some(SyncStatus::Synced),
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Merge, restamp and persist a record, enqueueing the patch unless the
/// resulting status is `synced`.
fn apply_update(
    conn: &Connection,
    collection: Collection,
    id: &RecordId,
    patch: &FieldPatch,
    status: Option<SyncStatus>,
) -> Result<Option<Record>> {
    let records = SqliteRecordRepository::new(conn);
    let Some(mut record) = records.get(collection, id)? else {
        tracing::debug!("Update of missing {collection} {id} ignored");
        return Ok(None);
    };

    record.data = record.data.apply_patch(patch)?;
    record.updated_at = now();
    record.sync_status = status.unwrap_or(SyncStatus::Updated);
    records.put(&record)?;

    if record.sync_status != SyncStatus::Synced {
        let entry = QueueEntry::new(
            collection,
            *id,
            QueuePayload::Update(patch.clone()),
            record.updated_at,
        );
        SqliteQueueRepository::new(conn).enqueue(&entry)?;
    }

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Payable, PayableStatus, Supplier};
    use crate::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payable() -> EntityData {
        EntityData::Payable(Payable {
            supplier_name: "Acme".to_string(),
            description: "Flour".to_string(),
            amount: 320.0,
            due_date: "2024-05-10".parse().unwrap(),
            status: PayableStatus::Pending,
            notes: String::new(),
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_persists_record_and_enqueues_full_copy() {
        let store = EntityStore::open_in_memory().await.unwrap();
        let record = store
            .create(EntityData::Supplier(Supplier::new("Acme")))
            .await
            .unwrap();

        assert_eq!(record.sync_status, SyncStatus::Pending);
        let stored = store
            .get_by_id(Collection::Suppliers, &record.id)
            .await
            .unwrap();
        assert_eq!(stored, Some(record.clone()));

        let queue = store.queue_snapshot().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].entity_id, record.id);
        assert_eq!(queue[0].payload, QueuePayload::Create(Box::new(record)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_fields_rejects_unknown_fields_without_writing() {
        let store = EntityStore::open_in_memory().await.unwrap();
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!("Acme"));
        fields.insert("rating".to_string(), json!(5));

        let error = store
            .create_fields(Collection::Suppliers, fields)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert!(store.get_all(Collection::Suppliers).await.unwrap().is_empty());
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_merges_and_enqueues_only_the_patch() {
        let store = EntityStore::open_in_memory().await.unwrap();
        let record = store.create(payable()).await.unwrap();

        let patch = FieldPatch::new().set("status", PayableStatus::Paid);
        store
            .update(Collection::Payables, &record.id, patch.clone())
            .await
            .unwrap();

        let stored = store
            .get_by_id(Collection::Payables, &record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Updated);
        assert!(stored.updated_at >= record.updated_at);
        let EntityData::Payable(payable) = stored.data else {
            panic!("expected a payable");
        };
        assert_eq!(payable.status, PayableStatus::Paid);
        assert_eq!(payable.supplier_name, "Acme");

        let queue = store.queue_snapshot().await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[1].payload, QueuePayload::Update(patch));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_of_missing_record_is_silent_noop() {
        let store = EntityStore::open_in_memory().await.unwrap();
        store
            .update(
                Collection::Payables,
                &RecordId::new(),
                FieldPatch::new().set("status", "paid"),
            )
            .await
            .unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_patch_leaves_record_and_queue_untouched() {
        let store = EntityStore::open_in_memory().await.unwrap();
        let record = store.create(payable()).await.unwrap();

        let error = store
            .update(
                Collection::Payables,
                &record.id,
                FieldPatch::new().set("amount", "lots"),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));

        let stored = store
            .get_by_id(Collection::Payables, &record.id)
            .await
            .unwrap();
        assert_eq!(stored, Some(record));
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_status_synced_does_not_enqueue() {
        let store = EntityStore::open_in_memory().await.unwrap();
        let record = store.create(payable()).await.unwrap();

        store
            .update_status(Collection::Payables, &record.id, SyncStatus::Synced)
            .await
            .unwrap();

        let stored = store
            .get_by_id(Collection::Payables, &record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Synced);
        assert_eq!(stored.data, record.data);
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_hides_record_and_enqueues_delete() {
        let store = EntityStore::open_in_memory().await.unwrap();
        let record = store.create(payable()).await.unwrap();

        store.delete(Collection::Payables, &record.id).await.unwrap();
        assert!(store
            .get_by_id(Collection::Payables, &record.id)
            .await
            .unwrap()
            .is_none());

        let pending = store
            .pending_for(Collection::Payables, &record.id)
            .await
            .unwrap();
        let actions: Vec<_> = pending.iter().map(QueueEntry::action).collect();
        assert_eq!(actions, vec![SyncAction::Create, SyncAction::Delete]);

        // Deleting again is a no-op
        store.delete(Collection::Payables, &record.id).await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn acknowledge_marks_synced_only_when_nothing_else_is_queued() {
        let store = EntityStore::open_in_memory().await.unwrap();
        let record = store.create(payable()).await.unwrap();
        store
            .update(
                Collection::Payables,
                &record.id,
                FieldPatch::new().set("notes", "call first"),
            )
            .await
            .unwrap();

        let queue = store.queue_snapshot().await.unwrap();
        store.acknowledge(&queue[0]).await.unwrap();
        let stored = store
            .get_by_id(Collection::Payables, &record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Updated);

        store.acknowledge(&queue[1]).await.unwrap();
        let stored = store
            .get_by_id(Collection::Payables, &record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Synced);
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn acknowledged_delete_purges_row() {
        let store = EntityStore::open_in_memory().await.unwrap();
        let record = store.create(payable()).await.unwrap();
        store.delete(Collection::Payables, &record.id).await.unwrap();

        for entry in store.queue_snapshot().await.unwrap() {
            store.acknowledge(&entry).await.unwrap();
        }

        assert_eq!(store.pending_count().await.unwrap(), 0);
        let db = store.db.lock().await;
        let rows: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM payables", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_dirs_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("finmanager.db");

        let id = {
            let store = EntityStore::open_path(&db_path).await.unwrap();
            assert_eq!(store.db_path(), Some(db_path.as_path()));
            store
                .create(EntityData::Supplier(Supplier::new("Acme")))
                .await
                .unwrap()
                .id
        };

        let reopened = EntityStore::open_path(&db_path).await.unwrap();
        assert!(reopened
            .get_by_id(Collection::Suppliers, &id)
            .await
            .unwrap()
            .is_some());
        assert_eq!(reopened.pending_count().await.unwrap(), 1);
    }
}
