//! Remote service boundary: upsert-by-id and delete-by-id, scoped by owner.

mod memory;
mod supabase;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::AuthSession;
use crate::models::{Collection, QueueEntry, QueuePayload, RecordId};
use crate::util::format_timestamp;

pub use memory::{MemoryRemote, RemoteCall, RemoteCallKind};
pub use supabase::SupabaseRemote;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The service could not be reached; the rest of a batch is pointless.
    #[error("Remote service unreachable: {0}")]
    Unreachable(String),
    /// The service answered and refused this payload.
    #[error("Remote service rejected the request: {message}")]
    Rejected {
        status: Option<u16>,
        message: String,
    },
}

impl RemoteError {
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Insert-or-patch of one row keyed by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertRequest {
    pub collection: Collection,
    pub id: RecordId,
    pub owner_id: String,
    /// Full row for a create, only the changed columns for an update
    pub fields: Map<String, Value>,
    pub updated_at: DateTime<Utc>,
}

impl UpsertRequest {
    /// JSON row sent to the service, metadata columns included.
    pub fn body(&self) -> Value {
        let mut body = self.fields.clone();
        body.insert("id".to_string(), Value::String(self.id.as_str()));
        body.insert("owner_id".to_string(), Value::String(self.owner_id.clone()));
        body.insert(
            "updated_at".to_string(),
            Value::String(format_timestamp(&self.updated_at)),
        );
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub collection: Collection,
    pub id: RecordId,
    pub owner_id: String,
}

/// The remote call a queue entry turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOperation {
    Upsert(UpsertRequest),
    Delete(DeleteRequest),
}

impl RemoteOperation {
    /// Build the call for `entry` on behalf of `owner_id`, stamped `updated_at`.
    pub fn from_entry(
        entry: &QueueEntry,
        owner_id: &str,
        updated_at: DateTime<Utc>,
    ) -> crate::Result<Self> {
        let fields = match &entry.payload {
            QueuePayload::Create(record) => {
                let mut fields = record.data.to_fields()?;
                fields.insert(
                    "created_at".to_string(),
                    Value::String(format_timestamp(&record.created_at)),
                );
                fields
            }
            QueuePayload::Update(patch) => patch.as_map().clone(),
            QueuePayload::Delete => {
                return Ok(Self::Delete(DeleteRequest {
                    collection: entry.collection,
                    id: entry.entity_id,
                    owner_id: owner_id.to_string(),
                }));
            }
        };

        Ok(Self::Upsert(UpsertRequest {
            collection: entry.collection,
            id: entry.entity_id,
            owner_id: owner_id.to_string(),
            fields,
            updated_at,
        }))
    }
}

/// Remote store the sync engine replicates into.
///
/// Upserts must treat `fields` as a partial patch of an existing row.
pub trait RemoteService: Clone + Send + Sync + 'static {
    fn upsert(
        &self,
        session: &AuthSession,
        request: &UpsertRequest,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    fn delete(
        &self,
        session: &AuthSession,
        request: &DeleteRequest,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Dispatch a prepared operation.
    fn execute(
        &self,
        session: &AuthSession,
        operation: &RemoteOperation,
    ) -> impl Future<Output = RemoteResult<()>> + Send {
        async move {
            match operation {
                RemoteOperation::Upsert(request) => self.upsert(session, request).await,
                RemoteOperation::Delete(request) => self.delete(session, request).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityData, FieldPatch, Record, Supplier};
    use crate::util::now;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn create_entry_becomes_full_upsert() {
        let record = Record::new(EntityData::Supplier(Supplier::new("Acme")));
        let entry = QueueEntry::new(
            Collection::Suppliers,
            record.id,
            QueuePayload::Create(Box::new(record.clone())),
            now(),
        );

        let RemoteOperation::Upsert(request) =
            RemoteOperation::from_entry(&entry, "owner-1", now()).unwrap()
        else {
            panic!("expected an upsert");
        };
        let body = request.body();
        assert_eq!(body["id"], json!(record.id.as_str()));
        assert_eq!(body["owner_id"], json!("owner-1"));
        assert_eq!(body["name"], json!("Acme"));
        assert_eq!(body["status"], json!("active"));
        assert!(body.get("created_at").is_some());
        assert!(body.get("sync_status").is_none());
    }

    #[test]
    fn update_entry_carries_only_the_patch() {
        let entry = QueueEntry::new(
            Collection::Payables,
            RecordId::new(),
            QueuePayload::Update(FieldPatch::new().set("status", "paid")),
            now(),
        );

        let RemoteOperation::Upsert(request) =
            RemoteOperation::from_entry(&entry, "owner-1", now()).unwrap()
        else {
            panic!("expected an upsert");
        };
        let keys: Vec<_> = request.fields.keys().cloned().collect();
        assert_eq!(keys, vec!["status".to_string()]);
        assert_eq!(request.body().as_object().map(Map::len), Some(4));
    }

    #[test]
    fn delete_entry_is_scoped_to_owner() {
        let id = RecordId::new();
        let entry = QueueEntry::new(Collection::Sales, id, QueuePayload::Delete, now());

        let operation = RemoteOperation::from_entry(&entry, "owner-1", now()).unwrap();
        assert_eq!(
            operation,
            RemoteOperation::Delete(DeleteRequest {
                collection: Collection::Sales,
                id,
                owner_id: "owner-1".to_string(),
            })
        );
    }
}
