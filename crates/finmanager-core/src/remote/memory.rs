//! In-process remote service for tests and offline demos.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::{DeleteRequest, RemoteError, RemoteResult, RemoteService, UpsertRequest};
use crate::auth::AuthSession;
use crate::models::{Collection, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCallKind {
    Upsert,
    Delete,
}

/// One call as the service received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub kind: RemoteCallKind,
    pub collection: Collection,
    pub id: RecordId,
    pub body: Option<Value>,
}

#[derive(Default)]
struct State {
    rows: HashMap<(Collection, RecordId), Map<String, Value>>,
    rejected: HashSet<RecordId>,
    calls: Vec<RemoteCall>,
    delay: Option<Duration>,
}

/// Remote store kept in memory with PostgREST-style merge upserts.
#[derive(Clone)]
pub struct MemoryRemote {
    state: Arc<Mutex<State>>,
    reachable: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(current, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            reachable: Arc::new(AtomicBool::new(true)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Refuse every write targeting `id` until [`accept`](Self::accept).
    pub async fn reject(&self, id: RecordId) {
        self.state.lock().await.rejected.insert(id);
    }

    pub async fn accept(&self, id: RecordId) {
        self.state.lock().await.rejected.remove(&id);
    }

    /// Hold every call for `delay` before answering.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.delay = delay;
    }

    pub async fn row(&self, collection: Collection, id: &RecordId) -> Option<Map<String, Value>> {
        self.state.lock().await.rows.get(&(collection, *id)).cloned()
    }

    pub async fn row_count(&self, collection: Collection) -> usize {
        self.state
            .lock()
            .await
            .rows
            .keys()
            .filter(|(row_collection, _)| *row_collection == collection)
            .count()
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().await.calls.clone()
    }

    /// Highest number of calls that were ever in flight at once.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn begin(&self, call: RemoteCall) -> RemoteResult<()> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.push(call);
            state.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unreachable("connection refused".to_string()))
        }
    }
}

fn rejection(id: &RecordId) -> RemoteError {
    RemoteError::Rejected {
        status: Some(400),
        message: format!("row {id} rejected"),
    }
}

fn forbidden(id: &RecordId) -> RemoteError {
    RemoteError::Rejected {
        status: Some(403),
        message: format!("row {id} belongs to another owner"),
    }
}

impl RemoteService for MemoryRemote {
    async fn upsert(&self, _session: &AuthSession, request: &UpsertRequest) -> RemoteResult<()> {
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);
        let body = request.body();
        self.begin(RemoteCall {
            kind: RemoteCallKind::Upsert,
            collection: request.collection,
            id: request.id,
            body: Some(body.clone()),
        })
        .await?;

        let Value::Object(fields) = body else {
            return Err(rejection(&request.id));
        };

        let mut state = self.state.lock().await;
        if state.rejected.contains(&request.id) {
            return Err(rejection(&request.id));
        }

        let row = state
            .rows
            .entry((request.collection, request.id))
            .or_default();
        if row
            .get("owner_id")
            .is_some_and(|owner| owner.as_str() != Some(request.owner_id.as_str()))
        {
            return Err(forbidden(&request.id));
        }
        row.extend(fields);
        Ok(())
    }

    async fn delete(&self, _session: &AuthSession, request: &DeleteRequest) -> RemoteResult<()> {
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);
        self.begin(RemoteCall {
            kind: RemoteCallKind::Delete,
            collection: request.collection,
            id: request.id,
            body: None,
        })
        .await?;

        let mut state = self.state.lock().await;
        if state.rejected.contains(&request.id) {
            return Err(rejection(&request.id));
        }

        let key = (request.collection, request.id);
        let owned = state.rows.get(&key).is_some_and(|row| {
            row.get("owner_id").and_then(Value::as_str) == Some(request.owner_id.as_str())
        });
        // A row owned by someone else is filtered out, exactly like a missing one
        if owned {
            state.rows.remove(&key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::util::now;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: "owner-1".to_string(),
                email: None,
            },
        }
    }

    fn upsert(id: RecordId, fields: Value) -> UpsertRequest {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        UpsertRequest {
            collection: Collection::Payables,
            id,
            owner_id: "owner-1".to_string(),
            fields,
            updated_at: now(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_merges_patch_into_existing_row() {
        let remote = MemoryRemote::new();
        let id = RecordId::new();

        remote
            .upsert(&session(), &upsert(id, json!({"amount": 10.0, "status": "pending"})))
            .await
            .unwrap();
        remote
            .upsert(&session(), &upsert(id, json!({"status": "paid"})))
            .await
            .unwrap();

        let row = remote.row(Collection::Payables, &id).await.unwrap();
        assert_eq!(row["amount"], json!(10.0));
        assert_eq!(row["status"], json!("paid"));
        assert_eq!(remote.row_count(Collection::Payables).await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_remote_records_call_but_keeps_state() {
        let remote = MemoryRemote::new();
        remote.set_reachable(false);
        let id = RecordId::new();

        let error = remote
            .upsert(&session(), &upsert(id, json!({"status": "paid"})))
            .await
            .unwrap_err();
        assert!(error.is_unreachable());
        assert_eq!(remote.calls().await.len(), 1);
        assert_eq!(remote.row_count(Collection::Payables).await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_ids_are_refused() {
        let remote = MemoryRemote::new();
        let id = RecordId::new();
        remote.reject(id).await;

        let error = remote
            .upsert(&session(), &upsert(id, json!({"status": "paid"})))
            .await
            .unwrap_err();
        assert!(matches!(error, RemoteError::Rejected { status: Some(400), .. }));

        remote.accept(id).await;
        assert!(remote
            .upsert(&session(), &upsert(id, json!({"status": "paid"})))
            .await
            .is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_is_owner_scoped_and_idempotent() {
        let remote = MemoryRemote::new();
        let id = RecordId::new();
        remote
            .upsert(&session(), &upsert(id, json!({"status": "paid"})))
            .await
            .unwrap();

        let foreign = DeleteRequest {
            collection: Collection::Payables,
            id,
            owner_id: "owner-2".to_string(),
        };
        remote.delete(&session(), &foreign).await.unwrap();
        assert!(remote.row(Collection::Payables, &id).await.is_some());

        let own = DeleteRequest {
            owner_id: "owner-1".to_string(),
            ..foreign
        };
        remote.delete(&session(), &own).await.unwrap();
        remote.delete(&session(), &own).await.unwrap();
        assert!(remote.row(Collection::Payables, &id).await.is_none());
    }
}
