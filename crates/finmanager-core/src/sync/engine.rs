//! Queue drain loop and its triggers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};

use super::SyncError;
use crate::auth::{AuthSession, SessionProvider};
use crate::config::SyncEngineConfig;
use crate::connectivity::Connectivity;
use crate::db::StoredEntry;
use crate::models::QueueEntry;
use crate::remote::{RemoteError, RemoteOperation, RemoteService};
use crate::store::EntityStore;
use crate::util::now;

/// Result of one [`SyncEngine::drain`] call.
#[derive(Debug)]
pub enum DrainOutcome {
    /// Nothing was attempted; carries the reason.
    Skipped(SyncError),
    Finished(DrainReport),
}

impl DrainOutcome {
    pub const fn report(&self) -> Option<&DrainReport> {
        match self {
            Self::Finished(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DrainReport {
    /// Entries confirmed remotely and removed from the queue
    pub delivered: usize,
    /// Entries the remote refused or that no longer decode; they stay queued
    pub rejected: Vec<SyncError>,
    /// Failure that stopped the drain before the end of its snapshot
    pub aborted: Option<SyncError>,
    /// Snapshot entries still queued when the drain ended
    pub remaining: usize,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.aborted.is_none() && self.remaining == 0
    }
}

/// Holds the in-progress flag for the lifetime of one drain.
struct DrainGuard {
    flag: Arc<AtomicBool>,
}

impl DrainGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drains the sync queue into a [`RemoteService`].
///
/// Clones share the in-progress flag, so at most one drain runs per engine
/// no matter how many handles trigger it. A trigger that arrives while a
/// drain runs is dropped, not deferred.
#[derive(Clone)]
pub struct SyncEngine<R, S> {
    store: EntityStore,
    remote: R,
    sessions: S,
    connectivity: Connectivity,
    config: SyncEngineConfig,
    in_progress: Arc<AtomicBool>,
}

impl<R: RemoteService, S: SessionProvider> SyncEngine<R, S> {
    pub fn new(
        store: EntityStore,
        remote: R,
        sessions: S,
        connectivity: Connectivity,
        config: SyncEngineConfig,
    ) -> Self {
        Self {
            store,
            remote,
            sessions,
            connectivity,
            config,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    pub const fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub fn is_draining(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Run one drain over a snapshot of the queue.
    pub async fn drain(&self) -> DrainOutcome {
        let Some(_guard) = DrainGuard::acquire(&self.in_progress) else {
            tracing::debug!("Drain skipped: another drain is in progress");
            return DrainOutcome::Skipped(SyncError::DrainInProgress);
        };

        if !self.connectivity.is_online() {
            tracing::debug!("Drain skipped: offline");
            return DrainOutcome::Skipped(SyncError::NotConnected);
        }

        let Some(session) = self.sessions.current_session() else {
            tracing::debug!("Drain skipped: no authenticated session");
            return DrainOutcome::Skipped(SyncError::NotAuthenticated);
        };

        let snapshot = match self.store.queue_scan().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::error!("Failed to read sync queue: {}", error);
                return DrainOutcome::Finished(DrainReport {
                    aborted: Some(SyncError::Store(error)),
                    remaining: self.store.pending_count().await.unwrap_or_default(),
                    ..DrainReport::default()
                });
            }
        };

        if snapshot.is_empty() {
            tracing::debug!("Sync queue is empty");
            return DrainOutcome::Finished(DrainReport::default());
        }

        tracing::info!("Draining {} queued change(s)", snapshot.len());
        let report = self.drain_snapshot(&session, &snapshot).await;
        tracing::info!(
            "Drain finished: {} delivered, {} rejected, {} remaining{}",
            report.delivered,
            report.rejected.len(),
            report.remaining,
            if report.aborted.is_some() { " (aborted)" } else { "" }
        );
        DrainOutcome::Finished(report)
    }

    async fn drain_snapshot(&self, session: &AuthSession, snapshot: &[StoredEntry]) -> DrainReport {
        let mut report = DrainReport::default();

        for stored in snapshot {
            let entry = match stored {
                Ok(entry) => entry,
                Err(undecodable) => {
                    let error = SyncError::UndecodableEntry {
                        entry_id: undecodable.id.clone(),
                        collection: undecodable.collection.clone(),
                        action: undecodable.action.clone(),
                        reason: undecodable.reason.clone(),
                    };
                    tracing::warn!("{}", error);
                    report.rejected.push(error);
                    continue;
                }
            };

            match self.deliver(session, entry).await {
                Ok(()) => report.delivered += 1,
                Err(error @ SyncError::RemoteRejected { .. }) => {
                    tracing::warn!("{}", error);
                    report.rejected.push(error);
                }
                Err(error) => {
                    match &error {
                        SyncError::Store(inner) => {
                            tracing::error!("Drain aborted on local store failure: {}", inner);
                        }
                        other => tracing::warn!("Drain aborted: {}", other),
                    }
                    report.aborted = Some(error);
                    break;
                }
            }
        }

        report.remaining = snapshot.len() - report.delivered;
        report
    }

    /// Push one entry and acknowledge it locally.
    async fn deliver(&self, session: &AuthSession, entry: &QueueEntry) -> Result<(), SyncError> {
        let operation = RemoteOperation::from_entry(entry, session.owner_id(), now())?;

        let call = self.remote.execute(session, &operation);
        match tokio::time::timeout(self.config.remote_timeout, call).await {
            Err(_) => {
                return Err(SyncError::RemoteUnreachable(format!(
                    "no response within {}ms",
                    self.config.remote_timeout.as_millis()
                )));
            }
            Ok(Err(RemoteError::Unreachable(message))) => {
                return Err(SyncError::RemoteUnreachable(message));
            }
            Ok(Err(RemoteError::Rejected { message, .. })) => {
                return Err(SyncError::RemoteRejected {
                    collection: entry.collection,
                    entity_id: entry.entity_id,
                    action: entry.action(),
                    message,
                });
            }
            Ok(Ok(())) => {}
        }

        self.store.acknowledge(entry).await?;
        tracing::debug!(
            "Delivered {} {} {}",
            entry.action(),
            entry.collection,
            entry.entity_id
        );
        Ok(())
    }

    /// Start a drain in the background and return its handle.
    pub fn spawn_drain(&self) -> JoinHandle<DrainOutcome> {
        let engine = self.clone();
        tokio::spawn(async move { engine.drain().await })
    }

    /// Fire-and-forget drain request.
    pub fn trigger(&self) {
        drop(self.spawn_drain());
    }

    /// Trigger drains on startup, on every offline to online transition, when
    /// a session becomes available and on the optional sync interval.
    ///
    /// Runs until the returned handle is aborted.
    pub fn spawn_trigger_loop(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let mut online = self.connectivity.subscribe();
        let mut sessions = self.sessions.subscribe();
        let mut ticker = self
            .config
            .sync_interval
            .map(|period| tokio::time::interval_at(Instant::now() + period, period));

        tokio::spawn(async move {
            engine.trigger();

            let mut was_online = *online.borrow_and_update();
            let mut had_session = sessions.borrow_and_update().is_some();

            loop {
                tokio::select! {
                    changed = online.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let is_online = *online.borrow_and_update();
                        if is_online && !was_online {
                            engine.trigger();
                        }
                        was_online = is_online;
                    }
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let has_session = sessions.borrow_and_update().is_some();
                        if has_session && !had_session {
                            engine.trigger();
                        }
                        had_session = has_session;
                    }
                    () = next_tick(&mut ticker) => engine.trigger(),
                }
            }
        })
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
