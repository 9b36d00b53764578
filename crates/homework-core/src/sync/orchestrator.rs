//! Sync orchestrator driving one fetch-merge-persist-push pass.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::error::SyncError;
use crate::item::{Collection, Item};
use crate::storage::LocalCache;
use crate::sync::auth::AuthSubscription;
use crate::sync::reconciler::reconcile;
use crate::sync::remote::RemoteStore;
use crate::sync::types::{MergeDecision, SyncPhase, SyncReport, SyncStatus};
use crate::timestamp;

/// Remote column used as the upsert conflict key.
pub const CONFLICT_KEY: &str = "id";

/// Result of one pass.
///
/// `merged` is set whenever the merged collection was committed to the local
/// cache, which includes a pass whose push failed.
#[derive(Debug)]
pub struct SyncPass {
    pub merged: Option<Collection>,
    pub outcome: Result<SyncReport, SyncError>,
}

impl SyncPass {
    fn failed(error: SyncError) -> Self {
        Self {
            merged: None,
            outcome: Err(error),
        }
    }
}

/// Marks a principal as having a pass in flight until dropped.
struct InFlight<'a> {
    active: &'a Mutex<HashSet<String>>,
    principal_id: String,
}

impl<'a> InFlight<'a> {
    fn acquire(active: &'a Mutex<HashSet<String>>, principal_id: &str) -> Option<Self> {
        let inserted = active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(principal_id.to_string());
        inserted.then(|| Self {
            active,
            principal_id: principal_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.principal_id);
    }
}

/// Runs reconciliation passes against one remote table.
pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteStore>,
    table: String,
    active: Mutex<HashSet<String>>,
    phase: watch::Sender<SyncPhase>,
    last_sync_at: Mutex<Option<DateTime<Utc>>>,
}

impl SyncOrchestrator {
    pub fn new(remote: Arc<dyn RemoteStore>, table: impl Into<String>) -> Self {
        let (phase, _rx) = watch::channel(SyncPhase::Idle);
        Self {
            remote,
            table: table.into(),
            active: Mutex::new(HashSet::new()),
            phase,
            last_sync_at: Mutex::new(None),
        }
    }

    /// Phase changes of the most recent pass.
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Get current sync status.
    ///
    /// `in_progress` covers every principal with a pass in flight, while
    /// `phase` is whatever the most recent phase change was.
    pub fn status(&self) -> SyncStatus {
        let in_progress = !self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty();
        SyncStatus {
            phase: *self.phase.borrow(),
            last_sync_at: *self.last_sync_at.lock().unwrap_or_else(PoisonError::into_inner),
            in_progress,
        }
    }

    fn advance(&self, next: SyncPhase) {
        let previous = self.phase.send_replace(next);
        if !previous.can_advance_to(next) {
            tracing::debug!(?previous, ?next, "overlapping passes interleaved phases");
        }
        tracing::debug!(phase = ?next, "sync phase");
    }

    fn abort(&self, error: SyncError) -> SyncPass {
        self.advance(SyncPhase::Idle);
        tracing::warn!(%error, "sync pass failed");
        SyncPass::failed(error)
    }

    /// Run one pass for whoever `auth` says is signed in.
    ///
    /// `local` is the caller's committed collection; it is only replaced
    /// through the returned [`SyncPass::merged`]. Merging is pure, so every
    /// failure after the fetch happens in `Pushing`: the principal check, the
    /// local cache write, then the upsert. A push failure therefore never
    /// loses the merged state.
    pub async fn run(&self, auth: &AuthSubscription, cache: &LocalCache, local: &[Item]) -> SyncPass {
        let Some(principal) = auth.current() else {
            return SyncPass::failed(SyncError::NotAuthenticated);
        };
        let Some(_in_flight) = InFlight::acquire(&self.active, &principal.id) else {
            tracing::debug!(user_id = %principal.id, "sync already running");
            return SyncPass::failed(SyncError::SyncInProgress(principal.id));
        };

        self.advance(SyncPhase::Fetching);
        let rows = match self.remote.select(&self.table, &principal).await {
            Ok(rows) => rows,
            Err(e) => return self.abort(SyncError::RemoteFetch(e)),
        };

        self.advance(SyncPhase::Merging);
        let result = reconcile(local, &rows, &principal.id, timestamp::now_millis());
        tracing::info!(
            merged = result.merged.len(),
            fetched = rows.len(),
            remote_wins = result.count(MergeDecision::UseRemote),
            pulled = result.count(MergeDecision::RemoteOnly),
            "reconciled local and remote items"
        );

        self.advance(SyncPhase::Pushing);
        if !auth.is_current(&principal) {
            return self.abort(SyncError::PrincipalChanged);
        }
        if let Err(e) = cache.save(&result.merged).await {
            return self.abort(SyncError::Store(e));
        }

        let pushed = self
            .remote
            .upsert(&self.table, &result.write_set, CONFLICT_KEY, &principal)
            .await;
        if let Err(e) = pushed {
            let mut pass = self.abort(SyncError::RemoteWrite(e));
            pass.merged = Some(result.merged);
            return pass;
        }

        let finished_at = Utc::now();
        *self.last_sync_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(finished_at);
        self.advance(SyncPhase::Done);

        let report = SyncReport {
            merged: result.merged.len(),
            pulled: result.count(MergeDecision::RemoteOnly),
            pushed: result.write_set.len(),
            local_wins: result.count(MergeDecision::UseLocal),
            remote_wins: result.count(MergeDecision::UseRemote),
            finished_at,
        };
        tracing::info!(pushed = report.pushed, "sync pass complete");

        SyncPass {
            merged: Some(result.merged),
            outcome: Ok(report),
        }
    }
}
