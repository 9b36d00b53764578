//! The homework session: owns the collection, its cache and the sync wiring.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{CoreError, StoreError, SyncError};
use crate::item::{self, Collection, Item};
use crate::storage::{LocalCache, LocalStore};
use crate::sync::{AuthSubscription, SyncOrchestrator, SyncReport};
use crate::timestamp;

/// Owns the item collection for one device.
///
/// Mutations replace the collection and then persist it. The in-memory value
/// stays committed if persisting fails; the store error is still returned.
pub struct HomeworkSession {
    items: Collection,
    cache: LocalCache,
    auth: AuthSubscription,
    orchestrator: Option<Arc<SyncOrchestrator>>,
}

impl HomeworkSession {
    /// Load the persisted collection from `store`.
    pub async fn open(store: Arc<dyn LocalStore>, auth: AuthSubscription) -> Result<Self, StoreError> {
        let mut cache = LocalCache::new(store);
        let items = cache.load().await?;
        Ok(Self {
            items,
            cache,
            auth,
            orchestrator: None,
        })
    }

    /// Enable remote sync through `orchestrator`.
    pub fn with_sync(mut self, orchestrator: Arc<SyncOrchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn remaining(&self) -> usize {
        item::remaining(&self.items)
    }

    pub fn auth(&self) -> &AuthSubscription {
        &self.auth
    }

    async fn commit(&mut self, next: Collection) -> Result<(), StoreError> {
        self.items = next;
        self.cache.save(&self.items).await?;
        Ok(())
    }

    pub async fn add(&mut self, title: &str) -> Result<Item, CoreError> {
        let (next, created) = item::add(&self.items, title, timestamp::now_millis())?;
        self.commit(next).await?;
        Ok(created)
    }

    pub async fn toggle(&mut self, id: &str) -> Result<(), CoreError> {
        let next = item::toggle(&self.items, id, timestamp::now_millis())?;
        self.commit(next).await?;
        Ok(())
    }

    pub async fn remove(&mut self, id: &str) -> Result<(), CoreError> {
        let next = item::remove(&self.items, id)?;
        self.commit(next).await?;
        Ok(())
    }

    /// Run one reconciliation pass and adopt its merged collection.
    pub async fn sync(&mut self) -> Result<SyncReport, SyncError> {
        let Some(orchestrator) = self.orchestrator.clone() else {
            return Err(SyncError::Disabled);
        };
        let pass = orchestrator.run(&self.auth, &self.cache, &self.items).await;
        if let Some(merged) = pass.merged {
            self.items = merged;
        }
        pass.outcome
    }
}

/// Run one sync pass on every signed-out to signed-in transition.
///
/// A sign-out and sign-in that land while a pass is running reach this task
/// as a single change, so after each pass the current principal is compared
/// with the one the pass ran for, and a different account gets its own pass.
///
/// Failures are logged and dropped. The task ends when the auth owner is
/// dropped and returns how many passes succeeded.
pub fn spawn_auto_sync(
    session: Arc<Mutex<HomeworkSession>>,
    mut auth: AuthSubscription,
) -> JoinHandle<usize> {
    let mut last_id = auth.observe().map(|p| p.id);
    tokio::spawn(async move {
        let mut succeeded = 0;
        while let Some(change) = auth.next_change().await {
            let previous = std::mem::replace(&mut last_id, change.as_ref().map(|p| p.id.clone()));
            let Some(mut principal) = change else { continue };
            if previous.is_some() {
                continue;
            }

            loop {
                tracing::debug!(user_id = %principal.id, "starting automatic sync after sign-in");
                match session.lock().await.sync().await {
                    Ok(report) => {
                        succeeded += 1;
                        tracing::info!(merged = report.merged, "automatic sync finished");
                    }
                    Err(error) => tracing::warn!(%error, "automatic sync after sign-in failed"),
                }

                let current = auth.observe();
                last_id = current.as_ref().map(|p| p.id.clone());
                match current {
                    Some(next) if next.id != principal.id => principal = next,
                    _ => break,
                }
            }
        }
        succeeded
    })
}
