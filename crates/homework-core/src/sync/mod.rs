//! Offline-first synchronization with the remote `homeworks` table.
//!
//! A pass fetches the principal's rows, reconciles them with the local
//! collection (last writer wins, local wins ties), persists the merged
//! collection locally and upserts the full write-set remotely.

pub mod auth;
pub mod orchestrator;
pub mod reconciler;
pub mod remote;
pub mod types;

#[cfg(test)]
mod orchestrator_tests;

pub use auth::{AuthState, AuthSubscription};
pub use orchestrator::{SyncOrchestrator, SyncPass, CONFLICT_KEY};
pub use reconciler::{decide_merge, reconcile, Reconciliation};
pub use remote::{MemoryRemote, PostgrestRemote, RemoteStore};
pub use types::{MergeDecision, Principal, RemoteRow, SyncPhase, SyncReport, SyncStatus};
