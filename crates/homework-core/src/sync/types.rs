//! Core types for remote synchronization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::timestamp;

/// Authenticated account identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account id; written as `user_id` on every remote row.
    pub id: String,
    /// Bearer token for the remote service, if it requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// A row of the remote `homeworks` table.
///
/// Timestamps are coerced to epoch milliseconds on decode; rows produced for
/// the write-set always carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRow {
    #[serde(deserialize_with = "timestamp::deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<i64>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub updated_at: Option<i64>,
}

impl RemoteRow {
    /// Row for `item`, owned by `owner`.
    pub fn from_item(item: &Item, owner: &str) -> Self {
        Self {
            id: item.id.clone(),
            user_id: owner.to_string(),
            title: item.title.clone(),
            done: item.done,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }

    /// Item-shaped view of this row.
    pub fn to_item(&self) -> Item {
        Item {
            id: self.id.clone(),
            title: self.title.clone(),
            done: self.done,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Which side won for one id during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeDecision {
    /// Present on both sides, local copy kept (newer or tied).
    UseLocal,
    /// Present on both sides, remote copy is strictly newer.
    UseRemote,
    /// Not yet known to the server.
    LocalOnly,
    /// Adopted from another device.
    RemoteOnly,
}

/// Phase of a sync pass.
///
/// `Idle -> Fetching -> Merging -> Pushing -> Done`. Only `Fetching` and
/// `Pushing` can fail back to `Idle`; `Merging` never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Merging,
    Pushing,
    Done,
}

impl SyncPhase {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Fetching | Self::Merging | Self::Pushing)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_advance_to(self, next: SyncPhase) -> bool {
        use SyncPhase::*;
        matches!(
            (self, next),
            (Idle | Done, Fetching)
                | (Fetching, Merging)
                | (Merging, Pushing)
                | (Pushing, Done)
                | (Fetching | Pushing, Idle)
        )
    }
}

/// Current sync status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Phase of the most recent pass.
    pub phase: SyncPhase,
    /// Last successful sync timestamp.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Whether a sync is currently in progress.
    pub in_progress: bool,
}

/// Summary of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Items in the merged collection.
    pub merged: usize,
    /// Items adopted from the remote side.
    pub pulled: usize,
    /// Rows upserted remotely.
    pub pushed: usize,
    pub local_wins: usize,
    pub remote_wins: usize,
    pub finished_at: DateTime<Utc>,
}
