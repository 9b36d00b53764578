//! Last-writer-wins reconciliation of the local collection with remote rows.
//!
//! [`reconcile`] is pure: it never touches either store and takes the
//! backfill instant as an argument.

use indexmap::IndexMap;
use std::cmp::Ordering;

use crate::item::{Collection, Item};
use crate::sync::types::{MergeDecision, RemoteRow};

/// Result of merging a local collection with the remote rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Canonical collection: one item per id, newest `updatedAt` first.
    pub merged: Collection,
    /// One row per merged item, tagged with the requesting owner.
    pub write_set: Vec<RemoteRow>,
    /// Decision per id, in `merged` order.
    pub decisions: Vec<(String, MergeDecision)>,
}

impl Reconciliation {
    /// Number of ids resolved with `decision`.
    pub fn count(&self, decision: MergeDecision) -> usize {
        self.decisions.iter().filter(|(_, d)| *d == decision).count()
    }
}

/// Pick a side for an id present locally and remotely.
///
/// Strictly newer remote wins; equal timestamps keep the local copy.
pub fn decide_merge(local_updated: i64, remote_updated: i64) -> MergeDecision {
    if remote_updated > local_updated {
        MergeDecision::UseRemote
    } else {
        MergeDecision::UseLocal
    }
}

/// Canonical order: `updatedAt` descending, then `createdAt` descending, then id.
fn canonical_order(a: &Item, b: &Item) -> Ordering {
    b.last_modified()
        .cmp(&a.last_modified())
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Merge `local` with `remote` for `owner`.
///
/// Sides are compared on their stored timestamps, so a copy that was never
/// stamped loses to any real edit. The chosen copy is then backfilled with
/// `now` before sorting, which makes a second pass over the result a no-op.
/// A repeated id within one input is a caller bug; its first occurrence wins.
pub fn reconcile(local: &[Item], remote: &[RemoteRow], owner: &str, now: i64) -> Reconciliation {
    let mut remote_by_id: IndexMap<&str, Item> = IndexMap::with_capacity(remote.len());
    for row in remote {
        if remote_by_id.contains_key(row.id.as_str()) {
            tracing::debug!(id = %row.id, "ignoring duplicate remote row");
            continue;
        }
        remote_by_id.insert(row.id.as_str(), row.to_item());
    }

    let mut merged: IndexMap<String, (Item, MergeDecision)> =
        IndexMap::with_capacity(local.len() + remote_by_id.len());

    for item in local {
        if merged.contains_key(&item.id) {
            tracing::debug!(id = %item.id, "ignoring duplicate local item");
            continue;
        }
        let (winner, decision) = match remote_by_id.shift_remove(item.id.as_str()) {
            None => (item.clone(), MergeDecision::LocalOnly),
            Some(remote_item) => match decide_merge(item.last_modified(), remote_item.last_modified()) {
                MergeDecision::UseRemote => (remote_item, MergeDecision::UseRemote),
                _ => (item.clone(), MergeDecision::UseLocal),
            },
        };
        merged.insert(item.id.clone(), (winner.backfilled(now), decision));
    }

    for (id, remote_item) in remote_by_id {
        merged.insert(
            id.to_string(),
            (remote_item.backfilled(now), MergeDecision::RemoteOnly),
        );
    }

    let mut entries: Vec<(Item, MergeDecision)> = merged.into_values().collect();
    entries.sort_by(|(a, _), (b, _)| canonical_order(a, b));

    let write_set = entries
        .iter()
        .map(|(item, _)| RemoteRow::from_item(item, owner))
        .collect();
    let decisions = entries
        .iter()
        .map(|(item, decision)| (item.id.clone(), *decision))
        .collect();
    let merged = entries.into_iter().map(|(item, _)| item).collect();

    Reconciliation {
        merged,
        write_set,
        decisions,
    }
}
