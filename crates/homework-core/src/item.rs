//! Homework item model and collection mutations.
//!
//! A collection is an ordered `Vec<Item>` (newest first for display). Every
//! mutation takes the current collection by reference and returns a new one,
//! so whatever is persisted is always a complete committed value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::timestamp;

/// The on-device item collection.
pub type Collection = Vec<Item>;

/// A single homework entry.
///
/// Serialized with camelCase keys; `createdAt`/`updatedAt` may be missing on
/// records written by older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(deserialize_with = "timestamp::deserialize_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub done: bool,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<i64>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<i64>,
}

impl Item {
    /// Create a fresh, not-done item stamped at `now`.
    pub fn new(title: &str, now: i64) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            done: false,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    /// Timestamp used for last-writer-wins comparison.
    ///
    /// Falls back to `createdAt`, then 0, for records that were never backfilled.
    pub fn last_modified(&self) -> i64 {
        self.updated_at.or(self.created_at).unwrap_or(0)
    }

    /// Fill in missing timestamps.
    ///
    /// `createdAt := createdAt ?? updatedAt ?? now`, then
    /// `updatedAt := updatedAt ?? createdAt`.
    pub fn backfilled(mut self, now: i64) -> Self {
        let created = self.created_at.or(self.updated_at).unwrap_or(now);
        self.created_at = Some(created);
        self.updated_at = Some(self.updated_at.unwrap_or(created));
        self
    }

    fn toggled(&self, now: i64) -> Self {
        Self {
            done: !self.done,
            updated_at: Some(now),
            ..self.clone()
        }
    }
}

/// Prepend a new item. Returns the new collection and the created item.
pub fn add(items: &[Item], title: &str, now: i64) -> Result<(Collection, Item), ValidationError> {
    let item = Item::new(title, now)?;
    let mut next = Vec::with_capacity(items.len() + 1);
    next.push(item.clone());
    next.extend_from_slice(items);
    Ok((next, item))
}

/// Flip `done` on the item with `id` and stamp it at `now`.
pub fn toggle(items: &[Item], id: &str, now: i64) -> Result<Collection, ValidationError> {
    if !items.iter().any(|h| h.id == id) {
        return Err(ValidationError::UnknownItem(id.to_string()));
    }
    Ok(items
        .iter()
        .map(|h| if h.id == id { h.toggled(now) } else { h.clone() })
        .collect())
}

/// Drop the item with `id`. No tombstone is kept.
pub fn remove(items: &[Item], id: &str) -> Result<Collection, ValidationError> {
    if !items.iter().any(|h| h.id == id) {
        return Err(ValidationError::UnknownItem(id.to_string()));
    }
    Ok(items.iter().filter(|h| h.id != id).cloned().collect())
}

/// Number of items not yet done.
pub fn remaining(items: &[Item]) -> usize {
    items.iter().filter(|h| !h.done).count()
}
