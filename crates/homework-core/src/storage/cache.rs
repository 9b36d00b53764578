//! The on-device item collection under the `homeworks` key.

use std::sync::Arc;

use crate::error::StoreError;
use crate::item::{Collection, Item};
use crate::storage::LocalStore;

/// Local store key holding the serialized collection.
pub const HOMEWORKS_KEY: &str = "homeworks";

/// Typed view of the item collection in a [`LocalStore`].
///
/// Saves are suppressed until [`LocalCache::load`] has completed once, so an
/// empty default can never overwrite state that was not read yet.
pub struct LocalCache {
    store: Arc<dyn LocalStore>,
    loaded: bool,
}

impl LocalCache {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Read the persisted collection; a missing key yields an empty one.
    pub async fn load(&mut self) -> Result<Collection, StoreError> {
        let items = match self.store.get(HOMEWORKS_KEY).await? {
            Some(value) => serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
                key: HOMEWORKS_KEY.to_string(),
                source,
            })?,
            None => Vec::new(),
        };
        self.loaded = true;
        tracing::debug!(count = items.len(), "loaded local collection");
        Ok(items)
    }

    /// Persist `items`. Returns `false` if the write was suppressed because
    /// the cache has not been loaded yet.
    pub async fn save(&self, items: &[Item]) -> Result<bool, StoreError> {
        if !self.loaded {
            tracing::debug!("skipping save before initial load");
            return Ok(false);
        }
        let value = serde_json::to_value(items).map_err(|e| StoreError::WriteFailed {
            key: HOMEWORKS_KEY.to_string(),
            message: e.to_string(),
        })?;
        self.store.set(HOMEWORKS_KEY, &value).await?;
        Ok(true)
    }
}
