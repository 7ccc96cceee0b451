//! Group Key Registry
//!
//! Side index of the keys believed live in each cache group, stored as a
//! JSON array in the backing store at `{namespace}:registry:{group}`.
//!
//! Updates are an unsynchronized read-modify-write. Two processes writing to
//! the same group concurrently can lose a registration; the registry is an
//! accelerator for bulk invalidation, never a source of truth.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{trace, warn};

use super::key::CacheGroup;
use crate::domain::ports::BackingStore;
use crate::error::Result;

/// Per-group key index
pub struct GroupKeyRegistry {
    store: Arc<dyn BackingStore>,
    namespace: String,
}

impl GroupKeyRegistry {
    pub fn new(store: Arc<dyn BackingStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Backing store key holding `group`'s key list
    pub fn storage_key(&self, group: CacheGroup) -> String {
        format!("{}:registry:{}", self.namespace, group.as_str())
    }

    /// Prefix shared by every registry key
    pub fn storage_prefix(&self) -> String {
        format!("{}:registry:", self.namespace)
    }

    /// Keys currently registered for `group`.
    ///
    /// An unreadable list is treated as empty.
    pub fn load(&self, group: CacheGroup) -> Result<BTreeSet<String>> {
        let storage_key = self.storage_key(group);
        let Some(raw) = self.store.get(&storage_key)? else {
            return Ok(BTreeSet::new());
        };

        match serde_json::from_slice::<BTreeSet<String>>(&raw) {
            Ok(keys) => Ok(keys),
            Err(e) => {
                warn!(group = %group, error = %e, "Discarding unreadable group registry");
                Ok(BTreeSet::new())
            }
        }
    }

    /// Add `key` to `group`; returns whether it was newly added
    pub fn register(&self, group: CacheGroup, key: &str) -> Result<bool> {
        let mut keys = self.load(group)?;
        if !keys.insert(key.to_string()) {
            return Ok(false);
        }
        self.save(group, &keys)?;
        trace!(group = %group, key = %key, "Registered cache key");
        Ok(true)
    }

    /// Remove `key` from `group`; returns whether it was registered
    pub fn unregister(&self, group: CacheGroup, key: &str) -> Result<bool> {
        let mut keys = self.load(group)?;
        if !keys.remove(key) {
            return Ok(false);
        }
        self.save(group, &keys)?;
        Ok(true)
    }

    /// Drop the whole list for `group`
    pub fn clear(&self, group: CacheGroup) -> Result<()> {
        self.store.delete(&self.storage_key(group))?;
        Ok(())
    }

    /// Number of keys registered for `group`
    pub fn len(&self, group: CacheGroup) -> Result<usize> {
        Ok(self.load(group)?.len())
    }

    fn save(&self, group: CacheGroup, keys: &BTreeSet<String>) -> Result<()> {
        if keys.is_empty() {
            return self.clear(group);
        }
        let raw = serde_json::to_vec(keys)?;
        self.store
            .set(&self.storage_key(group), Bytes::from(raw), None)
    }
}
