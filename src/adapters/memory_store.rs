//! In-Memory Backing Store
//!
//! `BackingStore` implementation over a `DashMap`, with TTL expiry driven by
//! an injected [`Clock`], an optional byte capacity, and write-failure
//! injection. Used for both the fast and the slow tier in the binary and in
//! tests; production deployments plug in their own persistence.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::trace;

use super::clock::SystemClock;
use crate::domain::ports::{BackingStore, Clock, StoreUsage};
use crate::error::{Error, Result};

/// Value held by the store
#[derive(Debug, Clone)]
struct StoredValue {
    data: Bytes,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// Operation counters for an [`InMemoryStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryStoreStats {
    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
    pub rejected_writes: u64,
}

/// In-memory backing store
pub struct InMemoryStore {
    /// Label used in logs ("fast", "slow", ...)
    name: String,
    entries: DashMap<String, StoredValue>,
    clock: Arc<dyn Clock>,
    /// Maximum stored bytes (None = unbounded)
    capacity_bytes: Option<u64>,
    total_bytes: AtomicU64,
    fail_writes: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    rejected_writes: AtomicU64,
}

impl InMemoryStore {
    /// Create an unbounded store on the system clock
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_clock(name, Arc::new(SystemClock))
    }

    /// Create an unbounded store on the given clock
    pub fn with_clock(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
            clock,
            capacity_bytes: None,
            total_bytes: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            rejected_writes: AtomicU64::new(0),
        }
    }

    /// Limit the total stored bytes; writes beyond it are rejected
    pub fn with_capacity(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = Some(capacity_bytes);
        self
    }

    /// Make every subsequent write fail (simulates an unavailable store)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Store label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operation counters
    pub fn stats(&self) -> InMemoryStoreStats {
        InMemoryStoreStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            rejected_writes: self.rejected_writes.load(Ordering::Relaxed),
        }
    }

    fn remove_entry(&self, key: &str) -> Option<StoredValue> {
        let (_, old) = self.entries.remove(key)?;
        self.total_bytes
            .fetch_sub(old.data.len() as u64, Ordering::Relaxed);
        Some(old)
    }

    fn reject(&self, err: Error) -> Result<()> {
        self.rejected_writes.fetch_add(1, Ordering::Relaxed);
        Err(err)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .field("bytes", &self.total_bytes.load(Ordering::Relaxed))
            .field("capacity_bytes", &self.capacity_bytes)
            .finish()
    }
}

impl BackingStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            Some(value) if value.is_expired(now) => true,
            Some(value) => return Ok(Some(value.data.clone())),
            None => return Ok(None),
        };

        if expired {
            trace!(store = %self.name, key = %key, "Dropping expired value on read");
            self.remove_entry(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return self.reject(Error::store("set", key, format!("{} store unavailable", self.name)));
        }

        let size = value.len() as u64;
        if let Some(capacity) = self.capacity_bytes {
            let replaced = self
                .entries
                .get(key)
                .map(|v| v.data.len() as u64)
                .unwrap_or(0);
            let current = self.total_bytes.load(Ordering::Relaxed);
            let available = capacity.saturating_sub(current.saturating_sub(replaced));
            if size > available {
                return self.reject(Error::StoreCapacity {
                    requested: size,
                    available,
                });
            }
        }

        let now = self.clock.now();
        let expires_at = ttl.and_then(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
        });

        self.writes.fetch_add(1, Ordering::Relaxed);
        let old = self.entries.insert(
            key.to_string(),
            StoredValue {
                data: value,
                expires_at,
            },
        );

        self.total_bytes.fetch_add(size, Ordering::Relaxed);
        if let Some(old) = old {
            self.total_bytes
                .fetch_sub(old.data.len() as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(self.remove_entry(key).is_some())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let now = self.clock.now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn purge_expired(&self, prefix: &str) -> Result<usize> {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();

        let removed = expired
            .iter()
            .filter(|key| self.remove_entry(key).is_some())
            .count();
        if removed > 0 {
            trace!(store = %self.name, removed, "Purged expired values");
        }
        Ok(removed)
    }

    fn usage(&self) -> StoreUsage {
        StoreUsage {
            entries: self.entries.len() as u64,
            bytes: self.total_bytes.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
