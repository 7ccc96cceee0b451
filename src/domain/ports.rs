//! Domain Ports (Port/Adapter Pattern)
//!
//! The cache core depends only on these abstractions. Adapters in
//! [`crate::adapters`] provide in-process implementations; a deployment wires
//! in its own persistence (option/transient tables, object storage, ...).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Cache Core                           │
//! │   KeyedCacheStore │ PriceRecordCache │ MaintenanceScheduler  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   BackingStore │ Clock │ MemoryProbe │ EventPublisher        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ports are synchronous: the backing store's own read/write is the only
//! blocking work the core performs.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::events::CacheEvent;
use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// Size of the data a backing store currently holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreUsage {
    /// Number of live keys
    pub entries: u64,
    /// Total stored bytes
    pub bytes: u64,
}

// =============================================================================
// Backing Store Port
// =============================================================================

/// Durable key-value store with TTL support.
///
/// Single-key writes are assumed atomic; nothing else is. Implementations
/// must treat a key whose TTL has elapsed as absent.
pub trait BackingStore: Send + Sync {
    /// Read the raw bytes at `key`
    fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Write `value` at `key`, replacing any previous value.
    ///
    /// `None` means the value never expires.
    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<()>;

    /// Remove `key`; returns whether a value was present
    fn delete(&self, key: &str) -> Result<bool>;

    /// Enumerate live keys starting with `prefix`
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Reclaim values under `prefix` whose TTL has elapsed; returns how many
    /// were removed
    fn purge_expired(&self, prefix: &str) -> Result<usize>;

    /// Report current size
    fn usage(&self) -> StoreUsage;
}

// =============================================================================
// Clock Port
// =============================================================================

/// Source of the current time.
///
/// Injected so that TTL behaviour can be tested without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// Memory Probe Port
// =============================================================================

/// Reports memory pressure for the adaptive scheduler.
pub trait MemoryProbe: Send + Sync {
    /// Current usage as a percentage in `[0, 100]`
    fn usage_percent(&self) -> f64;
}

// =============================================================================
// Event Publisher Port
// =============================================================================

/// Sink for [`CacheEvent`]s (audit log, observability hook).
pub trait EventPublisher: Send + Sync {
    /// Publish a single event
    fn publish(&self, event: CacheEvent) -> Result<()>;

    /// Publish several events in order
    fn publish_all(&self, events: Vec<CacheEvent>) -> Result<()> {
        for event in events {
            self.publish(event)?;
        }
        Ok(())
    }
}
