//! Cache Events
//!
//! Immutable records of significant things the cache core did: bulk
//! invalidations, tier movements, maintenance passes and their failures.
//! They feed the audit log and the caller's observability hook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event emitted by the cache core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheEvent {
    // =========================================================================
    // Keyed Cache Events
    // =========================================================================
    /// A cache write was rejected by the backing store.
    EntryWriteFailed {
        key: String,
        group: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Every registered key of a group was deleted.
    GroupFlushed {
        group: String,
        deleted: usize,
        timestamp: DateTime<Utc>,
    },

    /// The whole namespace was purged.
    CacheFlushed {
        deleted: usize,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Tiering Events
    // =========================================================================
    /// Cold entries moved from the fast tier to the slow tier.
    EntriesMigrated {
        migrated: usize,
        skipped_hot: usize,
        timestamp: DateTime<Utc>,
    },

    /// Entries removed by preventive LRU eviction.
    EntriesEvicted {
        evicted: usize,
        hot_evicted: usize,
        freed_bytes: u64,
        timestamp: DateTime<Utc>,
    },

    /// Expired entries removed by a sweep.
    ExpiredSwept {
        removed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Non-active price records older than the retention window purged.
    RecordsPurged {
        removed: usize,
        retention_days: u32,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Maintenance Events
    // =========================================================================
    /// A maintenance pass finished (possibly with failed actions).
    MaintenancePassCompleted {
        pass_id: Uuid,
        batch_number: Option<u64>,
        level: String,
        actions_run: usize,
        actions_failed: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A single maintenance action failed; the pass continued.
    MaintenanceActionFailed {
        pass_id: Uuid,
        action: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl CacheEvent {
    /// Stable event name
    pub fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::EntryWriteFailed { .. } => "EntryWriteFailed",
            CacheEvent::GroupFlushed { .. } => "GroupFlushed",
            CacheEvent::CacheFlushed { .. } => "CacheFlushed",
            CacheEvent::EntriesMigrated { .. } => "EntriesMigrated",
            CacheEvent::EntriesEvicted { .. } => "EntriesEvicted",
            CacheEvent::ExpiredSwept { .. } => "ExpiredSwept",
            CacheEvent::RecordsPurged { .. } => "RecordsPurged",
            CacheEvent::MaintenancePassCompleted { .. } => "MaintenancePassCompleted",
            CacheEvent::MaintenanceActionFailed { .. } => "MaintenanceActionFailed",
        }
    }

    /// When the event happened
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CacheEvent::EntryWriteFailed { timestamp, .. }
            | CacheEvent::GroupFlushed { timestamp, .. }
            | CacheEvent::CacheFlushed { timestamp, .. }
            | CacheEvent::EntriesMigrated { timestamp, .. }
            | CacheEvent::EntriesEvicted { timestamp, .. }
            | CacheEvent::ExpiredSwept { timestamp, .. }
            | CacheEvent::RecordsPurged { timestamp, .. }
            | CacheEvent::MaintenancePassCompleted { timestamp, .. }
            | CacheEvent::MaintenanceActionFailed { timestamp, .. } => *timestamp,
        }
    }
}
