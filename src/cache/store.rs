//! Keyed Cache Store
//!
//! Grouped, TTL-bounded cache over two backing stores:
//!
//! ```text
//! get:  local layer ─miss─▶ fast tier ─miss─▶ slow tier ─miss─▶ legacy raw read
//!                                              │
//!                                              └─ hot entries promoted to fast
//!
//! set:  value <= threshold ─▶ fast tier (plain JSON envelope)
//!       value >  threshold ─▶ slow tier (LZ4 frame)
//! ```
//!
//! Every public operation is best-effort. Boolean operations log failures and
//! degrade to a miss; the `try_*` variants surface the cause.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, trace, warn};

use super::codec::ColdTierCodec;
use super::entry::{CacheEntry, CacheTier};
use super::key::{CacheGroup, CacheKey, RequestDescriptor};
use super::metrics::{CacheCounters, CacheStats};
use super::registry::GroupKeyRegistry;
use crate::adapters::{InMemoryStore, LoggingEventPublisher, SystemClock};
use crate::config::{CacheSystemConfig, GroupTtlConfig};
use crate::domain::events::CacheEvent;
use crate::domain::ports::{BackingStore, Clock, EventPublisher, StoreUsage};
use crate::error::{Error, Result};
use crate::usage::UsageClassifier;

/// Usage metrics idle for this many half-lives are dropped by `compact`
const IDLE_HALF_LIVES: u32 = 4;

// =============================================================================
// Maintenance Reports
// =============================================================================

/// Size and recency of one fast-tier entry, as seen by eviction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFootprint {
    pub key: CacheKey,
    pub group: CacheGroup,
    pub size_bytes: u64,
    pub last_access: chrono::DateTime<chrono::Utc>,
    pub hot: bool,
}

/// Result of a fast → slow migration pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped_hot: usize,
    /// Entries found already expired and dropped
    pub expired: usize,
    pub failed: usize,
}

/// Result of an eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    pub evicted: usize,
    pub hot_evicted: usize,
    pub freed_bytes: u64,
    pub failed: usize,
}

/// Result of an in-process compaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    pub local_dropped: usize,
    pub metrics_pruned: usize,
}

/// A successful lookup before deserialization
#[derive(Debug, Clone)]
struct Found {
    tier: CacheTier,
    value: Value,
}

// =============================================================================
// Store
// =============================================================================

/// Grouped cache with hot/cold tiering
pub struct KeyedCacheStore {
    namespace: String,
    large_value_threshold: usize,
    group_ttls: GroupTtlConfig,
    local_max_entries: usize,

    fast: Arc<dyn BackingStore>,
    slow: Arc<dyn BackingStore>,
    registry: GroupKeyRegistry,
    /// Request-scoped layer of recently read entries
    local: DashMap<String, CacheEntry>,

    classifier: Arc<UsageClassifier>,
    clock: Arc<dyn Clock>,
    codec: ColdTierCodec,
    counters: CacheCounters,
    publisher: Arc<dyn EventPublisher>,
}

impl KeyedCacheStore {
    /// Create a store over the given tiers.
    ///
    /// Rejects invalid configuration with [`Error::Config`].
    pub fn new(
        config: &CacheSystemConfig,
        fast: Arc<dyn BackingStore>,
        slow: Arc<dyn BackingStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let classifier = Arc::new(UsageClassifier::new(&config.usage, clock.clone()));
        Ok(Self {
            namespace: config.namespace.clone(),
            large_value_threshold: config.large_value_threshold,
            group_ttls: config.group_ttls.clone(),
            local_max_entries: config.local_max_entries,
            registry: GroupKeyRegistry::new(fast.clone(), config.namespace.clone()),
            fast,
            slow,
            local: DashMap::new(),
            classifier,
            clock,
            codec: ColdTierCodec::default(),
            counters: CacheCounters::new(),
            publisher: Arc::new(LoggingEventPublisher::new()),
        })
    }

    /// Store backed by two in-memory tiers on the system clock
    pub fn in_memory(config: &CacheSystemConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new(
            config,
            Arc::new(InMemoryStore::with_clock("fast", clock.clone())),
            Arc::new(InMemoryStore::with_clock("slow", clock.clone())),
            clock,
        )
    }

    /// Route cache events to `publisher`
    pub fn with_event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Compress slow-tier frames with `codec`
    pub fn with_codec(mut self, codec: ColdTierCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn classifier(&self) -> &Arc<UsageClassifier> {
        &self.classifier
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn publisher(&self) -> &Arc<dyn EventPublisher> {
        &self.publisher
    }

    /// Derive the key `descriptor` maps to within `group`
    pub fn cache_key(&self, descriptor: &RequestDescriptor, group: CacheGroup) -> CacheKey {
        CacheKey::derive(group, descriptor)
    }

    fn entry_prefix(&self) -> String {
        format!("{}:entry:", self.namespace)
    }

    fn entry_key(&self, key: &CacheKey) -> String {
        format!("{}:entry:{}", self.namespace, key)
    }

    fn legacy_prefix(&self) -> String {
        format!("{}_", self.namespace)
    }

    fn legacy_key(&self, key: &CacheKey) -> String {
        format!("{}_{}", self.namespace, key)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Cache `value` for `descriptor`; returns false if nothing was written
    pub fn set<T: Serialize + ?Sized>(
        &self,
        descriptor: &RequestDescriptor,
        group: CacheGroup,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let key = self.cache_key(descriptor, group);
        match self.try_set_by_key(&key, group, value, ttl) {
            Ok(_) => true,
            Err(e) => {
                self.counters.record_write_failure();
                warn!(key = %key, group = %group, error = %e, "Cache write failed");
                self.emit(CacheEvent::EntryWriteFailed {
                    key: key.to_string(),
                    group: group.to_string(),
                    reason: e.to_string(),
                    timestamp: self.clock.now(),
                });
                false
            }
        }
    }

    /// Cache `value` for `descriptor`, reporting the tier written
    pub fn try_set<T: Serialize + ?Sized>(
        &self,
        descriptor: &RequestDescriptor,
        group: CacheGroup,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<CacheTier> {
        let key = self.cache_key(descriptor, group);
        self.try_set_by_key(&key, group, value, ttl)
    }

    /// Cache `value` under a precomputed key
    pub fn try_set_by_key<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        group: CacheGroup,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<CacheTier> {
        let value = serde_json::to_value(value)?;
        let value_size = serde_json::to_vec(&value)?.len();
        let ttl = ttl.unwrap_or_else(|| self.group_ttls.ttl_for(group));

        let entry = CacheEntry::new(key.clone(), group, value, self.clock.now(), ttl);
        let payload = entry.to_bytes()?;
        let storage_key = self.entry_key(key);

        let tier = if value_size > self.large_value_threshold {
            let (frame, algorithm) = self.codec.encode(&payload);
            self.slow.set(&storage_key, frame, Some(ttl))?;
            debug!(key = %key, size = value_size, codec = %algorithm, "Large value written to slow tier");
            self.discard(&self.fast, &storage_key);
            CacheTier::Slow
        } else {
            self.fast.set(&storage_key, payload, Some(ttl))?;
            self.discard(&self.slow, &storage_key);
            CacheTier::Fast
        };

        self.local.remove(key.as_str());
        self.counters.record_write();

        if let Err(e) = self.registry.register(group, key.as_str()) {
            warn!(key = %key, group = %group, error = %e, "Group registry update failed");
        }

        trace!(key = %key, group = %group, tier = %tier, "Cached value");
        Ok(tier)
    }

    /// Delete a copy that must not shadow the one just written
    fn discard(&self, store: &Arc<dyn BackingStore>, storage_key: &str) {
        if let Err(e) = store.delete(storage_key) {
            warn!(key = %storage_key, error = %e, "Failed to drop stale copy from other tier");
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Cached value for `descriptor`, `None` on miss
    pub fn get<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        group: CacheGroup,
    ) -> Option<T> {
        self.get_by_key(&self.cache_key(descriptor, group))
    }

    /// Cached value for a precomputed key, `None` on miss
    pub fn get_by_key<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.try_get_by_key(key).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Cache read failed, treating as miss");
            None
        })
    }

    pub fn try_get<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        group: CacheGroup,
    ) -> Result<Option<T>> {
        self.try_get_by_key(&self.cache_key(descriptor, group))
    }

    /// Look up `key` through every tier, counting the hit or miss
    pub fn try_get_by_key<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        let found = match self.lookup(key) {
            Ok(Some(found)) => found,
            Ok(None) => {
                self.counters.record_miss();
                return Ok(None);
            }
            Err(e) => {
                self.counters.record_miss();
                return Err(e);
            }
        };

        match serde_json::from_value(found.value) {
            Ok(value) => {
                self.counters.record_hit(found.tier);
                self.classifier.record_access(key.as_str());
                trace!(key = %key, tier = %found.tier, "Cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                self.counters.record_miss();
                Err(Error::CorruptEntry {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn lookup(&self, key: &CacheKey) -> Result<Option<Found>> {
        let now = self.clock.now();

        let local = self.local.get(key.as_str()).map(|e| e.value().clone());
        if let Some(entry) = local {
            if !entry.is_expired(now) {
                return Ok(Some(Found {
                    tier: CacheTier::Local,
                    value: entry.value,
                }));
            }
            self.local.remove(key.as_str());
        }

        let storage_key = self.entry_key(key);

        if let Some(bytes) = self.fast.get(&storage_key)? {
            match CacheEntry::from_bytes(&storage_key, &bytes) {
                Ok(entry) if !entry.is_expired(now) => {
                    let value = entry.value.clone();
                    self.remember_local(entry);
                    return Ok(Some(Found {
                        tier: CacheTier::Fast,
                        value,
                    }));
                }
                Ok(_) => {
                    trace!(key = %key, "Expired entry in fast tier, deleting");
                    self.discard(&self.fast, &storage_key);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Dropping corrupt fast-tier entry");
                    self.discard(&self.fast, &storage_key);
                }
            }
        }

        if let Some(frame) = self.slow.get(&storage_key)? {
            match self
                .codec
                .decode(&frame)
                .and_then(|payload| CacheEntry::from_bytes(&storage_key, &payload))
            {
                Ok(entry) if !entry.is_expired(now) => {
                    let value = entry.value.clone();
                    if self.classifier.is_hot(key.as_str()) {
                        self.promote(&storage_key, &entry);
                    }
                    self.remember_local(entry);
                    return Ok(Some(Found {
                        tier: CacheTier::Slow,
                        value,
                    }));
                }
                Ok(_) => {
                    trace!(key = %key, "Expired entry in slow tier, deleting");
                    self.discard(&self.slow, &storage_key);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Dropping corrupt slow-tier entry");
                    self.discard(&self.slow, &storage_key);
                }
            }
        }

        let legacy_key = self.legacy_key(key);
        if let Some(raw) = self.fast.get(&legacy_key)? {
            match serde_json::from_slice::<Value>(&raw) {
                Ok(value) => {
                    return Ok(Some(Found {
                        tier: CacheTier::Legacy,
                        value,
                    }))
                }
                Err(e) => debug!(key = %key, error = %e, "Unreadable legacy value ignored"),
            }
        }

        Ok(None)
    }

    /// Move a hot slow-tier entry back to the fast tier if it fits there
    fn promote(&self, storage_key: &str, entry: &CacheEntry) {
        if entry.value_size() > self.large_value_threshold {
            return;
        }
        let Some(ttl) = entry.remaining_ttl(self.clock.now()) else {
            return;
        };

        let promoted = entry
            .to_bytes()
            .and_then(|payload| self.fast.set(storage_key, payload, Some(ttl)));
        match promoted {
            Ok(()) => {
                self.discard(&self.slow, storage_key);
                self.counters.record_promotion();
                debug!(key = %entry.key, "Promoted hot entry to fast tier");
            }
            Err(e) => debug!(key = %entry.key, error = %e, "Promotion failed, entry stays cold"),
        }
    }

    fn remember_local(&self, entry: CacheEntry) {
        if self.local_max_entries == 0 {
            return;
        }
        if self.local.len() >= self.local_max_entries && !self.local.contains_key(entry.key.as_str())
        {
            let oldest = self
                .local
                .iter()
                .min_by_key(|e| e.value().created_at)
                .map(|e| e.key().clone());
            if let Some(oldest) = oldest {
                self.local.remove(&oldest);
            }
        }
        self.local.insert(entry.key.to_string(), entry);
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Remove the entry for `descriptor` from every tier
    pub fn delete(&self, descriptor: &RequestDescriptor, group: CacheGroup) -> bool {
        let key = self.cache_key(descriptor, group);
        self.try_delete(&key, group).unwrap_or_else(|e| {
            warn!(key = %key, group = %group, error = %e, "Cache delete failed");
            false
        })
    }

    /// Remove `key` from every tier; returns whether any copy existed
    pub fn try_delete(&self, key: &CacheKey, group: CacheGroup) -> Result<bool> {
        let removed = self.remove_everywhere(key)?;
        if let Err(e) = self.registry.unregister(group, key.as_str()) {
            warn!(key = %key, group = %group, error = %e, "Group registry update failed");
        }
        self.classifier.forget(key.as_str());
        Ok(removed)
    }

    fn remove_everywhere(&self, key: &CacheKey) -> Result<bool> {
        let storage_key = self.entry_key(key);
        let local = self.local.remove(key.as_str()).is_some();
        let fast = self.fast.delete(&storage_key)?;
        let slow = self.slow.delete(&storage_key)?;
        let legacy = self.fast.delete(&self.legacy_key(key))?;
        Ok(local || fast || slow || legacy)
    }

    /// Delete every registered key of `group`; returns the registered count
    pub fn flush_group(&self, group: CacheGroup) -> usize {
        self.try_flush_group(group).unwrap_or_else(|e| {
            warn!(group = %group, error = %e, "Group flush failed");
            0
        })
    }

    #[instrument(skip(self), fields(group = %group))]
    pub fn try_flush_group(&self, group: CacheGroup) -> Result<usize> {
        let keys = self.registry.load(group)?;

        for raw in &keys {
            let Ok(key) = CacheKey::parse(raw) else {
                debug!(key = %raw, "Skipping malformed registry key");
                continue;
            };
            if let Err(e) = self.remove_everywhere(&key) {
                warn!(key = %key, error = %e, "Failed to delete entry during group flush");
            }
            self.classifier.forget(key.as_str());
        }
        self.registry.clear(group)?;

        let deleted = keys.len();
        info!(group = %group, deleted, "Flushed cache group");
        self.emit(CacheEvent::GroupFlushed {
            group: group.to_string(),
            deleted,
            timestamp: self.clock.now(),
        });
        Ok(deleted)
    }

    /// Delete everything under this store's namespace; returns entries deleted
    pub fn flush_all(&self) -> usize {
        self.try_flush_all().unwrap_or_else(|e| {
            warn!(error = %e, "Full cache flush failed");
            0
        })
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub fn try_flush_all(&self) -> Result<usize> {
        let entry_prefix = self.entry_prefix();
        let mut deleted = 0;

        for store in [&self.fast, &self.slow] {
            for storage_key in store.list_keys(&entry_prefix)? {
                if store.delete(&storage_key)? {
                    deleted += 1;
                }
            }
        }

        let legacy_prefix = self.legacy_prefix();
        for storage_key in self.fast.list_keys(&legacy_prefix)? {
            let is_legacy_entry = storage_key
                .strip_prefix(&legacy_prefix)
                .is_some_and(|suffix| CacheKey::parse(suffix).is_ok());
            if is_legacy_entry && self.fast.delete(&storage_key)? {
                deleted += 1;
            }
        }

        for storage_key in self.fast.list_keys(&self.registry.storage_prefix())? {
            self.fast.delete(&storage_key)?;
        }

        self.local.clear();
        self.classifier.clear();

        info!(deleted, "Flushed all cache entries");
        self.emit(CacheEvent::CacheFlushed {
            deleted,
            timestamp: self.clock.now(),
        });
        Ok(deleted)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Counters plus a scan of both tiers
    pub fn get_stats(&self) -> CacheStats {
        self.try_get_stats().unwrap_or_else(|e| {
            warn!(error = %e, "Cache scan failed, reporting counters only");
            let mut stats = self.counters.snapshot();
            stats.local_entries = self.local.len() as u64;
            stats
        })
    }

    pub fn try_get_stats(&self) -> Result<CacheStats> {
        let now = self.clock.now();
        let prefix = self.entry_prefix();

        let mut stats = self.counters.snapshot();
        let mut per_group: BTreeMap<CacheGroup, u64> =
            CacheGroup::ALL.into_iter().map(|g| (g, 0)).collect();

        for (tier, store) in [(CacheTier::Fast, &self.fast), (CacheTier::Slow, &self.slow)] {
            for storage_key in store.list_keys(&prefix)? {
                let Some(raw) = store.get(&storage_key)? else {
                    continue;
                };
                let Ok(entry) = self.decode(tier, &storage_key, &raw) else {
                    continue;
                };
                if entry.is_expired(now) {
                    continue;
                }

                stats.total_entries += 1;
                stats.size_bytes += raw.len() as u64;
                *per_group.entry(entry.group).or_default() += 1;
                match tier {
                    CacheTier::Slow => stats.slow_entries += 1,
                    _ => stats.fast_entries += 1,
                }
            }
        }

        stats.per_group_counts = per_group;
        stats.local_entries = self.local.len() as u64;
        Ok(stats)
    }

    /// Zero the hit/miss and movement counters
    pub fn reset_counters(&self) {
        self.counters.reset();
    }

    fn decode(&self, tier: CacheTier, storage_key: &str, raw: &[u8]) -> Result<CacheEntry> {
        match tier {
            CacheTier::Slow => {
                let payload = self.codec.decode(raw)?;
                CacheEntry::from_bytes(storage_key, &payload)
            }
            _ => CacheEntry::from_bytes(storage_key, raw),
        }
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Size of the fast tier
    pub fn fast_usage(&self) -> StoreUsage {
        self.fast.usage()
    }

    /// Size of the slow tier
    pub fn slow_usage(&self) -> StoreUsage {
        self.slow.usage()
    }

    /// Drop the request-scoped layer; returns entries dropped
    pub fn flush_local(&self) -> usize {
        let dropped = self.local.len();
        self.local.clear();
        self.local.shrink_to_fit();
        debug!(dropped, "Flushed request-scoped cache layer");
        dropped
    }

    /// Release in-process memory: expired local entries and idle usage metrics
    pub fn compact(&self) -> CompactionReport {
        let now = self.clock.now();
        let before = self.local.len();
        self.local.retain(|_, entry| !entry.is_expired(now));
        self.local.shrink_to_fit();

        let max_idle = self.classifier.half_life() * IDLE_HALF_LIVES;
        let report = CompactionReport {
            local_dropped: before.saturating_sub(self.local.len()),
            metrics_pruned: self.classifier.prune_idle(max_idle),
        };
        debug!(
            local_dropped = report.local_dropped,
            metrics_pruned = report.metrics_pruned,
            "Compacted in-process cache state"
        );
        report
    }

    /// Move up to `cap` cold fast-tier entries to the slow tier.
    ///
    /// Least recently used entries go first; hot entries are never moved.
    /// Per-entry failures are counted and the pass continues.
    #[instrument(skip(self))]
    pub fn migrate_cold(&self, cap: usize) -> Result<MigrationReport> {
        let now = self.clock.now();
        let mut report = MigrationReport::default();

        let mut candidates = Vec::new();
        for storage_key in self.fast.list_keys(&self.entry_prefix())? {
            let Some(raw) = self.fast.get(&storage_key)? else {
                continue;
            };
            let entry = match CacheEntry::from_bytes(&storage_key, &raw) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(key = %storage_key, error = %e, "Dropping corrupt fast-tier entry");
                    self.discard(&self.fast, &storage_key);
                    continue;
                }
            };
            if entry.is_expired(now) {
                self.discard(&self.fast, &storage_key);
                report.expired += 1;
                continue;
            }
            if self.classifier.is_hot(entry.key.as_str()) {
                report.skipped_hot += 1;
                continue;
            }
            let last_access = self
                .classifier
                .last_access(entry.key.as_str())
                .unwrap_or(entry.created_at);
            candidates.push((last_access, storage_key, raw, entry));
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, storage_key, raw, entry) in candidates.into_iter().take(cap) {
            let Some(ttl) = entry.remaining_ttl(now) else {
                continue;
            };
            let (frame, _) = self.codec.encode(&raw);
            let moved = self
                .slow
                .set(&storage_key, frame, Some(ttl))
                .and_then(|()| self.fast.delete(&storage_key));
            match moved {
                Ok(_) => {
                    self.local.remove(entry.key.as_str());
                    report.migrated += 1;
                }
                Err(e) => {
                    debug!(key = %entry.key, error = %e, "Migration of entry failed");
                    report.failed += 1;
                }
            }
        }

        self.counters.record_migrated(report.migrated as u64);
        if report.migrated > 0 || report.skipped_hot > 0 {
            info!(
                migrated = report.migrated,
                skipped_hot = report.skipped_hot,
                failed = report.failed,
                "Migrated cold entries to slow tier"
            );
            self.emit(CacheEvent::EntriesMigrated {
                migrated: report.migrated,
                skipped_hot: report.skipped_hot,
                timestamp: now,
            });
        }
        Ok(report)
    }

    /// Footprint of every live fast-tier entry
    pub fn eviction_candidates(&self) -> Result<Vec<EntryFootprint>> {
        let now = self.clock.now();
        let mut out = Vec::new();

        for storage_key in self.fast.list_keys(&self.entry_prefix())? {
            let Some(raw) = self.fast.get(&storage_key)? else {
                continue;
            };
            let Ok(entry) = CacheEntry::from_bytes(&storage_key, &raw) else {
                continue;
            };
            if entry.is_expired(now) {
                continue;
            }
            out.push(EntryFootprint {
                last_access: self
                    .classifier
                    .last_access(entry.key.as_str())
                    .unwrap_or(entry.created_at),
                hot: self.classifier.is_hot(entry.key.as_str()),
                size_bytes: raw.len() as u64,
                group: entry.group,
                key: entry.key,
            });
        }
        Ok(out)
    }

    /// Delete `victims` from the fast tier
    pub fn evict(&self, victims: &[EntryFootprint]) -> EvictionReport {
        let mut report = EvictionReport::default();

        for victim in victims {
            match self.fast.delete(&self.entry_key(&victim.key)) {
                Ok(removed) => {
                    self.local.remove(victim.key.as_str());
                    if let Err(e) = self.registry.unregister(victim.group, victim.key.as_str()) {
                        debug!(key = %victim.key, error = %e, "Group registry update failed");
                    }
                    if removed {
                        report.evicted += 1;
                        report.freed_bytes += victim.size_bytes;
                        if victim.hot {
                            report.hot_evicted += 1;
                        }
                    }
                }
                Err(e) => {
                    debug!(key = %victim.key, error = %e, "Eviction of entry failed");
                    report.failed += 1;
                }
            }
        }

        self.counters.record_evicted(report.evicted as u64);
        if report.evicted > 0 {
            info!(
                evicted = report.evicted,
                hot_evicted = report.hot_evicted,
                freed_bytes = report.freed_bytes,
                "Evicted least recently used entries"
            );
            self.emit(CacheEvent::EntriesEvicted {
                evicted: report.evicted,
                hot_evicted: report.hot_evicted,
                freed_bytes: report.freed_bytes,
                timestamp: self.clock.now(),
            });
        }
        report
    }

    /// Delete expired and undecodable entries from both tiers.
    ///
    /// Values whose store TTL elapsed are reclaimed through the store first;
    /// the scan then catches envelopes that expired ahead of their store TTL.
    #[instrument(skip(self))]
    pub fn sweep_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let prefix = self.entry_prefix();
        let mut removed = 0;

        for (tier, store) in [(CacheTier::Slow, &self.slow), (CacheTier::Fast, &self.fast)] {
            removed += store.purge_expired(&prefix)?;
            for storage_key in store.list_keys(&prefix)? {
                let Some(raw) = store.get(&storage_key)? else {
                    continue;
                };
                let stale = match self.decode(tier, &storage_key, &raw) {
                    Ok(entry) => entry.is_expired(now),
                    Err(_) => true,
                };
                if stale && store.delete(&storage_key)? {
                    removed += 1;
                }
            }
        }
        self.local.retain(|_, entry| !entry.is_expired(now));

        self.counters.record_swept(removed as u64);
        if removed > 0 {
            info!(removed, "Swept expired cache entries");
            self.emit(CacheEvent::ExpiredSwept {
                removed,
                timestamp: now,
            });
        }
        Ok(removed)
    }

    fn emit(&self, event: CacheEvent) {
        if let Err(e) = self.publisher.publish(event) {
            debug!(error = %e, "Failed to publish cache event");
        }
    }
}

impl std::fmt::Debug for KeyedCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCacheStore")
            .field("namespace", &self.namespace)
            .field("large_value_threshold", &self.large_value_threshold)
            .field("local_entries", &self.local.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
