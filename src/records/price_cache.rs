//! Persistent Price Record Cache
//!
//! Schema-shaped cache keyed by SKU, stored one row per key at
//! `{namespace}:price:{sku}` without a backing-store TTL. Expiry is evaluated
//! by the cache itself so that expired rows remain readable for audit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, trace, warn};

use super::record::{InvalidationReason, PriceCacheRecord, RecordState, WriteOutcome};
use crate::adapters::LoggingEventPublisher;
use crate::config::CacheSystemConfig;
use crate::domain::events::CacheEvent;
use crate::domain::ports::{BackingStore, Clock, EventPublisher};
use crate::error::{Error, Result};

/// Read-only statistics over every stored row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordCacheStats {
    pub total: u64,
    pub active: u64,
    pub expired: u64,
    pub invalidated: u64,
    /// Earliest `updated_at`
    pub oldest: Option<DateTime<Utc>>,
    /// Latest `updated_at`
    pub newest: Option<DateTime<Utc>>,
    /// `active / total`. Measures how much of the table is currently valid,
    /// not how often reads were answered.
    pub estimated_hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)` for this process
    pub hit_ratio: f64,
}

/// Price/tariff cache with explicit lifecycle states
pub struct PriceRecordCache {
    store: Arc<dyn BackingStore>,
    namespace: String,
    default_ttl: Duration,
    retention_days: u32,
    max_price: f64,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PriceRecordCache {
    /// Create a record cache over `store`.
    ///
    /// Rejects invalid configuration with [`Error::Config`].
    pub fn new(
        config: &CacheSystemConfig,
        store: Arc<dyn BackingStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            namespace: config.namespace.clone(),
            default_ttl: config.records.default_ttl(),
            retention_days: config.records.retention_days,
            max_price: config.records.max_price,
            clock,
            publisher: Arc::new(LoggingEventPublisher::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Route record events to `publisher`
    pub fn with_event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Retention window used by scheduled cleanup
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    fn prefix(&self) -> String {
        format!("{}:price:", self.namespace)
    }

    fn row_key(&self, sku: &str) -> String {
        format!("{}:price:{}", self.namespace, sku)
    }

    fn validate_sku(sku: &str) -> Result<()> {
        if sku.trim().is_empty() || sku.chars().any(char::is_control) {
            return Err(Error::InvalidIdentifier(sku.to_string()));
        }
        Ok(())
    }

    fn validate_price(&self, sku: &str, price: Option<f64>) -> Result<()> {
        match price {
            Some(p) if !(p.is_finite() && (0.0..=self.max_price).contains(&p)) => {
                Err(Error::InvalidPrice {
                    sku: sku.to_string(),
                    price: p,
                    max: self.max_price,
                })
            }
            _ => Ok(()),
        }
    }

    fn load(&self, row_key: &str) -> Result<Option<PriceCacheRecord>> {
        let Some(raw) = self.store.get(row_key)? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| Error::CorruptEntry {
                key: row_key.to_string(),
                reason: e.to_string(),
            })
    }

    fn save(&self, record: &PriceCacheRecord) -> Result<()> {
        let raw = serde_json::to_vec(record)?;
        self.store
            .set(&self.row_key(&record.sku), Bytes::from(raw), None)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Active, unexpired record for `sku`
    pub fn get(&self, sku: &str) -> Option<PriceCacheRecord> {
        self.try_get(sku).unwrap_or_else(|e| {
            warn!(sku = %sku, error = %e, "Price record read failed, treating as miss");
            None
        })
    }

    /// Read `sku`; a row found past its TTL is marked expired and missed
    pub fn try_get(&self, sku: &str) -> Result<Option<PriceCacheRecord>> {
        let found = self.lookup(sku);
        match &found {
            Ok(Some(_)) => self.hits.fetch_add(1, Ordering::Relaxed),
            _ => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    fn lookup(&self, sku: &str) -> Result<Option<PriceCacheRecord>> {
        Self::validate_sku(sku)?;
        let row_key = self.row_key(sku);
        let Some(mut record) = self.load(&row_key)? else {
            return Ok(None);
        };

        if !record.is_active() {
            return Ok(None);
        }

        let now = self.clock.now();
        if record.is_stale(now) {
            record.transition(RecordState::Expired, now);
            self.save(&record)?;
            debug!(sku = %sku, "Price record expired on read");
            return Ok(None);
        }
        Ok(Some(record))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Upsert the price for `sku`; returns false if rejected or not written
    pub fn set(
        &self,
        sku: &str,
        price: Option<f64>,
        tariff_conditions: Option<Value>,
        ttl: Option<Duration>,
    ) -> bool {
        match self.upsert(sku, price, tariff_conditions, ttl) {
            Ok(_) => true,
            Err(e) => {
                warn!(sku = %sku, error = %e, "Price record write rejected");
                false
            }
        }
    }

    /// Upsert the price for `sku`, reporting how the row changed.
    ///
    /// Validation happens before any read or write.
    pub fn upsert(
        &self,
        sku: &str,
        price: Option<f64>,
        tariff_conditions: Option<Value>,
        ttl: Option<Duration>,
    ) -> Result<WriteOutcome> {
        Self::validate_sku(sku)?;
        self.validate_price(sku, price)?;

        let now = self.clock.now();
        let data_hash = PriceCacheRecord::compute_hash(price, tariff_conditions.as_ref());
        // An unreadable row is overwritten
        let existing = self.load(&self.row_key(sku)).unwrap_or_else(|e| {
            warn!(sku = %sku, error = %e, "Overwriting unreadable price record");
            None
        });

        let (outcome, state_changed_at) = match &existing {
            None => (WriteOutcome::Inserted, now),
            Some(old) if old.is_active() && old.data_hash == data_hash => {
                (WriteOutcome::Unchanged, old.state_changed_at)
            }
            Some(old) if old.is_active() => (WriteOutcome::Updated, old.state_changed_at),
            Some(_) => (WriteOutcome::Updated, now),
        };

        let record = PriceCacheRecord {
            sku: sku.to_string(),
            price,
            tariff_conditions,
            ttl_secs: ttl.unwrap_or(self.default_ttl).as_secs(),
            updated_at: now,
            state_changed_at,
            data_hash,
            state: RecordState::Active,
        };
        self.save(&record)?;

        trace!(sku = %sku, outcome = ?outcome, "Price record stored");
        Ok(outcome)
    }

    /// Take `sku` out of service without deleting the row
    pub fn invalidate(&self, sku: &str, reason: InvalidationReason) -> bool {
        self.try_invalidate(sku, reason).unwrap_or_else(|e| {
            warn!(sku = %sku, error = %e, "Price record invalidation failed");
            false
        })
    }

    /// Returns false when no row exists for `sku`
    pub fn try_invalidate(&self, sku: &str, reason: InvalidationReason) -> Result<bool> {
        Self::validate_sku(sku)?;
        let Some(mut record) = self.load(&self.row_key(sku))? else {
            return Ok(false);
        };

        record.transition(reason.into(), self.clock.now());
        self.save(&record)?;
        debug!(sku = %sku, state = %record.state, "Price record invalidated");
        Ok(true)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Delete non-active rows older than `retention_days`; returns rows removed
    pub fn cleanup(&self, retention_days: u32) -> usize {
        self.try_cleanup(retention_days).unwrap_or_else(|e| {
            warn!(error = %e, "Price record cleanup failed");
            0
        })
    }

    #[instrument(skip(self))]
    pub fn try_cleanup(&self, retention_days: u32) -> Result<usize> {
        let now = self.clock.now();
        let Some(cutoff) = chrono::Duration::try_days(i64::from(retention_days))
            .and_then(|window| now.checked_sub_signed(window))
        else {
            debug!(retention_days, "Retention window out of range, nothing to purge");
            return Ok(0);
        };
        let mut removed = 0;

        for row_key in self.store.list_keys(&self.prefix())? {
            let record = match self.load(&row_key) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %row_key, error = %e, "Skipping unreadable price record");
                    continue;
                }
            };
            if !record.is_active() && record.state_changed_at < cutoff && self.store.delete(&row_key)?
            {
                removed += 1;
            }
        }

        info!(removed, retention_days, "Purged retained price records");
        if removed > 0 {
            self.emit(CacheEvent::RecordsPurged {
                removed,
                retention_days,
                timestamp: now,
            });
        }
        Ok(removed)
    }

    /// Counts per state plus process hit counters
    pub fn get_stats(&self) -> RecordCacheStats {
        self.try_get_stats().unwrap_or_else(|e| {
            warn!(error = %e, "Price record scan failed, reporting counters only");
            self.counter_stats()
        })
    }

    pub fn try_get_stats(&self) -> Result<RecordCacheStats> {
        let mut stats = self.counter_stats();

        for row_key in self.store.list_keys(&self.prefix())? {
            let Ok(Some(record)) = self.load(&row_key) else {
                continue;
            };
            stats.total += 1;
            match record.state {
                RecordState::Active => stats.active += 1,
                RecordState::Expired => stats.expired += 1,
                RecordState::Invalidated => stats.invalidated += 1,
            }
            stats.oldest = Some(
                stats
                    .oldest
                    .map_or(record.updated_at, |t| t.min(record.updated_at)),
            );
            stats.newest = Some(
                stats
                    .newest
                    .map_or(record.updated_at, |t| t.max(record.updated_at)),
            );
        }

        stats.estimated_hit_rate = if stats.total == 0 {
            0.0
        } else {
            stats.active as f64 / stats.total as f64
        };
        Ok(stats)
    }

    fn counter_stats(&self) -> RecordCacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        RecordCacheStats {
            hits,
            misses,
            hit_ratio: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            ..RecordCacheStats::default()
        }
    }

    /// Zero the hit/miss counters
    pub fn reset_counters(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Delete every row. Destructive; maintenance and tests only.
    pub fn flush(&self) -> bool {
        match self.try_flush() {
            Ok(removed) => {
                info!(removed, "Flushed price record cache");
                true
            }
            Err(e) => {
                warn!(error = %e, "Price record flush failed");
                false
            }
        }
    }

    pub fn try_flush(&self) -> Result<usize> {
        let mut removed = 0;
        for row_key in self.store.list_keys(&self.prefix())? {
            if self.store.delete(&row_key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn emit(&self, event: CacheEvent) {
        if let Err(e) = self.publisher.publish(event) {
            debug!(error = %e, "Failed to publish record event");
        }
    }
}

impl std::fmt::Debug for PriceRecordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceRecordCache")
            .field("namespace", &self.namespace)
            .field("default_ttl", &self.default_ttl)
            .field("max_price", &self.max_price)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
