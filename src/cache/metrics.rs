//! Cache Counters
//!
//! Instance-owned counters behind [`CacheStats`]. They are diagnostics only:
//! process-local, reset per run, never consulted for correctness.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::entry::CacheTier;
use super::key::CacheGroup;

/// Hit, miss and tier movement counters for a keyed cache
#[derive(Debug, Default)]
pub struct CacheCounters {
    local_hits: AtomicU64,
    fast_hits: AtomicU64,
    slow_hits: AtomicU64,
    legacy_hits: AtomicU64,
    misses: AtomicU64,

    writes: AtomicU64,
    write_failures: AtomicU64,

    promoted: AtomicU64,
    migrated: AtomicU64,
    evicted: AtomicU64,
    swept: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self, tier: CacheTier) {
        let counter = match tier {
            CacheTier::Local => &self.local_hits,
            CacheTier::Fast => &self.fast_hits,
            CacheTier::Slow => &self.slow_hits,
            CacheTier::Legacy => &self.legacy_hits,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_promotion(&self) {
        self.promoted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_migrated(&self, count: u64) {
        self.migrated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: u64) {
        self.evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: u64) {
        self.swept.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.local_hits.load(Ordering::Relaxed)
            + self.fast_hits.load(Ordering::Relaxed)
            + self.slow_hits.load(Ordering::Relaxed)
            + self.legacy_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// `hits / (hits + misses)`, zero before any lookup
    pub fn hit_ratio(&self) -> f64 {
        hit_ratio(self.hits(), self.misses())
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.local_hits,
            &self.fast_hits,
            &self.slow_hits,
            &self.legacy_hits,
            &self.misses,
            &self.writes,
            &self.write_failures,
            &self.promoted,
            &self.migrated,
            &self.evicted,
            &self.swept,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Copy the counters into a fresh [`CacheStats`] (storage fields empty)
    pub fn snapshot(&self) -> CacheStats {
        let tier_hits = TierHits {
            local: self.local_hits.load(Ordering::Relaxed),
            fast: self.fast_hits.load(Ordering::Relaxed),
            slow: self.slow_hits.load(Ordering::Relaxed),
            legacy: self.legacy_hits.load(Ordering::Relaxed),
        };
        let hits = tier_hits.total();
        let misses = self.misses();

        CacheStats {
            hits,
            misses,
            hit_ratio: hit_ratio(hits, misses),
            tier_hits,
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            promoted: self.promoted.load(Ordering::Relaxed),
            migrated: self.migrated.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
            ..CacheStats::default()
        }
    }
}

fn hit_ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Hits broken down by the tier that answered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierHits {
    pub local: u64,
    pub fast: u64,
    pub slow: u64,
    pub legacy: u64,
}

impl TierHits {
    pub fn total(&self) -> u64 {
        self.local + self.fast + self.slow + self.legacy
    }
}

/// Read-only statistics for a keyed cache
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
    pub tier_hits: TierHits,

    /// Live entries across the fast and slow tiers
    pub total_entries: u64,
    /// Stored bytes of those entries
    pub size_bytes: u64,
    pub per_group_counts: BTreeMap<CacheGroup, u64>,
    pub fast_entries: u64,
    pub slow_entries: u64,
    pub local_entries: u64,

    pub writes: u64,
    pub write_failures: u64,
    pub promoted: u64,
    pub migrated: u64,
    pub evicted: u64,
    pub swept: u64,
}
