//! Prometheus Exporter
//!
//! Publishes cache, record and maintenance statistics on a dedicated
//! registry. Statistics are observed as snapshots, so monotonic totals are
//! advanced by the delta since the previous snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use prometheus::{
    Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::cache::{CacheGroup, CacheStats};
use crate::error::{Error, Result};
use crate::maintenance::PassReport;
use crate::records::{RecordCacheStats, RecordState};

/// Snapshot-fed counter
struct SnapshotCounter {
    counter: IntCounter,
    last: AtomicU64,
}

impl SnapshotCounter {
    fn new(name: &str, help: &str) -> Result<Self> {
        Ok(Self {
            counter: IntCounter::new(name, help)?,
            last: AtomicU64::new(0),
        })
    }

    /// Advance to `observed`; a value below the previous one means the
    /// source was reset
    fn observe(&self, observed: u64) {
        let last = self.last.swap(observed, Ordering::Relaxed);
        let delta = if observed >= last { observed - last } else { observed };
        self.counter.inc_by(delta);
    }
}

/// Prometheus metrics for the cache subsystem
pub struct CacheMetricsExporter {
    registry: Registry,
    hits: SnapshotCounter,
    misses: SnapshotCounter,
    entries: IntGauge,
    size_bytes: IntGauge,
    group_entries: IntGaugeVec,
    records: IntGaugeVec,
    passes: IntCounterVec,
    action_failures: IntCounterVec,
    memory_usage: Gauge,
}

impl CacheMetricsExporter {
    pub fn new() -> Result<Self> {
        let exporter = Self {
            registry: Registry::new(),
            hits: SnapshotCounter::new("erp_cache_hits_total", "Keyed cache hits")?,
            misses: SnapshotCounter::new("erp_cache_misses_total", "Keyed cache misses")?,
            entries: IntGauge::new("erp_cache_entries", "Live keyed cache entries")?,
            size_bytes: IntGauge::new("erp_cache_size_bytes", "Stored bytes of live entries")?,
            group_entries: IntGaugeVec::new(
                Opts::new("erp_cache_group_entries", "Live entries per cache group"),
                &["group"],
            )?,
            records: IntGaugeVec::new(
                Opts::new("erp_cache_records", "Price records per lifecycle state"),
                &["state"],
            )?,
            passes: IntCounterVec::new(
                Opts::new(
                    "erp_cache_maintenance_passes_total",
                    "Maintenance passes per cleanup level",
                ),
                &["level"],
            )?,
            action_failures: IntCounterVec::new(
                Opts::new(
                    "erp_cache_maintenance_action_failures_total",
                    "Failed maintenance actions",
                ),
                &["action"],
            )?,
            memory_usage: Gauge::new(
                "erp_cache_memory_usage_percent",
                "Memory usage reported by the probe",
            )?,
        };

        let r = &exporter.registry;
        r.register(Box::new(exporter.hits.counter.clone()))?;
        r.register(Box::new(exporter.misses.counter.clone()))?;
        r.register(Box::new(exporter.entries.clone()))?;
        r.register(Box::new(exporter.size_bytes.clone()))?;
        r.register(Box::new(exporter.group_entries.clone()))?;
        r.register(Box::new(exporter.records.clone()))?;
        r.register(Box::new(exporter.passes.clone()))?;
        r.register(Box::new(exporter.action_failures.clone()))?;
        r.register(Box::new(exporter.memory_usage.clone()))?;

        Ok(exporter)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn observe_cache(&self, stats: &CacheStats) {
        self.hits.observe(stats.hits);
        self.misses.observe(stats.misses);
        self.entries.set(stats.total_entries as i64);
        self.size_bytes.set(stats.size_bytes as i64);
        for group in CacheGroup::ALL {
            let count = stats.per_group_counts.get(&group).copied().unwrap_or(0);
            self.group_entries
                .with_label_values(&[group.as_str()])
                .set(count as i64);
        }
    }

    pub fn observe_records(&self, stats: &RecordCacheStats) {
        for state in RecordState::ALL {
            let count = match state {
                RecordState::Active => stats.active,
                RecordState::Expired => stats.expired,
                RecordState::Invalidated => stats.invalidated,
            };
            self.records
                .with_label_values(&[state.as_str()])
                .set(count as i64);
        }
    }

    pub fn observe_pass(&self, report: &PassReport) {
        self.passes
            .with_label_values(&[report.level.as_str()])
            .inc();
        for outcome in report.actions.iter().filter(|a| !a.succeeded()) {
            self.action_failures
                .with_label_values(&[outcome.action.as_str()])
                .inc();
        }
        self.memory_usage.set(report.memory_usage_percent);
    }

    pub fn observe_memory(&self, percent: f64) {
        self.memory_usage.set(percent);
    }

    /// Render every metric in the text exposition format
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics output: {}", e)))
    }
}

impl std::fmt::Debug for CacheMetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheMetricsExporter").finish_non_exhaustive()
    }
}
