//! Memory Probe Adapters
//!
//! Sources of "current memory usage percent" for the adaptive scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::domain::ports::{BackingStore, MemoryProbe};

/// Page size assumed when reading `/proc/self/statm`
const PAGE_SIZE: u64 = 4096;

fn to_percent(used: u64, budget: u64) -> f64 {
    if budget == 0 {
        return 0.0;
    }
    (used as f64 / budget as f64 * 100.0).clamp(0.0, 100.0)
}

/// Probe returning a value set by the caller
#[derive(Debug, Default)]
pub struct StaticMemoryProbe {
    bits: AtomicU64,
}

impl StaticMemoryProbe {
    pub fn new(percent: f64) -> Self {
        let probe = Self::default();
        probe.set(percent);
        probe
    }

    /// Replace the reported usage
    pub fn set(&self, percent: f64) {
        self.bits
            .store(percent.clamp(0.0, 100.0).to_bits(), Ordering::Relaxed);
    }
}

impl MemoryProbe for StaticMemoryProbe {
    fn usage_percent(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Usage of a backing store relative to a byte budget
pub struct StoreUsageProbe {
    store: Arc<dyn BackingStore>,
    budget_bytes: u64,
}

impl StoreUsageProbe {
    pub fn new(store: Arc<dyn BackingStore>, budget_bytes: u64) -> Self {
        Self {
            store,
            budget_bytes,
        }
    }
}

impl MemoryProbe for StoreUsageProbe {
    fn usage_percent(&self) -> f64 {
        to_percent(self.store.usage().bytes, self.budget_bytes)
    }
}

impl std::fmt::Debug for StoreUsageProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreUsageProbe")
            .field("budget_bytes", &self.budget_bytes)
            .finish()
    }
}

/// Resident set size of this process relative to a byte budget.
///
/// Reads `/proc/self/statm`; reports 0% where that is unavailable.
#[derive(Debug, Clone)]
pub struct ProcessMemoryProbe {
    budget_bytes: u64,
}

impl ProcessMemoryProbe {
    pub fn new(budget_bytes: u64) -> Self {
        Self { budget_bytes }
    }

    fn resident_bytes() -> Option<u64> {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(pages * PAGE_SIZE)
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn usage_percent(&self) -> f64 {
        match Self::resident_bytes() {
            Some(rss) => to_percent(rss, self.budget_bytes),
            None => {
                debug!("Resident memory unavailable, reporting 0%");
                0.0
            }
        }
    }
}
