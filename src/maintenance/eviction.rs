//! Preventive LRU Eviction Planning
//!
//! Pure planning over entry footprints: decides which fast-tier entries to
//! drop without touching any store.
//!
//! - Nothing happens until `current > ratio * max`.
//! - Cold entries go first, least recently used first, until the size is back
//!   under `ratio * max` or the per-pass cap is reached.
//! - Hot entries are only touched when explicitly allowed and the size would
//!   otherwise stay above the hard ceiling `max`.

use crate::cache::EntryFootprint;
use crate::config::MaintenanceConfig;

/// Eviction thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionPolicy {
    /// Hard ceiling in bytes
    pub max_bytes: u64,
    /// Fraction of the ceiling that triggers eviction and is its target
    pub target_ratio: f64,
    /// Maximum victims per pass
    pub cap: usize,
}

impl EvictionPolicy {
    pub fn from_config(config: &MaintenanceConfig) -> Self {
        Self {
            max_bytes: config.max_cache_bytes,
            target_ratio: config.eviction_ratio,
            cap: config.eviction_cap,
        }
    }

    pub fn target_bytes(&self) -> u64 {
        (self.max_bytes as f64 * self.target_ratio) as u64
    }

    /// Whether `current_bytes` is over the trigger
    pub fn triggered(&self, current_bytes: u64) -> bool {
        current_bytes > self.target_bytes()
    }

    /// Choose victims from `candidates`
    pub fn plan(
        &self,
        current_bytes: u64,
        mut candidates: Vec<EntryFootprint>,
        allow_hot: bool,
    ) -> EvictionPlan {
        let mut plan = EvictionPlan {
            current_bytes,
            projected_bytes: current_bytes,
            ..EvictionPlan::default()
        };
        if !self.triggered(current_bytes) {
            return plan;
        }

        // Cold before hot, oldest access first within each class
        candidates.sort_by(|a, b| a.hot.cmp(&b.hot).then(a.last_access.cmp(&b.last_access)));
        let target = self.target_bytes();

        for candidate in candidates {
            let needed = if candidate.hot {
                allow_hot && plan.projected_bytes > self.max_bytes
            } else {
                plan.projected_bytes > target
            };
            if !needed {
                break;
            }
            if plan.victims.len() >= self.cap {
                plan.capped = true;
                break;
            }
            plan.projected_bytes = plan.projected_bytes.saturating_sub(candidate.size_bytes);
            plan.victims.push(candidate);
        }
        plan
    }
}

/// Victims chosen for one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvictionPlan {
    pub victims: Vec<EntryFootprint>,
    pub current_bytes: u64,
    /// Size expected once every victim is gone
    pub projected_bytes: u64,
    /// The per-pass cap stopped the plan early
    pub capped: bool,
}

impl EvictionPlan {
    pub fn is_empty(&self) -> bool {
        self.victims.is_empty()
    }

    pub fn hot_victims(&self) -> usize {
        self.victims.iter().filter(|v| v.hot).count()
    }
}
