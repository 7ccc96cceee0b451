//! Property-Based Tests for Cache Keys and Maintenance Decisions
//!
//! # Test Properties
//!
//! 1. **Key Determinism**: the same group and descriptor always derive the
//!    same key, whatever order the argument members were built in
//! 2. **Group Separation**: one descriptor maps to a distinct key per group
//! 3. **Monotonic Classification**: more accesses never lower a key's tier,
//!    and a key hot at one threshold is hot at every lower threshold
//! 4. **Interval Monotonicity**: higher memory usage never lengthens the
//!    maintenance interval
//! 5. **Coordination**: a processed unit triggers at most one pass

#![cfg(test)]

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use super::key::{CacheGroup, CacheKey, RequestDescriptor};
use crate::adapters::{InMemoryEventCollector, InMemoryStore, ManualClock, StaticMemoryProbe};
use crate::cache::KeyedCacheStore;
use crate::config::{CacheSystemConfig, UsageConfig};
use crate::maintenance::{
    interval_for, level_for, should_migrate, AdaptiveMaintenanceScheduler, UnitOutcome,
};
use crate::usage::{AccessFrequency, UsageClassifier};

// =============================================================================
// Property Strategies
// =============================================================================

fn group_strategy() -> impl Strategy<Value = CacheGroup> {
    prop::sample::select(CacheGroup::ALL.to_vec())
}

/// Distinct argument members with scalar values
fn members_strategy() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::btree_map("[a-z_]{1,8}", any::<i64>(), 1..8)
        .prop_map(|members| members.into_iter().collect())
}

fn endpoint_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z]{3,20}"
}

fn object_from(members: impl Iterator<Item = (String, i64)>) -> Value {
    let mut map = Map::new();
    for (name, value) in members {
        map.insert(name, json!(value));
    }
    Value::Object(map)
}

fn classifier(clock: Arc<ManualClock>) -> UsageClassifier {
    UsageClassifier::new(&UsageConfig::default(), clock)
}

// =============================================================================
// Key Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Member order never changes the derived key.
    #[test]
    fn prop_key_order_independent(
        group in group_strategy(),
        endpoint in endpoint_strategy(),
        members in members_strategy(),
    ) {
        let forward = object_from(members.clone().into_iter());
        let reversed = object_from(members.into_iter().rev());

        // Nest the same members one level down as well
        let a = RequestDescriptor::with_args(endpoint.clone(), json!({ "filter": forward.clone(), "page": 1 }));
        let b = RequestDescriptor::with_args(endpoint.clone(), json!({ "page": 1, "filter": reversed.clone() }));
        prop_assert_eq!(CacheKey::derive(group, &a), CacheKey::derive(group, &b));

        let flat_a = RequestDescriptor::with_args(endpoint.clone(), forward);
        let flat_b = RequestDescriptor::with_args(endpoint, reversed);
        prop_assert_eq!(CacheKey::derive(group, &flat_a), CacheKey::derive(group, &flat_b));
    }

    /// Property: Derivation is deterministic and the key round-trips through parse.
    #[test]
    fn prop_key_deterministic(
        group in group_strategy(),
        endpoint in endpoint_strategy(),
        members in members_strategy(),
    ) {
        let descriptor = RequestDescriptor::with_args(endpoint, object_from(members.into_iter()));
        let first = CacheKey::derive(group, &descriptor);
        let second = CacheKey::derive(group, &descriptor.clone());

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.as_str().len(), 64);
        prop_assert_eq!(CacheKey::parse(first.as_str())?, first);
    }

    /// Property: The same descriptor never collides across groups.
    #[test]
    fn prop_key_separates_groups(
        endpoint in endpoint_strategy(),
        members in members_strategy(),
    ) {
        let descriptor = RequestDescriptor::with_args(endpoint, object_from(members.into_iter()));
        let keys: std::collections::HashSet<_> = CacheGroup::ALL
            .iter()
            .map(|g| CacheKey::derive(*g, &descriptor))
            .collect();
        prop_assert_eq!(keys.len(), CacheGroup::ALL.len());
    }
}

// =============================================================================
// Classification Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: Recording an access never lowers a key's frequency tier.
    #[test]
    fn prop_access_never_lowers_frequency(
        gaps in prop::collection::vec(0u64..7200, 1..40),
    ) {
        let clock = Arc::new(ManualClock::default());
        let classifier = classifier(clock.clone());

        for gap in gaps {
            clock.advance(Duration::from_secs(gap));
            let before = classifier.frequency("k");
            classifier.record_access("k");
            let after = classifier.frequency("k");
            prop_assert!(after >= before, "{:?} dropped to {:?}", before, after);
        }
    }

    /// Property: A key with more accesses at the same instant ranks at least as high.
    #[test]
    fn prop_more_accesses_rank_higher(
        fewer in 0usize..30,
        extra in 0usize..30,
    ) {
        let clock = Arc::new(ManualClock::default());
        let classifier = classifier(clock);

        for _ in 0..fewer {
            classifier.record_access("a");
        }
        for _ in 0..fewer + extra {
            classifier.record_access("b");
        }
        prop_assert!(classifier.frequency("b") >= classifier.frequency("a"));
    }

    /// Property: Hot at a threshold implies hot at every lower threshold.
    #[test]
    fn prop_classify_respects_threshold_order(accesses in 1usize..40) {
        let clock = Arc::new(ManualClock::default());
        let classifier = classifier(clock);
        for _ in 0..accesses {
            classifier.record_access("k");
        }

        for (i, high) in AccessFrequency::ALL.iter().enumerate() {
            if classifier.classify("k", *high) {
                for low in &AccessFrequency::ALL[..i] {
                    prop_assert!(classifier.classify("k", *low));
                }
            }
        }
        prop_assert!(!classifier.classify("unknown", AccessFrequency::ALL[0]));
    }

    /// Property: The tier mapping is monotone in the decayed score.
    #[test]
    fn prop_frequency_monotone_in_score(a in 0.0f64..64.0, b in 0.0f64..64.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            AccessFrequency::from_decayed_score(low) <= AccessFrequency::from_decayed_score(high)
        );
    }
}

// =============================================================================
// Scheduling Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: Higher usage never yields a longer interval or a lighter level.
    #[test]
    fn prop_interval_monotone(x in 0.0f64..=100.0, y in 0.0f64..=100.0) {
        let (low, high) = if x <= y { (x, y) } else { (y, x) };
        prop_assert!(interval_for(high) <= interval_for(low));
        prop_assert!(level_for(high) >= level_for(low));
    }

    /// Property: A periodic pass is due exactly on multiples of the interval.
    #[test]
    fn prop_should_migrate_on_multiples(batch in 0u64..10_000, usage in 0.0f64..=100.0) {
        let interval = interval_for(usage);
        prop_assert_eq!(should_migrate(batch, interval), batch % interval == 0);
        prop_assert!(should_migrate(batch * interval, interval));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: Each processed unit runs at most one pass, and housekeeping
    /// only runs on units without a periodic pass.
    #[test]
    fn prop_unit_never_runs_two_passes(
        usages in prop::collection::vec(0.0f64..=100.0, 1..80),
    ) {
        let config = CacheSystemConfig::default();
        let clock = Arc::new(ManualClock::default());
        let events = Arc::new(InMemoryEventCollector::new());
        let cache = Arc::new(
            KeyedCacheStore::new(
                &config,
                Arc::new(InMemoryStore::with_clock("fast", clock.clone())),
                Arc::new(InMemoryStore::with_clock("slow", clock.clone())),
                clock,
            )?
            .with_event_publisher(events.clone()),
        );
        let probe = Arc::new(StaticMemoryProbe::new(0.0));
        let scheduler = AdaptiveMaintenanceScheduler::new(&config, cache, probe.clone())?;

        for (i, usage) in usages.into_iter().enumerate() {
            let batch = i as u64 + 1;
            probe.set(usage);
            let before = events.events_of_type("MaintenancePassCompleted").len();

            let outcome = scheduler.on_unit_processed(batch);
            let after = events.events_of_type("MaintenancePassCompleted").len();
            let periodic_due = should_migrate(batch, interval_for(usage));

            match outcome {
                UnitOutcome::Periodic(_) => {
                    prop_assert!(periodic_due);
                    prop_assert_eq!(after - before, 1);
                }
                UnitOutcome::Housekeeping(_) => {
                    prop_assert!(!periodic_due);
                    prop_assert_eq!(after - before, 1);
                }
                UnitOutcome::Idle => prop_assert_eq!(after, before),
                UnitOutcome::Skipped => prop_assert!(false, "no concurrent pass was running"),
            }
        }
    }
}
