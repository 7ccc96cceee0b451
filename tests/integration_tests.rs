//! erp-cache Integration Tests
//!
//! End-to-end flows across the public API:
//! - Keyed cache: TTL, group flushes, tier placement and fallback
//! - Price records: lifecycle, validation, retention cleanup
//! - Adaptive maintenance: pressure levels, migration, eviction, recovery
//! - Configuration and metrics exposition

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use serde_json::{json, Value};

use erp_cache::adapters::{
    InMemoryEventCollector, InMemoryStore, ManualClock, StaticMemoryProbe,
};
use erp_cache::cache::{CacheGroup, CacheTier, KeyedCacheStore, RequestDescriptor};
use erp_cache::config::{CacheSystemConfig, MaintenanceConfig};
use erp_cache::domain::BackingStore;
use erp_cache::maintenance::{
    interval_for, level_for, AdaptiveMaintenanceScheduler, CleanupLevel, MaintenanceAction,
    UnitOutcome,
};
use erp_cache::records::{InvalidationReason, PriceRecordCache, RecordState, WriteOutcome};
use erp_cache::{CacheMetricsExporter, Error};

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    clock: Arc<ManualClock>,
    fast: Arc<InMemoryStore>,
    slow: Arc<InMemoryStore>,
    record_store: Arc<InMemoryStore>,
    events: Arc<InMemoryEventCollector>,
    probe: Arc<StaticMemoryProbe>,
    cache: Arc<KeyedCacheStore>,
    records: Arc<PriceRecordCache>,
    scheduler: AdaptiveMaintenanceScheduler,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(CacheSystemConfig::default())
    }

    fn with_config(config: CacheSystemConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let fast = Arc::new(InMemoryStore::with_clock("fast", clock.clone()));
        let slow = Arc::new(InMemoryStore::with_clock("slow", clock.clone()));
        let record_store = Arc::new(InMemoryStore::with_clock("records", clock.clone()));
        let events = Arc::new(InMemoryEventCollector::new());
        let probe = Arc::new(StaticMemoryProbe::new(10.0));

        let cache = Arc::new(
            KeyedCacheStore::new(&config, fast.clone(), slow.clone(), clock.clone())
                .unwrap()
                .with_event_publisher(events.clone()),
        );
        let records = Arc::new(
            PriceRecordCache::new(&config, record_store.clone(), clock.clone())
                .unwrap()
                .with_event_publisher(events.clone()),
        );
        let scheduler = AdaptiveMaintenanceScheduler::new(&config, cache.clone(), probe.clone())
            .unwrap()
            .with_records(records.clone());

        Self {
            clock,
            fast,
            slow,
            record_store,
            events,
            probe,
            cache,
            records,
            scheduler,
        }
    }
}

fn articulos(id: u64) -> RequestDescriptor {
    RequestDescriptor::with_args("GetArticulosWS", json!({ "id": id }))
}

fn product_payload(id: u64) -> Value {
    json!({ "id": id, "name": format!("Product {}", id), "stock": 12 })
}

// =============================================================================
// Keyed Cache
// =============================================================================

mod keyed_cache_tests {
    use super::*;

    #[test]
    fn test_set_then_get_returns_payload() {
        let h = Harness::new();
        let payload = product_payload(5);

        assert!(h.cache.set(
            &articulos(5),
            CacheGroup::Product,
            &payload,
            Some(Duration::from_secs(3600))
        ));

        let cached: Option<Value> = h.cache.get(&articulos(5), CacheGroup::Product);
        assert_eq!(cached, Some(payload));
    }

    #[test]
    fn test_entry_misses_after_ttl() {
        let h = Harness::new();
        h.cache.set(
            &articulos(5),
            CacheGroup::Product,
            &product_payload(5),
            Some(Duration::from_secs(3600)),
        );

        h.clock.advance(Duration::from_secs(3599));
        assert!(h
            .cache
            .get::<Value>(&articulos(5), CacheGroup::Product)
            .is_some());

        h.clock.advance(Duration::from_secs(2));
        assert!(h
            .cache
            .get::<Value>(&articulos(5), CacheGroup::Product)
            .is_none());
    }

    #[test]
    fn test_entry_misses_exactly_at_expiry() {
        let h = Harness::new();
        h.cache.set(
            &articulos(1),
            CacheGroup::Order,
            &json!("pending"),
            Some(Duration::from_secs(60)),
        );

        h.clock.advance(Duration::from_secs(60));
        assert!(h.cache.get::<Value>(&articulos(1), CacheGroup::Order).is_none());
    }

    #[test]
    fn test_group_ttl_applies_without_explicit_ttl() {
        let h = Harness::new();
        h.cache
            .set(&articulos(1), CacheGroup::Order, &json!("pending"), None);

        // Orders default to five minutes
        h.clock.advance(Duration::from_secs(301));
        assert!(h.cache.get::<Value>(&articulos(1), CacheGroup::Order).is_none());
    }

    #[test]
    fn test_flush_group_removes_only_that_group() {
        let h = Harness::new();
        let catalogue = RequestDescriptor::with_args("GetCatalogo", json!({ "page": 1 }));
        h.cache
            .set(&articulos(5), CacheGroup::Product, &product_payload(5), None);
        h.cache
            .set(&catalogue, CacheGroup::Product, &json!([1, 2, 3]), None);
        h.cache
            .set(&articulos(5), CacheGroup::Order, &json!("order view"), None);

        assert_eq!(h.cache.flush_group(CacheGroup::Product), 2);

        assert!(h.cache.get::<Value>(&articulos(5), CacheGroup::Product).is_none());
        assert!(h.cache.get::<Value>(&catalogue, CacheGroup::Product).is_none());
        assert_eq!(
            h.cache.get::<Value>(&articulos(5), CacheGroup::Order),
            Some(json!("order view"))
        );
        assert_eq!(h.events.events_of_type("GroupFlushed").len(), 1);
    }

    #[test]
    fn test_flush_group_counts_expired_registrations() {
        let h = Harness::new();
        h.cache.set(
            &articulos(1),
            CacheGroup::Product,
            &product_payload(1),
            Some(Duration::from_secs(10)),
        );
        h.cache
            .set(&articulos(2), CacheGroup::Product, &product_payload(2), None);
        h.clock.advance(Duration::from_secs(20));

        assert_eq!(h.cache.flush_group(CacheGroup::Product), 2);
        assert_eq!(h.cache.flush_group(CacheGroup::Product), 0);
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let h = Harness::new();
        for _ in 0..3 {
            assert!(h
                .cache
                .set(&articulos(7), CacheGroup::Product, &product_payload(7), None));
        }

        let stats = h.cache.get_stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.per_group_counts[&CacheGroup::Product], 1);
        assert_eq!(h.cache.flush_group(CacheGroup::Product), 1);
    }

    #[test]
    fn test_flush_all_clears_every_group_and_legacy_entries() {
        let h = Harness::new();
        h.cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None);
        h.cache
            .set(&articulos(2), CacheGroup::Config, &json!({"vat": 21}), None);

        let legacy = h.cache.cache_key(&articulos(3), CacheGroup::Global);
        h.fast
            .set(
                &format!("erp_cache_{}", legacy),
                Bytes::from(serde_json::to_vec(&json!("legacy")).unwrap()),
                None,
            )
            .unwrap();
        // Foreign keys sharing the prefix are left alone
        h.fast
            .set("erp_cache_settings", Bytes::from_static(b"{}"), None)
            .unwrap();

        assert_eq!(h.cache.flush_all(), 3);
        assert_eq!(h.cache.get_stats().total_entries, 0);
        assert!(h.cache.get::<Value>(&articulos(3), CacheGroup::Global).is_none());
        assert!(h.fast.get("erp_cache_settings").unwrap().is_some());
    }

    #[test]
    fn test_legacy_raw_value_is_readable() {
        let h = Harness::new();
        let key = h.cache.cache_key(&articulos(9), CacheGroup::Product);
        h.fast
            .set(
                &format!("erp_cache_{}", key),
                Bytes::from(serde_json::to_vec(&product_payload(9)).unwrap()),
                None,
            )
            .unwrap();

        let cached: Option<Value> = h.cache.get(&articulos(9), CacheGroup::Product);
        assert_eq!(cached, Some(product_payload(9)));
        assert_eq!(h.cache.get_stats().tier_hits.legacy, 1);
    }

    #[test]
    fn test_large_value_goes_to_slow_tier() {
        let config = CacheSystemConfig {
            large_value_threshold: 256,
            ..Default::default()
        };
        let h = Harness::with_config(config);
        let big = json!({ "description": "x".repeat(4096) });

        let tier = h
            .cache
            .try_set(&articulos(1), CacheGroup::Product, &big, None)
            .unwrap();
        assert_eq!(tier, CacheTier::Slow);
        assert!(h.fast.list_keys("erp_cache:entry:").unwrap().is_empty());

        // Compressed on the way down
        assert!(h.slow.usage().bytes < 4096);

        let cached: Option<Value> = h.cache.get(&articulos(1), CacheGroup::Product);
        assert_eq!(cached, Some(big));

        let stats = h.cache.get_stats();
        assert_eq!(stats.slow_entries, 1);
        assert_eq!(stats.tier_hits.slow, 1);
    }

    #[test]
    fn test_type_mismatch_reports_corrupt_entry() {
        let h = Harness::new();
        h.cache
            .set(&articulos(1), CacheGroup::Product, &json!("not a number"), None);

        let result = h.cache.try_get::<u64>(&articulos(1), CacheGroup::Product);
        assert_matches!(result, Err(Error::CorruptEntry { .. }));
        assert_eq!(h.cache.get_stats().misses, 1);
    }

    #[test]
    fn test_hit_ratio_is_zero_without_lookups() {
        let h = Harness::new();
        let stats = h.cache.get_stats();
        assert_eq!(stats.hit_ratio, 0.0);

        h.cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None);
        h.cache.get::<Value>(&articulos(1), CacheGroup::Product);
        h.cache.get::<Value>(&articulos(2), CacheGroup::Product);
        assert_eq!(h.cache.get_stats().hit_ratio, 0.5);
    }
}

// =============================================================================
// Tier Movement
// =============================================================================

mod tier_tests {
    use super::*;

    #[test]
    fn test_migrated_entry_is_served_from_slow_tier() {
        let h = Harness::new();
        for id in 0..3 {
            h.cache
                .set(&articulos(id), CacheGroup::Product, &product_payload(id), None);
        }

        let report = h.cache.migrate_cold(10).unwrap();
        assert_eq!(report.migrated, 3);
        assert!(h.fast.list_keys("erp_cache:entry:").unwrap().is_empty());

        let cached: Option<Value> = h.cache.get(&articulos(1), CacheGroup::Product);
        assert_eq!(cached, Some(product_payload(1)));
        assert_eq!(h.cache.get_stats().tier_hits.slow, 1);
    }

    #[test]
    fn test_hot_entries_stay_in_fast_tier() {
        let h = Harness::new();
        h.cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None);
        h.cache
            .set(&articulos(2), CacheGroup::Product, &product_payload(2), None);

        for _ in 0..6 {
            h.cache.get::<Value>(&articulos(1), CacheGroup::Product);
        }

        let report = h.cache.migrate_cold(10).unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(report.skipped_hot, 1);

        let hot_key = h.cache.cache_key(&articulos(1), CacheGroup::Product);
        assert!(h
            .fast
            .get(&format!("erp_cache:entry:{}", hot_key))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_hot_slow_entry_is_promoted() {
        let h = Harness::new();
        h.cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None);
        h.cache.migrate_cold(10).unwrap();

        // Warm it up from the slow tier, dropping the local copy each time
        for _ in 0..6 {
            h.cache.get::<Value>(&articulos(1), CacheGroup::Product);
            h.cache.flush_local();
        }

        let stats = h.cache.get_stats();
        assert_eq!(stats.promoted, 1);
        assert_eq!(stats.fast_entries, 1);
        assert_eq!(stats.slow_entries, 0);
    }

    #[test]
    fn test_sweep_drops_undecodable_entries_from_both_tiers() {
        let h = Harness::new();
        h.cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None);

        let broken_fast = h.cache.cache_key(&articulos(2), CacheGroup::Product);
        let broken_slow = h.cache.cache_key(&articulos(3), CacheGroup::Product);
        h.fast
            .set(
                &format!("erp_cache:entry:{}", broken_fast),
                Bytes::from_static(b"{\"v\":"),
                None,
            )
            .unwrap();
        h.slow
            .set(
                &format!("erp_cache:entry:{}", broken_slow),
                Bytes::from_static(b"\x00\x01garbage"),
                None,
            )
            .unwrap();

        assert_eq!(h.cache.sweep_expired().unwrap(), 2);
        assert_eq!(h.cache.get_stats().total_entries, 1);
        assert_eq!(
            h.cache.get::<Value>(&articulos(1), CacheGroup::Product),
            Some(product_payload(1))
        );
    }
}

// =============================================================================
// Price Records
// =============================================================================

mod record_tests {
    use super::*;

    #[test]
    fn test_price_round_trip_and_expiry() {
        let h = Harness::new();
        assert!(h.records.set("SKU-1", Some(19.99), None, None));

        let record = h.records.get("SKU-1").unwrap();
        assert_eq!(record.price, Some(19.99));
        assert_eq!(record.state, RecordState::Active);

        h.clock.advance(Duration::from_secs(3601));
        assert!(h.records.get("SKU-1").is_none());

        let stats = h.records.get_stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.active, 0);
    }

    #[test]
    fn test_record_is_fresh_exactly_at_ttl() {
        let h = Harness::new();
        h.records
            .set("SKU-2", Some(5.0), None, Some(Duration::from_secs(60)));

        h.clock.advance(Duration::from_secs(60));
        assert!(h.records.get("SKU-2").is_some());

        h.clock.advance(Duration::from_secs(1));
        assert!(h.records.get("SKU-2").is_none());
    }

    #[test]
    fn test_out_of_range_prices_are_rejected_without_write() {
        let h = Harness::new();

        assert!(!h.records.set("SKU-1", Some(-0.01), None, None));
        assert!(!h.records.set("SKU-1", Some(1_000_000.0), None, None));
        assert!(!h.records.set("SKU-1", Some(f64::NAN), None, None));
        assert_matches!(
            h.records.upsert("SKU-1", Some(-1.0), None, None),
            Err(Error::InvalidPrice { .. })
        );

        assert_eq!(h.records.get_stats().total, 0);
        assert!(h.record_store.list_keys("").unwrap().is_empty());
    }

    #[test]
    fn test_upsert_reports_change() {
        let h = Harness::new();
        let tariff = json!({ "tier": "wholesale", "min_qty": 10 });

        assert_eq!(
            h.records
                .upsert("SKU-1", Some(10.0), Some(tariff.clone()), None)
                .unwrap(),
            WriteOutcome::Inserted
        );
        assert_eq!(
            h.records
                .upsert("SKU-1", Some(10.0), Some(tariff.clone()), None)
                .unwrap(),
            WriteOutcome::Unchanged
        );
        assert_eq!(
            h.records.upsert("SKU-1", Some(12.5), Some(tariff), None).unwrap(),
            WriteOutcome::Updated
        );
        assert_eq!(h.records.get("SKU-1").unwrap().price, Some(12.5));
    }

    #[test]
    fn test_invalidate_then_cleanup_after_retention() {
        let h = Harness::new();
        h.records.set("SKU-1", Some(1.0), None, None);
        h.records.set("SKU-2", Some(2.0), None, None);

        assert!(h.records.invalidate("SKU-1", InvalidationReason::Invalidated));
        assert!(h.records.get("SKU-1").is_none());
        assert!(!h.records.invalidate("SKU-404", InvalidationReason::Expired));

        // Inside the window nothing goes
        h.clock.advance(Duration::from_secs(6 * 86_400));
        assert_eq!(h.records.cleanup(7), 0);

        h.clock.advance(Duration::from_secs(2 * 86_400));
        assert_eq!(h.records.cleanup(7), 1);

        // Active rows are never purged, stale or not
        let stats = h.records.get_stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.invalidated, 0);
        assert_eq!(h.events.events_of_type("RecordsPurged").len(), 1);
    }

    #[test]
    fn test_set_reactivates_invalidated_row() {
        let h = Harness::new();
        h.records.set("SKU-1", Some(1.0), None, None);
        h.records
            .invalidate("SKU-1", InvalidationReason::Invalidated);

        assert!(h.records.set("SKU-1", Some(1.0), None, None));
        assert_eq!(h.records.get("SKU-1").unwrap().state, RecordState::Active);
    }

    #[test]
    fn test_estimated_hit_rate_is_active_share() {
        let h = Harness::new();
        for i in 0..4 {
            h.records.set(&format!("SKU-{}", i), Some(1.0), None, None);
        }
        h.records
            .invalidate("SKU-0", InvalidationReason::Invalidated);

        let stats = h.records.get_stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.estimated_hit_rate, 0.75);
    }

    #[test]
    fn test_flush_clears_every_row() {
        let h = Harness::new();
        h.records.set("SKU-1", Some(1.0), None, None);
        h.records.set("SKU-2", Some(2.0), None, None);

        assert!(h.records.flush());
        assert_eq!(h.records.get_stats().total, 0);
    }
}

// =============================================================================
// Adaptive Maintenance
// =============================================================================

mod maintenance_tests {
    use super::*;

    #[test]
    fn test_critical_pressure_runs_full_pass_every_unit() {
        let h = Harness::new();
        for id in 0..4 {
            h.cache
                .set(&articulos(id), CacheGroup::Product, &product_payload(id), None);
        }
        h.probe.set(92.0);

        assert_eq!(interval_for(92.0), 1);
        assert_eq!(level_for(92.0), CleanupLevel::Critical);

        let outcome = h.scheduler.on_unit_processed(7);
        let report = outcome.report().unwrap();
        assert_eq!(report.level, CleanupLevel::Critical);
        assert!(report.ran(MaintenanceAction::MigrateCold));
        assert!(report.ran(MaintenanceAction::EvictLru));
        assert!(report.ran(MaintenanceAction::SweepExpired));
        assert_eq!(report.failed_actions(), 0);
        assert_eq!(h.slow.list_keys("erp_cache:entry:").unwrap().len(), 4);
    }

    #[test]
    fn test_pressure_ramp_shortens_interval() {
        let h = Harness::new();
        let mut periodic = Vec::new();

        for batch in 1..=40u64 {
            h.probe.set(if batch <= 20 { 30.0 } else { 85.0 });
            if let UnitOutcome::Periodic(report) = h.scheduler.on_unit_processed(batch) {
                periodic.push((batch, report.level));
            }
        }

        assert_eq!(
            periodic,
            vec![
                (20, CleanupLevel::Light),
                (25, CleanupLevel::Aggressive),
                (30, CleanupLevel::Aggressive),
                (35, CleanupLevel::Aggressive),
                (40, CleanupLevel::Aggressive),
            ]
        );
        assert_eq!(
            h.scheduler.state().last_cleanup_level,
            Some(CleanupLevel::Aggressive)
        );
    }

    #[test]
    fn test_eviction_brings_fast_tier_under_ceiling() {
        let config = CacheSystemConfig {
            maintenance: MaintenanceConfig {
                max_cache_bytes: 2048,
                ..Default::default()
            },
            ..Default::default()
        };
        let h = Harness::with_config(config);
        for id in 0..30 {
            h.cache.set(
                &articulos(id),
                CacheGroup::Product,
                &json!({ "id": id, "pad": "z".repeat(80) }),
                None,
            );
        }
        // Migration cannot relieve the fast tier
        h.slow.set_fail_writes(true);
        h.probe.set(95.0);

        let report = h.scheduler.cleanup_pass().unwrap();
        assert!(!report.outcome(MaintenanceAction::MigrateCold).unwrap().succeeded());
        assert!(report.outcome(MaintenanceAction::EvictLru).unwrap().affected > 0);
        assert!(h.fast.usage().bytes <= 2048);
        assert_eq!(h.events.events_of_type("EntriesEvicted").len(), 1);
    }

    #[test]
    fn test_scheduled_pass_purges_records() {
        let h = Harness::new();
        h.records.set("SKU-1", Some(1.0), None, None);
        h.records
            .invalidate("SKU-1", InvalidationReason::Invalidated);
        h.clock.advance(Duration::from_secs(8 * 86_400));

        let report = h.scheduler.cleanup_pass().unwrap();
        assert_eq!(
            report.outcome(MaintenanceAction::PurgeRecords).unwrap().affected,
            1
        );
        assert_eq!(h.records.get_stats().total, 0);
    }

    #[test]
    fn test_cache_recovers_after_store_failure() {
        let h = Harness::new();
        h.fast.set_fail_writes(true);

        assert!(!h
            .cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None));
        assert!(h.cache.get::<Value>(&articulos(1), CacheGroup::Product).is_none());
        assert_eq!(h.events.events_of_type("EntryWriteFailed").len(), 1);

        // Maintenance keeps running against a failing tier
        h.probe.set(95.0);
        assert!(h.scheduler.cleanup_pass().is_some());

        h.fast.set_fail_writes(false);
        assert!(h
            .cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None));
        assert_eq!(
            h.cache.get::<Value>(&articulos(1), CacheGroup::Product),
            Some(product_payload(1))
        );
        assert_eq!(h.cache.get_stats().write_failures, 1);
    }

    #[tokio::test]
    async fn test_cleanup_pass_from_timer_task() {
        let h = Harness::new();
        let scheduler = Arc::new(h.scheduler);
        let mut ticker = tokio::time::interval(Duration::from_millis(5));

        for _ in 0..3 {
            ticker.tick().await;
            let s = scheduler.clone();
            let report = tokio::task::spawn_blocking(move || s.cleanup_pass())
                .await
                .unwrap();
            assert!(report.is_some());
        }
        assert_eq!(scheduler.state().scheduled_passes, 3);
    }
}

// =============================================================================
// Configuration and Metrics
// =============================================================================

mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_drives_namespace_and_ttls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "namespace: storefront\ngroup_ttls:\n  product_secs: 60\nmaintenance:\n  eviction_cap: 10"
        )
        .unwrap();

        let config = CacheSystemConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.namespace, "storefront");
        assert_eq!(config.maintenance.eviction_cap, 10);

        let h = Harness::with_config(config);
        h.cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None);
        assert_eq!(h.fast.list_keys("storefront:entry:").unwrap().len(), 1);

        h.clock.advance(Duration::from_secs(61));
        assert!(h.cache.get::<Value>(&articulos(1), CacheGroup::Product).is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CacheSystemConfig {
            maintenance: MaintenanceConfig {
                eviction_ratio: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        let clock = Arc::new(ManualClock::default());
        let result = KeyedCacheStore::new(
            &config,
            Arc::new(InMemoryStore::new("fast")),
            Arc::new(InMemoryStore::new("slow")),
            clock,
        );
        assert_matches!(result, Err(Error::Config(_)));

        assert_matches!(
            CacheSystemConfig::from_yaml_str("unknown_option: 1"),
            Err(Error::ConfigFile(_))
        );
    }

    #[test]
    fn test_exporter_reflects_cache_and_passes() {
        let h = Harness::new();
        let exporter = CacheMetricsExporter::new().unwrap();

        h.cache
            .set(&articulos(1), CacheGroup::Product, &product_payload(1), None);
        h.cache.get::<Value>(&articulos(1), CacheGroup::Product);
        h.records.set("SKU-1", Some(3.5), None, None);
        h.probe.set(70.0);
        let report = h.scheduler.cleanup_pass().unwrap();

        exporter.observe_cache(&h.cache.get_stats());
        exporter.observe_records(&h.records.get_stats());
        exporter.observe_pass(&report);

        let text = exporter.gather_text().unwrap();
        assert!(text.contains("erp_cache_hits_total 1"));
        assert!(text.contains("erp_cache_entries 1"));
        assert!(text.contains(r#"erp_cache_records{state="active"} 1"#));
        assert!(text.contains(r#"erp_cache_maintenance_passes_total{level="moderate"} 1"#));
        assert!(text.contains("erp_cache_memory_usage_percent 70"));
    }
}
