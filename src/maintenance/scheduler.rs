//! Adaptive Maintenance Scheduler
//!
//! Keeps cache memory bounded during long batch synchronizations without
//! starving throughput. Driven by batch progress, plus an external timer.
//!
//! ```text
//!                ┌──────────────────────────────────────────────┐
//!                ▼                                              │
//!  Idle ──▶ Evaluating ──┬──▶ Quiescent (compact, flush local) ─┤
//!                        ├──▶ Migrating (hot → cold)           ─┤
//!                        ├──▶ Evicting  (preventive LRU)       ─┤
//!                        └──▶ Sweeping  (expired entries)      ─┘
//! ```
//!
//! Exactly one flavor of maintenance runs per processed unit: a periodic
//! pass when the unit lands on the pressure-derived interval, otherwise a
//! lightweight housekeeping pass on batch-size boundaries, otherwise nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::eviction::EvictionPolicy;
use super::level::{interval_for, level_for, should_migrate, CleanupLevel, MaintenanceAction};
use crate::cache::KeyedCacheStore;
use crate::config::{CacheSystemConfig, MaintenanceConfig};
use crate::domain::events::CacheEvent;
use crate::domain::ports::{EventPublisher, MemoryProbe};
use crate::error::{Error, Result};
use crate::records::PriceRecordCache;

/// Actions of the lightweight batch-boundary pass
const HOUSEKEEPING_ACTIONS: [MaintenanceAction; 2] =
    [MaintenanceAction::Compact, MaintenanceAction::FlushLocal];

// =============================================================================
// State
// =============================================================================

/// Where the scheduler currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerPhase {
    Idle,
    Evaluating,
    Migrating,
    Sweeping,
    Evicting,
    Quiescent,
}

impl SchedulerPhase {
    fn for_action(action: MaintenanceAction) -> Self {
        match action {
            MaintenanceAction::Compact | MaintenanceAction::FlushLocal => SchedulerPhase::Quiescent,
            MaintenanceAction::MigrateCold => SchedulerPhase::Migrating,
            MaintenanceAction::EvictLru => SchedulerPhase::Evicting,
            MaintenanceAction::SweepExpired | MaintenanceAction::PurgeRecords => {
                SchedulerPhase::Sweeping
            }
        }
    }
}

impl std::fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerPhase::Idle => write!(f, "Idle"),
            SchedulerPhase::Evaluating => write!(f, "Evaluating"),
            SchedulerPhase::Migrating => write!(f, "Migrating"),
            SchedulerPhase::Sweeping => write!(f, "Sweeping"),
            SchedulerPhase::Evicting => write!(f, "Evicting"),
            SchedulerPhase::Quiescent => write!(f, "Quiescent"),
        }
    }
}

/// Process-scoped maintenance state, reset per sync run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaintenanceState {
    pub batches_since_last_migration: u64,
    pub current_memory_usage_percent: f64,
    pub last_cleanup_level: Option<CleanupLevel>,
    pub periodic_passes: u64,
    pub housekeeping_passes: u64,
    pub scheduled_passes: u64,
    pub last_pass_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Reports
// =============================================================================

/// What triggered a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Interval match during a batch run
    Periodic,
    /// Batch-size boundary without a periodic pass
    Housekeeping,
    /// External timer
    Scheduled,
}

/// Result of one action within a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub action: MaintenanceAction,
    /// Entries, rows or bytes affected, depending on the action
    pub affected: usize,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a maintenance pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub kind: PassKind,
    pub batch_number: Option<u64>,
    pub level: CleanupLevel,
    pub memory_usage_percent: f64,
    pub actions: Vec<ActionOutcome>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl PassReport {
    /// Whether `action` ran (successfully or not)
    pub fn ran(&self, action: MaintenanceAction) -> bool {
        self.actions.iter().any(|a| a.action == action)
    }

    pub fn outcome(&self, action: MaintenanceAction) -> Option<&ActionOutcome> {
        self.actions.iter().find(|a| a.action == action)
    }

    pub fn failed_actions(&self) -> usize {
        self.actions.iter().filter(|a| !a.succeeded()).count()
    }
}

/// What `on_unit_processed` did
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// Full pass at the current level
    Periodic(PassReport),
    /// Lightweight compact + flush
    Housekeeping(PassReport),
    /// Nothing due on this unit
    Idle,
    /// Another pass was already running
    Skipped,
}

impl UnitOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            UnitOutcome::Periodic(report) | UnitOutcome::Housekeeping(report) => Some(report),
            UnitOutcome::Idle | UnitOutcome::Skipped => None,
        }
    }
}

/// Releases the single-pass flag on drop
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Batch-driven maintenance orchestrator
pub struct AdaptiveMaintenanceScheduler {
    cache: Arc<KeyedCacheStore>,
    records: Option<Arc<PriceRecordCache>>,
    probe: Arc<dyn MemoryProbe>,
    config: MaintenanceConfig,
    eviction: EvictionPolicy,
    publisher: Arc<dyn EventPublisher>,
    state: Mutex<MaintenanceState>,
    phase: Mutex<SchedulerPhase>,
    running: AtomicBool,
}

impl AdaptiveMaintenanceScheduler {
    /// Create a scheduler over `cache`.
    ///
    /// Rejects invalid configuration with [`Error::Config`].
    pub fn new(
        config: &CacheSystemConfig,
        cache: Arc<KeyedCacheStore>,
        probe: Arc<dyn MemoryProbe>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            publisher: cache.publisher().clone(),
            cache,
            records: None,
            probe,
            config: config.maintenance.clone(),
            eviction: EvictionPolicy::from_config(&config.maintenance),
            state: Mutex::new(MaintenanceState::default()),
            phase: Mutex::new(SchedulerPhase::Idle),
            running: AtomicBool::new(false),
        })
    }

    /// Also purge retained price records on scheduled passes
    pub fn with_records(mut self, records: Arc<PriceRecordCache>) -> Self {
        self.records = Some(records);
        self
    }

    /// Route pass events to `publisher`
    pub fn with_event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn state(&self) -> MaintenanceState {
        self.state.lock().clone()
    }

    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.lock()
    }

    /// Whether a pass is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        *self.phase.lock() = phase;
    }

    /// Start a new sync run: reset state and the cache's diagnostic counters
    pub fn begin_run(&self) {
        *self.state.lock() = MaintenanceState::default();
        self.cache.reset_counters();
        debug!("Maintenance state reset for new sync run");
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Called by the sync loop after each processed unit
    pub fn on_unit_processed(&self, batch_number: u64) -> UnitOutcome {
        let Some(_guard) = PassGuard::acquire(&self.running) else {
            debug!(batch_number, "Maintenance already running, skipping unit");
            return UnitOutcome::Skipped;
        };

        self.set_phase(SchedulerPhase::Evaluating);
        let usage = self.probe.usage_percent();
        let interval = interval_for(usage);
        let level = level_for(usage);
        {
            let mut state = self.state.lock();
            state.current_memory_usage_percent = usage;
            state.batches_since_last_migration += 1;
        }

        let outcome = if should_migrate(batch_number, interval) {
            let report = self.run_pass(
                PassKind::Periodic,
                Some(batch_number),
                level,
                usage,
                level.actions(),
            );
            let mut state = self.state.lock();
            state.batches_since_last_migration = 0;
            state.periodic_passes += 1;
            UnitOutcome::Periodic(report)
        } else if batch_number % self.config.housekeeping_every == 0 {
            let report = self.run_pass(
                PassKind::Housekeeping,
                Some(batch_number),
                level,
                usage,
                &HOUSEKEEPING_ACTIONS,
            );
            self.state.lock().housekeeping_passes += 1;
            UnitOutcome::Housekeeping(report)
        } else {
            UnitOutcome::Idle
        };

        self.set_phase(SchedulerPhase::Idle);
        outcome
    }

    /// Timer-driven pass: the current level's actions plus an expired-entry
    /// sweep and, when attached, record retention cleanup.
    ///
    /// Returns `None` if a pass was already running.
    pub fn cleanup_pass(&self) -> Option<PassReport> {
        let Some(_guard) = PassGuard::acquire(&self.running) else {
            debug!("Maintenance already running, skipping scheduled pass");
            return None;
        };

        self.set_phase(SchedulerPhase::Evaluating);
        let usage = self.probe.usage_percent();
        let level = level_for(usage);
        self.state.lock().current_memory_usage_percent = usage;

        let mut actions = level.actions().to_vec();
        if !actions.contains(&MaintenanceAction::SweepExpired) {
            actions.push(MaintenanceAction::SweepExpired);
        }
        if self.records.is_some() {
            actions.push(MaintenanceAction::PurgeRecords);
        }

        let report = self.run_pass(PassKind::Scheduled, None, level, usage, &actions);
        self.state.lock().scheduled_passes += 1;
        self.set_phase(SchedulerPhase::Idle);
        Some(report)
    }

    // =========================================================================
    // Pass Execution
    // =========================================================================

    #[instrument(skip(self, actions), fields(kind = ?kind, level = %level))]
    fn run_pass(
        &self,
        kind: PassKind,
        batch_number: Option<u64>,
        level: CleanupLevel,
        usage: f64,
        actions: &[MaintenanceAction],
    ) -> PassReport {
        let pass_id = Uuid::new_v4();
        let started_at = self.cache.clock().now();
        let timer = Instant::now();
        let mut outcomes = Vec::with_capacity(actions.len());

        for &action in actions {
            self.set_phase(SchedulerPhase::for_action(action));
            let outcome = match self.execute(action, level) {
                Ok(affected) => ActionOutcome {
                    action,
                    affected,
                    error: None,
                },
                Err(e) => {
                    warn!(%pass_id, action = %action, error = %e, "Maintenance action failed, continuing pass");
                    self.emit(CacheEvent::MaintenanceActionFailed {
                        pass_id,
                        action: action.to_string(),
                        reason: e.to_string(),
                        timestamp: self.cache.clock().now(),
                    });
                    ActionOutcome {
                        action,
                        affected: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = PassReport {
            pass_id,
            kind,
            batch_number,
            level,
            memory_usage_percent: usage,
            actions: outcomes,
            started_at,
            duration: timer.elapsed(),
        };

        {
            let mut state = self.state.lock();
            state.last_cleanup_level = Some(level);
            state.last_pass_at = Some(started_at);
        }

        info!(
            %pass_id,
            batch_number = ?batch_number,
            memory_usage_percent = usage,
            actions = report.actions.len(),
            failed = report.failed_actions(),
            duration_ms = report.duration.as_millis() as u64,
            "Maintenance pass completed"
        );
        self.emit(CacheEvent::MaintenancePassCompleted {
            pass_id,
            batch_number,
            level: level.to_string(),
            actions_run: report.actions.len(),
            actions_failed: report.failed_actions(),
            duration_ms: report.duration.as_millis() as u64,
            timestamp: self.cache.clock().now(),
        });
        report
    }

    fn execute(&self, action: MaintenanceAction, level: CleanupLevel) -> Result<usize> {
        match action {
            MaintenanceAction::Compact => {
                let report = self.cache.compact();
                Ok(report.local_dropped + report.metrics_pruned)
            }
            MaintenanceAction::FlushLocal => Ok(self.cache.flush_local()),
            MaintenanceAction::MigrateCold => {
                let report = self.cache.migrate_cold(self.config.migration_cap)?;
                if report.failed > 0 {
                    return Err(Error::MaintenanceFailed {
                        action: action.to_string(),
                        reason: format!(
                            "{} entries failed to migrate ({} moved)",
                            report.failed, report.migrated
                        ),
                    });
                }
                Ok(report.migrated)
            }
            MaintenanceAction::EvictLru => self.evict(level),
            MaintenanceAction::SweepExpired => self.cache.sweep_expired(),
            MaintenanceAction::PurgeRecords => match &self.records {
                Some(records) => records.try_cleanup(records.retention_days()),
                None => Ok(0),
            },
        }
    }

    /// Preventive eviction; hot entries only at the critical level
    fn evict(&self, level: CleanupLevel) -> Result<usize> {
        let current = self.cache.fast_usage().bytes;
        if !self.eviction.triggered(current) {
            debug!(
                current_bytes = current,
                threshold_bytes = self.eviction.target_bytes(),
                "Below eviction threshold"
            );
            return Ok(0);
        }

        let candidates = self.cache.eviction_candidates()?;
        let plan = self
            .eviction
            .plan(current, candidates, level == CleanupLevel::Critical);
        if plan.capped {
            debug!(cap = self.eviction.cap, "Eviction stopped at per-pass cap");
        }

        let report = self.cache.evict(&plan.victims);
        if report.failed > 0 {
            return Err(Error::MaintenanceFailed {
                action: MaintenanceAction::EvictLru.to_string(),
                reason: format!(
                    "{} entries failed to evict ({} evicted)",
                    report.failed, report.evicted
                ),
            });
        }
        Ok(report.evicted)
    }

    fn emit(&self, event: CacheEvent) {
        if let Err(e) = self.publisher.publish(event) {
            debug!(error = %e, "Failed to publish maintenance event");
        }
    }
}

impl std::fmt::Debug for AdaptiveMaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveMaintenanceScheduler")
            .field("phase", &self.phase())
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEventCollector, InMemoryStore, ManualClock, StaticMemoryProbe};
    use crate::cache::{CacheGroup, RequestDescriptor};
    use crate::domain::ports::BackingStore;
    use assert_matches::assert_matches;
    use serde_json::json;

    struct Fixture {
        scheduler: AdaptiveMaintenanceScheduler,
        cache: Arc<KeyedCacheStore>,
        fast: Arc<InMemoryStore>,
        slow: Arc<InMemoryStore>,
        probe: Arc<StaticMemoryProbe>,
        clock: Arc<ManualClock>,
        events: Arc<InMemoryEventCollector>,
    }

    fn fixture_with(config: CacheSystemConfig) -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let fast = Arc::new(InMemoryStore::with_clock("fast", clock.clone()));
        let slow = Arc::new(InMemoryStore::with_clock("slow", clock.clone()));
        let events = Arc::new(InMemoryEventCollector::new());
        let cache = Arc::new(
            KeyedCacheStore::new(&config, fast.clone(), slow.clone(), clock.clone())
                .unwrap()
                .with_event_publisher(events.clone()),
        );
        let probe = Arc::new(StaticMemoryProbe::new(10.0));
        let scheduler =
            AdaptiveMaintenanceScheduler::new(&config, cache.clone(), probe.clone()).unwrap();
        Fixture {
            scheduler,
            cache,
            fast,
            slow,
            probe,
            clock,
            events,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(CacheSystemConfig::default())
    }

    fn fill(cache: &KeyedCacheStore, count: u64) {
        for id in 0..count {
            let d = RequestDescriptor::with_args("GetArticulosWS", json!({ "id": id }));
            assert!(cache.set(&d, CacheGroup::Product, &json!({"id": id, "pad": "x".repeat(64)}), None));
        }
    }

    #[test]
    fn test_light_pressure_runs_every_twenty_units() {
        let f = fixture();

        assert_eq!(f.scheduler.on_unit_processed(19), UnitOutcome::Idle);
        let outcome = f.scheduler.on_unit_processed(20);
        let report = outcome.report().unwrap();

        assert_matches!(outcome, UnitOutcome::Periodic(_));
        assert_eq!(report.level, CleanupLevel::Light);
        assert_eq!(report.actions.len(), 1);
        assert!(report.ran(MaintenanceAction::Compact));
        assert_eq!(f.scheduler.state().batches_since_last_migration, 0);
        assert_eq!(f.scheduler.phase(), SchedulerPhase::Idle);
    }

    #[test]
    fn test_critical_pressure_runs_everything_every_unit() {
        let f = fixture();
        f.probe.set(92.0);

        let outcome = f.scheduler.on_unit_processed(7);
        let report = outcome.report().unwrap();
        assert_eq!(report.level, CleanupLevel::Critical);
        for action in [
            MaintenanceAction::Compact,
            MaintenanceAction::FlushLocal,
            MaintenanceAction::MigrateCold,
            MaintenanceAction::EvictLru,
            MaintenanceAction::SweepExpired,
        ] {
            assert!(report.ran(action), "{} did not run", action);
        }
        assert_eq!(
            f.scheduler.state().last_cleanup_level,
            Some(CleanupLevel::Critical)
        );
    }

    #[test]
    fn test_housekeeping_never_duplicates_periodic_pass() {
        let config = CacheSystemConfig {
            maintenance: MaintenanceConfig {
                housekeeping_every: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        let f = fixture_with(config);

        // Unit 20 matches both the light interval (20) and the boundary (10)
        assert_matches!(f.scheduler.on_unit_processed(20), UnitOutcome::Periodic(_));
        assert_matches!(f.scheduler.on_unit_processed(30), UnitOutcome::Housekeeping(_));
        assert_matches!(f.scheduler.on_unit_processed(31), UnitOutcome::Idle);

        let state = f.scheduler.state();
        assert_eq!(state.periodic_passes, 1);
        assert_eq!(state.housekeeping_passes, 1);
        assert_eq!(state.batches_since_last_migration, 2);
    }

    #[test]
    fn test_moderate_pass_flushes_local_layer() {
        let f = fixture();
        fill(&f.cache, 3);
        let d = RequestDescriptor::with_args("GetArticulosWS", json!({ "id": 0 }));
        f.cache.get::<serde_json::Value>(&d, CacheGroup::Product);

        f.probe.set(65.0);
        let outcome = f.scheduler.on_unit_processed(10);
        let report = outcome.report().unwrap();
        assert_eq!(report.level, CleanupLevel::Moderate);
        assert_eq!(report.outcome(MaintenanceAction::FlushLocal).unwrap().affected, 1);
        assert!(!report.ran(MaintenanceAction::MigrateCold));
    }

    #[test]
    fn test_aggressive_pass_migrates_cold_entries() {
        let f = fixture();
        fill(&f.cache, 5);

        f.probe.set(85.0);
        let outcome = f.scheduler.on_unit_processed(5);
        let report = outcome.report().unwrap();
        assert_eq!(report.outcome(MaintenanceAction::MigrateCold).unwrap().affected, 5);
        assert_eq!(f.slow.list_keys("erp_cache:entry:").unwrap().len(), 5);
    }

    #[test]
    fn test_failing_action_does_not_abort_pass() {
        let f = fixture();
        fill(&f.cache, 3);
        f.slow.set_fail_writes(true);
        f.probe.set(95.0);

        let outcome = f.scheduler.on_unit_processed(1);
        let report = outcome.report().unwrap();

        let migrate = report.outcome(MaintenanceAction::MigrateCold).unwrap();
        assert!(!migrate.succeeded());
        assert!(report.outcome(MaintenanceAction::SweepExpired).unwrap().succeeded());
        assert_eq!(report.failed_actions(), 1);
        assert_eq!(f.events.events_of_type("MaintenanceActionFailed").len(), 1);
        assert_eq!(f.events.events_of_type("MaintenancePassCompleted").len(), 1);
    }

    #[test]
    fn test_critical_eviction_under_pressure() {
        let config = CacheSystemConfig {
            maintenance: MaintenanceConfig {
                max_cache_bytes: 1024,
                ..Default::default()
            },
            ..Default::default()
        };
        let f = fixture_with(config);
        fill(&f.cache, 20);
        // Keep everything in the fast tier so eviction has work to do
        f.slow.set_fail_writes(true);
        f.probe.set(95.0);

        let outcome = f.scheduler.on_unit_processed(1);
        let evicted = outcome
            .report()
            .unwrap()
            .outcome(MaintenanceAction::EvictLru)
            .unwrap()
            .affected;
        assert!(evicted > 0);
        assert!(f.fast.usage().bytes <= 1024);
    }

    #[test]
    fn test_critical_pass_reclaims_expired_before_evicting() {
        let config = CacheSystemConfig {
            maintenance: MaintenanceConfig {
                max_cache_bytes: 4096,
                ..Default::default()
            },
            ..Default::default()
        };
        let f = fixture_with(config);
        for id in 0..20 {
            let d = RequestDescriptor::with_args("GetArticulosWS", json!({ "id": id }));
            f.cache.set(
                &d,
                CacheGroup::Product,
                &json!({"id": id, "pad": "x".repeat(512)}),
                Some(Duration::from_secs(5)),
            );
        }
        let hot = RequestDescriptor::with_args("GetArticulosWS", json!({ "id": "hot" }));
        f.cache.set(&hot, CacheGroup::Product, &json!({"id": "hot"}), None);
        for _ in 0..6 {
            f.cache.get::<serde_json::Value>(&hot, CacheGroup::Product);
        }
        assert!(f.fast.usage().bytes > 4096);

        f.clock.advance(Duration::from_secs(10));
        f.probe.set(95.0);
        let outcome = f.scheduler.on_unit_processed(1);
        let report = outcome.report().unwrap();

        let position = |action: MaintenanceAction| report.actions.iter().position(|a| a.action == action);
        assert!(position(MaintenanceAction::SweepExpired) < position(MaintenanceAction::EvictLru));
        assert_eq!(report.outcome(MaintenanceAction::SweepExpired).unwrap().affected, 20);
        assert_eq!(report.outcome(MaintenanceAction::EvictLru).unwrap().affected, 0);
        assert!(f.fast.usage().bytes < 4096);
        assert_eq!(
            f.cache.get::<serde_json::Value>(&hot, CacheGroup::Product),
            Some(json!({"id": "hot"}))
        );
    }

    #[test]
    fn test_cleanup_pass_always_sweeps() {
        let f = fixture();
        let report = f.scheduler.cleanup_pass().unwrap();

        assert_eq!(report.kind, PassKind::Scheduled);
        assert_eq!(report.batch_number, None);
        assert!(report.ran(MaintenanceAction::SweepExpired));
        assert!(!report.ran(MaintenanceAction::PurgeRecords));
        assert_eq!(f.scheduler.state().scheduled_passes, 1);
    }

    #[test]
    fn test_concurrent_pass_is_skipped() {
        let f = fixture();
        let _held = PassGuard::acquire(&f.scheduler.running).unwrap();

        assert!(f.scheduler.is_running());
        assert_eq!(f.scheduler.on_unit_processed(20), UnitOutcome::Skipped);
        assert!(f.scheduler.cleanup_pass().is_none());
    }

    #[test]
    fn test_begin_run_resets_state() {
        let f = fixture();
        f.scheduler.on_unit_processed(20);
        f.scheduler.on_unit_processed(21);
        f.scheduler.begin_run();

        assert_eq!(f.scheduler.state(), MaintenanceState::default());
    }
}
