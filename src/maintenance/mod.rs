//! Adaptive Maintenance
//!
//! Batch-driven cleanup whose frequency and intensity follow memory
//! pressure:
//!
//! - **Levels** (`level.rs`): `interval_for`, `level_for`, the additive
//!   action sets and `should_migrate`
//! - **Eviction** (`eviction.rs`): preventive LRU planning
//! - **Scheduler** (`scheduler.rs`): `on_unit_processed` for the sync loop and
//!   `cleanup_pass` for the external timer

mod eviction;
mod level;
mod scheduler;

pub use eviction::{EvictionPlan, EvictionPolicy};
pub use level::{interval_for, level_for, should_migrate, CleanupLevel, MaintenanceAction};
pub use scheduler::{
    ActionOutcome, AdaptiveMaintenanceScheduler, MaintenanceState, PassKind, PassReport,
    SchedulerPhase, UnitOutcome,
};
