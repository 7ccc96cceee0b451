//! Usage Tracking
//!
//! Access-frequency bookkeeping behind hot/cold tier decisions. Metrics here
//! only steer migration and eviction; they never affect what a read returns.

mod classifier;

pub use classifier::{AccessFrequency, UsageClassifier, UsageMetrics};
