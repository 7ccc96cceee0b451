//! Metrics module
//!
//! Exposes cache, record and maintenance statistics to Prometheus.

mod exporter;

pub use exporter::CacheMetricsExporter;
