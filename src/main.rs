//! erp-cache
//!
//! Runs the cache subsystem standalone.
//!
//! - `serve`: timer-driven maintenance passes with `/metrics` and health
//!   endpoints, until Ctrl-C.
//! - `simulate`: a synthetic ERP sync loop that drives the scheduler through
//!   a memory-pressure ramp and prints the resulting statistics.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           erp-cache                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   Interval   │───▶│  Scheduler   │───▶│    Cache     │       │
//! │  │   (timer)    │    │  (cleanup)   │    │   tiers      │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! │          │                   │                                   │
//! │          └──────▶  Prometheus exporter  ◀──────┘                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use erp_cache::adapters::{InMemoryStore, ProcessMemoryProbe, StaticMemoryProbe, SystemClock};
use erp_cache::domain::{BackingStore, Clock, MemoryProbe};
use erp_cache::maintenance::UnitOutcome;
use erp_cache::{
    AdaptiveMaintenanceScheduler, CacheGroup, CacheMetricsExporter, CacheSystemConfig, Error,
    KeyedCacheStore, PriceRecordCache, RequestDescriptor, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Tiered cache and adaptive maintenance engine for ERP synchronization
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file; defaults apply when omitted
    #[arg(long, env = "ERP_CACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run scheduled maintenance with metrics and health endpoints
    Serve {
        /// Metrics server bind address
        #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
        metrics_addr: String,

        /// Health server bind address
        #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
        health_addr: String,

        /// Seconds between scheduled cleanup passes
        #[arg(long, env = "CLEANUP_INTERVAL_SECONDS", default_value = "300")]
        cleanup_interval_seconds: u64,

        /// Resident memory budget the usage percentage is measured against
        #[arg(long, env = "MEMORY_BUDGET_BYTES", default_value = "536870912")]
        memory_budget_bytes: u64,
    },

    /// Drive a synthetic sync run through the scheduler
    Simulate {
        /// Number of batches to process
        #[arg(long, default_value = "200")]
        batches: u64,

        /// Units (product requests) per batch
        #[arg(long, default_value = "25")]
        units_per_batch: u64,

        /// Distinct products in the synthetic catalogue
        #[arg(long, default_value = "500")]
        catalogue_size: u64,

        /// Memory usage percent reported at the first batch
        #[arg(long, default_value = "40")]
        memory_start: f64,

        /// Memory usage percent reported at the last batch
        #[arg(long, default_value = "95")]
        memory_end: f64,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            CacheSystemConfig::from_yaml_file(path)?
        }
        None => CacheSystemConfig::default(),
    };
    config.validate()?;

    info!("Starting erp-cache");
    info!("  Namespace: {}", config.namespace);
    info!(
        "  Large value threshold: {} bytes",
        config.large_value_threshold
    );
    info!("  Eviction ceiling: {} bytes", config.maintenance.max_cache_bytes);

    match args.command {
        Command::Serve {
            metrics_addr,
            health_addr,
            cleanup_interval_seconds,
            memory_budget_bytes,
        } => {
            serve(
                &config,
                metrics_addr,
                health_addr,
                Duration::from_secs(cleanup_interval_seconds.max(1)),
                memory_budget_bytes,
            )
            .await
        }
        Command::Simulate {
            batches,
            units_per_batch,
            catalogue_size,
            memory_start,
            memory_end,
        } => simulate(
            &config,
            batches,
            units_per_batch,
            catalogue_size.max(1),
            memory_start,
            memory_end,
        ),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "hyper_util=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Components
// =============================================================================

struct Components {
    cache: Arc<KeyedCacheStore>,
    records: Arc<PriceRecordCache>,
    scheduler: AdaptiveMaintenanceScheduler,
}

fn build_components(config: &CacheSystemConfig, probe: Arc<dyn MemoryProbe>) -> Result<Components> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fast: Arc<dyn BackingStore> = Arc::new(InMemoryStore::with_clock("fast", clock.clone()));
    let slow: Arc<dyn BackingStore> = Arc::new(InMemoryStore::with_clock("slow", clock.clone()));
    let record_store: Arc<dyn BackingStore> =
        Arc::new(InMemoryStore::with_clock("records", clock.clone()));

    let cache = Arc::new(KeyedCacheStore::new(config, fast, slow, clock.clone())?);
    let records = Arc::new(PriceRecordCache::new(config, record_store, clock)?);
    let scheduler = AdaptiveMaintenanceScheduler::new(config, cache.clone(), probe)?
        .with_records(records.clone());

    Ok(Components {
        cache,
        records,
        scheduler,
    })
}

// =============================================================================
// Serve
// =============================================================================

async fn serve(
    config: &CacheSystemConfig,
    metrics_addr: String,
    health_addr: String,
    cleanup_interval: Duration,
    memory_budget_bytes: u64,
) -> Result<()> {
    let probe: Arc<dyn MemoryProbe> = Arc::new(ProcessMemoryProbe::new(memory_budget_bytes));
    let components = build_components(config, probe.clone())?;
    let scheduler = Arc::new(components.scheduler);
    let cache = components.cache;
    let records = components.records;
    let exporter = Arc::new(CacheMetricsExporter::new()?);

    let shutdown = CancellationToken::new();

    // Health server
    let health_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = run_http_server("Health", &health_addr, health_token, health_response).await
        {
            error!("Health server error: {}", e);
        }
    });

    // Metrics server
    let metrics_token = shutdown.clone();
    let metrics_exporter = exporter.clone();
    tokio::spawn(async move {
        let handler = move |path: &str| metrics_response(&metrics_exporter, path);
        if let Err(e) = run_http_server("Metrics", &metrics_addr, metrics_token, handler).await {
            error!("Metrics server error: {}", e);
        }
    });

    // Ctrl-C
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        signal_token.cancel();
    });

    info!(
        "Running cleanup every {} seconds",
        cleanup_interval.as_secs()
    );
    let mut ticker = tokio::time::interval(cleanup_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let pass_scheduler = scheduler.clone();
        let report = tokio::task::spawn_blocking(move || pass_scheduler.cleanup_pass())
            .await
            .map_err(|e| Error::Internal(format!("Cleanup task failed: {}", e)))?;

        match report {
            Some(report) => {
                exporter.observe_pass(&report);
                if report.failed_actions() > 0 {
                    warn!(
                        pass_id = %report.pass_id,
                        failed = report.failed_actions(),
                        "Scheduled cleanup finished with failures"
                    );
                }
            }
            None => debug!("Previous cleanup still running"),
        }

        exporter.observe_cache(&cache.get_stats());
        exporter.observe_records(&records.get_stats());
        exporter.observe_memory(probe.usage_percent());
    }

    info!("erp-cache shutdown complete");
    Ok(())
}

// =============================================================================
// Simulate
// =============================================================================

fn simulate(
    config: &CacheSystemConfig,
    batches: u64,
    units_per_batch: u64,
    catalogue_size: u64,
    memory_start: f64,
    memory_end: f64,
) -> Result<()> {
    let probe = Arc::new(StaticMemoryProbe::new(memory_start));
    let components = build_components(config, probe.clone())?;
    let cache = components.cache;
    let records = components.records;
    let scheduler = components.scheduler;

    info!(
        batches,
        units_per_batch, catalogue_size, "Starting synthetic sync run"
    );
    scheduler.begin_run();

    let mut periodic = 0u64;
    let mut housekeeping = 0u64;
    let mut skipped = 0u64;

    for batch in 1..=batches {
        let progress = if batches > 1 {
            (batch - 1) as f64 / (batches - 1) as f64
        } else {
            1.0
        };
        probe.set(memory_start + (memory_end - memory_start) * progress);

        for unit in 0..units_per_batch {
            // A small head of popular products is requested far more often
            let id = if unit % 3 == 0 {
                unit % 10
            } else {
                (batch * units_per_batch + unit) % catalogue_size
            };
            let descriptor = RequestDescriptor::with_args("GetArticulosWS", json!({ "id": id }));

            if cache
                .get::<serde_json::Value>(&descriptor, CacheGroup::Product)
                .is_none()
            {
                let payload = json!({
                    "id": id,
                    "name": format!("Product {}", id),
                    "stock": (id * 7) % 100,
                });
                cache.set(&descriptor, CacheGroup::Product, &payload, None);
            }

            let sku = format!("SKU-{}", id);
            let price = 10.0 + (id % 100) as f64 * 0.5;
            records.set(&sku, Some(price), None, None);
        }

        match scheduler.on_unit_processed(batch) {
            UnitOutcome::Periodic(report) => {
                periodic += 1;
                debug!(
                    batch,
                    level = %report.level,
                    actions = report.actions.len(),
                    "Periodic maintenance"
                );
            }
            UnitOutcome::Housekeeping(_) => housekeeping += 1,
            UnitOutcome::Skipped => skipped += 1,
            UnitOutcome::Idle => {}
        }
    }

    if let Some(report) = scheduler.cleanup_pass() {
        info!(
            level = %report.level,
            failed = report.failed_actions(),
            "Final scheduled pass"
        );
    }

    let summary = json!({
        "batches": batches,
        "periodic_passes": periodic,
        "housekeeping_passes": housekeeping,
        "skipped_units": skipped,
        "cache": cache.get_stats(),
        "records": records.get_stats(),
        "maintenance": scheduler.state(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

// =============================================================================
// HTTP Servers
// =============================================================================

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

fn health_response(path: &str) -> Response<Full<Bytes>> {
    match path {
        "/healthz" | "/livez" | "/readyz" => text_response(StatusCode::OK, "ok"),
        _ => text_response(StatusCode::NOT_FOUND, "not found"),
    }
}

fn metrics_response(exporter: &CacheMetricsExporter, path: &str) -> Response<Full<Bytes>> {
    if path != "/metrics" {
        return text_response(StatusCode::NOT_FOUND, "not found");
    }
    match exporter.gather_text() {
        Ok(body) => {
            let mut response = text_response(StatusCode::OK, body);
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable")
        }
    }
}

async fn run_http_server<H>(
    name: &'static str,
    addr: &str,
    shutdown: CancellationToken,
    handler: H,
) -> Result<()>
where
    H: Fn(&str) -> Response<Full<Bytes>> + Clone + Send + Sync + 'static,
{
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid {} server address: {}", name, e)))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind {} server: {}", name, e)))?;

    info!("{} server listening on {}", name, addr);

    loop {
        let (stream, _) = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            accepted = listener.accept() => accepted
                .map_err(|e| Error::Internal(format!("{} server accept error: {}", name, e)))?,
        };

        let io = TokioIo::new(stream);
        let handler = handler.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let response = handler(req.uri().path());
                async move { Ok::<_, Infallible>(response) }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("{} server connection error: {}", name, e);
            }
        });
    }
}
