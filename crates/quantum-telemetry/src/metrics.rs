//! Prometheus metrics for the upgrade path.
//!
//! All metrics follow the naming convention: `qc_<subsystem>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SIGNALLING METRICS
    // =========================================================================

    /// Accepted version signals
    pub static ref UPGRADE_SIGNALS: Counter = Counter::new(
        "qc_upgrade_signals_total",
        "Total number of accepted version signals"
    ).expect("metric creation failed");

    /// Rejected signal or try-upgrade transactions
    pub static ref UPGRADE_REJECTIONS: CounterVec = CounterVec::new(
        Opts::new("qc_upgrade_rejections_total", "Rejected signalling transactions"),
        &["reason"]  // pending, invalid_version, unknown_validator
    ).expect("metric creation failed");

    /// Pending upgrades scheduled after reaching quorum
    pub static ref PENDING_UPGRADES: Counter = Counter::new(
        "qc_upgrade_pending_total",
        "Total number of upgrades scheduled by quorum"
    ).expect("metric creation failed");

    // =========================================================================
    // CUTOVER METRICS
    // =========================================================================

    /// Completed cutovers
    pub static ref CUTOVERS: Counter = Counter::new(
        "qc_upgrade_cutovers_total",
        "Total number of completed app version cutovers"
    ).expect("metric creation failed");

    /// Currently active app version
    pub static ref ACTIVE_APP_VERSION: Gauge = Gauge::new(
        "qc_upgrade_active_app_version",
        "App version the multiplexer is dispatching to"
    ).expect("metric creation failed");

    /// Migration failures (each one halts the node)
    pub static ref MIGRATION_FAILURES: Counter = Counter::new(
        "qc_upgrade_migration_failures_total",
        "Total number of failed migrations"
    ).expect("metric creation failed");

    /// Time spent running migrations during a cutover
    pub static ref MIGRATION_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qc_upgrade_migration_duration_seconds",
            "Time spent running migrations during cutover"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    /// 1 while the multiplexer is halted
    pub static ref MULTIPLEXER_HALTED: Gauge = Gauge::new(
        "qc_upgrade_multiplexer_halted",
        "Whether the multiplexer has halted on a fatal error"
    ).expect("metric creation failed");
}

/// Handle proving metrics were registered.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all upgrade metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(UPGRADE_SIGNALS.clone()),
        Box::new(UPGRADE_REJECTIONS.clone()),
        Box::new(PENDING_UPGRADES.clone()),
        Box::new(CUTOVERS.clone()),
        Box::new(ACTIVE_APP_VERSION.clone()),
        Box::new(MIGRATION_FAILURES.clone()),
        Box::new(MIGRATION_DURATION.clone()),
        Box::new(MULTIPLEXER_HALTED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
