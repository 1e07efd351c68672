//! Centralized metrics infrastructure for the ETL pipeline
//!
//! Each pipeline phase defines its own metrics in a dedicated submodule.
//! A Prometheus recorder is installed without an HTTP listener; the batch run
//! renders the snapshot to a file once it finishes.

pub mod load;
pub mod normalize;
pub mod registry;
pub mod timing;
pub mod unify;
pub mod validate;

pub use load::LoadMetrics;
pub use normalize::NormalizeMetrics;
pub use unify::UnifyMetrics;
pub use validate::ValidateMetrics;

use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

use crate::error::Result;

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Initialize the global metrics infrastructure
///
/// Idempotent. Installs the Prometheus recorder, stores the handle for
/// in-process rendering and registers all phase metrics.
pub fn init_metrics() {
    INIT.call_once(|| {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        match builder.install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("METRICS: handle already stored");
                }
                registry::register_all_metrics();
                info!("Prometheus recorder installed");
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Render the current snapshot in Prometheus text format
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Write the snapshot to `path`. Returns false when no recorder is installed.
pub fn write_snapshot(path: &Path) -> Result<bool> {
    match render() {
        Some(text) => {
            std::fs::write(path, text)?;
            info!("Wrote metrics snapshot to {}", path.display());
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Trait for phase-specific metrics collections
///
/// Each pipeline phase implements this trait to provide:
/// - Metric registration at startup
/// - Consistent naming conventions
/// - Documentation of what each metric measures
pub trait PhaseMetrics {
    /// Register all metrics for this phase
    fn register_metrics();

    /// Get the phase name for prefixing metrics
    fn phase_name() -> &'static str;

    /// Get documentation for all metrics in this phase
    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// Macro to create phase-specific metric names with consistent naming
///
/// etl_{phase}_{metric_name}_total for counters, etl_{phase}_{metric_name}
/// for histograms
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

/// Bump a heartbeat counter so even an empty run leaves a snapshot
pub fn bump_run_heartbeat() {
    ::metrics::counter!("etl_runs_heartbeat_total").increment(1);
}
