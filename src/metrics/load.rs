//! Load Phase Metrics

use crate::metrics::timing::{time_operation, TimingGuard};
use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::pipeline::storage::LoadSummary;

/// Metrics collection for the Load phase
pub struct LoadMetrics;

impl LoadMetrics {
    pub fn start_timer() -> TimingGuard {
        time_operation(phase_metric!(histogram, "load", "duration_seconds"))
    }

    pub fn record_load(summary: &LoadSummary) {
        for (table, rows) in [
            ("orders", summary.orders),
            ("restaurants", summary.restaurants),
            ("products", summary.products),
            ("customers", summary.customers),
        ] {
            ::metrics::counter!(phase_metric!(counter, "load", "rows"), "table" => table)
                .increment(rows as u64);
        }
    }
}

impl PhaseMetrics for LoadMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "load", "rows"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "load", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "load"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "load", "rows"),
                metric_type: MetricType::Counter,
                help: "Rows written to the tabular store per table",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "load", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent loading the tabular store",
                labels: vec![],
            },
        ]
    }
}
