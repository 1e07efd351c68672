//! Unify Phase Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

/// Metrics collection for the Unify phase
pub struct UnifyMetrics;

impl UnifyMetrics {
    pub fn record_unified(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "unify", "rows")).increment(rows as u64);
    }

    pub fn record_schema_error() {
        ::metrics::counter!(phase_metric!(counter, "unify", "schema_errors")).increment(1);
    }
}

impl PhaseMetrics for UnifyMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "unify", "rows"));
        let _ = ::metrics::counter!(phase_metric!(counter, "unify", "schema_errors"));
    }

    fn phase_name() -> &'static str {
        "unify"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "unify", "rows"),
                metric_type: MetricType::Counter,
                help: "Rows stacked into the merged dataset",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "unify", "schema_errors"),
                metric_type: MetricType::Counter,
                help: "Unify attempts that failed on a missing or duplicate shared column",
                labels: vec![],
            },
        ]
    }
}
