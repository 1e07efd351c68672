//! Normalize Phase Metrics
//!
//! Rows normalized per chain and the value-level repairs applied to them.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::types::Chain;

/// Metrics collection for the Normalize phase
pub struct NormalizeMetrics;

pub fn rows_normalized(chain: Chain, rows: usize) {
    ::metrics::counter!(phase_metric!(counter, "normalize", "rows"), "chain" => chain.as_str())
        .increment(rows as u64);
}

pub fn corrupt_dates(chain: Chain, count: usize) {
    ::metrics::counter!(phase_metric!(counter, "normalize", "corrupt_dates"), "chain" => chain.as_str())
        .increment(count as u64);
}

pub fn unparseable_values(chain: Chain, count: usize) {
    ::metrics::counter!(phase_metric!(counter, "normalize", "unparseable_values"), "chain" => chain.as_str())
        .increment(count as u64);
}

pub fn unmapped_categories(chain: Chain, count: usize) {
    ::metrics::counter!(phase_metric!(counter, "normalize", "unmapped_categories"), "chain" => chain.as_str())
        .increment(count as u64);
}

pub fn source_failed(chain: Chain) {
    ::metrics::counter!(phase_metric!(counter, "normalize", "source_failures"), "chain" => chain.as_str())
        .increment(1);
}

impl PhaseMetrics for NormalizeMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "rows"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "corrupt_dates"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "unparseable_values"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "unmapped_categories"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "source_failures"));
    }

    fn phase_name() -> &'static str {
        "normalize"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "normalize", "rows"),
                metric_type: MetricType::Counter,
                help: "Rows brought into the shared vocabulary",
                labels: vec!["chain"],
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "corrupt_dates"),
                metric_type: MetricType::Counter,
                help: "Dates carrying the sentinel year, reset to unknown",
                labels: vec!["chain"],
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "unparseable_values"),
                metric_type: MetricType::Counter,
                help: "Dates, times, numbers and flags that could not be parsed",
                labels: vec!["chain"],
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "unmapped_categories"),
                metric_type: MetricType::Counter,
                help: "Rows whose category passed through outside the canonical set",
                labels: vec!["chain"],
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "source_failures"),
                metric_type: MetricType::Counter,
                help: "Sources rejected for a structural problem",
                labels: vec!["chain"],
            },
        ]
    }
}
