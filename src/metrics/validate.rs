//! Validate Phase Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::pipeline::processing::quality_gate::{Finding, QualitySeverity};

/// Metrics collection for the Validate phase
pub struct ValidateMetrics;

impl ValidateMetrics {
    /// Count findings by severity
    pub fn record_findings(findings: &[Finding]) {
        for finding in findings {
            let severity = match finding.severity {
                QualitySeverity::Info => "info",
                QualitySeverity::Warning => "warning",
                QualitySeverity::Error => "error",
            };
            ::metrics::counter!(phase_metric!(counter, "validate", "findings"), "severity" => severity)
                .increment(1);
        }
    }
}

impl PhaseMetrics for ValidateMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "validate", "findings"));
    }

    fn phase_name() -> &'static str {
        "validate"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![MetricDoc {
            name: phase_metric!(counter, "validate", "findings"),
            metric_type: MetricType::Counter,
            help: "Quality report findings by severity",
            labels: vec!["severity"],
        }]
    }
}
