//! Metrics registry for coordinating phase-specific metrics

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Register all metrics from all phases, warning on name conflicts
pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::normalize::NormalizeMetrics>(&mut all_metrics);
    register_phase_metrics::<super::unify::UnifyMetrics>(&mut all_metrics);
    register_phase_metrics::<super::validate::ValidateMetrics>(&mut all_metrics);
    register_phase_metrics::<super::load::LoadMetrics>(&mut all_metrics);

    info!(
        "Registered {} total metrics across all phases",
        all_metrics.len()
    );
    for doc in all_metrics.values() {
        debug!(
            phase = extract_phase_from_metric_name(doc.name),
            labels = ?doc.labels,
            "  - {} ({:?}): {}",
            doc.name,
            doc.metric_type,
            doc.help
        );
    }
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<String, MetricDoc>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' registered again by phase '{}'",
                doc.name, phase_name
            );
        } else {
            all_metrics.insert(doc.name.to_string(), doc);
        }
    }
}

/// Extract phase name from metric name (e.g., "etl_load_rows_total" -> "load")
fn extract_phase_from_metric_name(metric_name: &str) -> &str {
    if let Some(stripped) = metric_name.strip_prefix("etl_") {
        if let Some(next_underscore) = stripped.find('_') {
            return &stripped[..next_underscore];
        }
    }
    "unknown"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{LoadMetrics, NormalizeMetrics, UnifyMetrics, ValidateMetrics};

    #[test]
    fn test_extract_phase_from_metric_name() {
        assert_eq!(extract_phase_from_metric_name("etl_normalize_rows_total"), "normalize");
        assert_eq!(extract_phase_from_metric_name("etl_load_duration_seconds"), "load");
        assert_eq!(extract_phase_from_metric_name("invalid_metric_name"), "unknown");
    }

    #[test]
    fn test_phase_names_prefix_their_metrics() {
        let phases = [
            (NormalizeMetrics::phase_name(), NormalizeMetrics::metrics_documentation()),
            (UnifyMetrics::phase_name(), UnifyMetrics::metrics_documentation()),
            (ValidateMetrics::phase_name(), ValidateMetrics::metrics_documentation()),
            (LoadMetrics::phase_name(), LoadMetrics::metrics_documentation()),
        ];
        for (phase, docs) in phases {
            for doc in docs {
                assert_eq!(extract_phase_from_metric_name(doc.name), phase);
            }
        }
    }
}
