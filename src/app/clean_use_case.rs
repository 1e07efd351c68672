use tracing::{info, info_span};

use crate::app::ports::CleanOutputPort;
use crate::constants::SHARED_COLUMNS;
use crate::error::Result;
use crate::metrics::{UnifyMetrics, ValidateMetrics};
use crate::pipeline::ingestion::SourceExtract;
use crate::pipeline::processing::normalize::NormalizationRegistry;
use crate::pipeline::processing::quality_gate::{
    plural, Finding, FindingStage, QualityGate, QualityReport, QualitySeverity,
};
use crate::pipeline::processing::unify::{project, unify, MergedDataset};
use crate::types::Chain;

/// Result of one clean run
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub merged: MergedDataset,
    pub report: QualityReport,
}

/// Use case for turning the two raw extracts into the merged dataset and
/// its quality report
pub struct CleanUseCase {
    registry: NormalizationRegistry,
    gate: Box<dyn QualityGate>,
    output: Box<dyn CleanOutputPort>,
}

impl CleanUseCase {
    pub fn new(
        registry: NormalizationRegistry,
        gate: Box<dyn QualityGate>,
        output: Box<dyn CleanOutputPort>,
    ) -> Self {
        Self {
            registry,
            gate,
            output,
        }
    }

    fn ingest_finding(chain: Chain, extract: &SourceExtract) -> Finding {
        let fingerprint: String = extract.sha256.chars().take(12).collect();
        Finding::new(
            FindingStage::Ingest,
            QualitySeverity::Info,
            chain.as_str(),
            "read",
            format!(
                "{} {}, {} columns from {} (sha256 {})",
                extract.frame.len(),
                plural(extract.frame.len(), "row", "rows"),
                extract.frame.columns().len(),
                extract.path.display(),
                fingerprint
            ),
        )
        .with_count(extract.frame.len())
    }

    fn repair_finding(chain: Chain, extract: &SourceExtract) -> Option<Finding> {
        let repairs = &extract.repairs;
        if repairs.is_clean() {
            return None;
        }
        let mut parts = Vec::new();
        if repairs.undecodable_cells > 0 {
            parts.push(format!(
                "{} undecodable {} decoded with replacement characters",
                repairs.undecodable_cells,
                plural(repairs.undecodable_cells, "cell", "cells")
            ));
        }
        if repairs.short_rows > 0 {
            parts.push(format!(
                "{} short {} padded with unknown values",
                repairs.short_rows,
                plural(repairs.short_rows, "row", "rows")
            ));
        }
        if repairs.long_rows > 0 {
            parts.push(format!(
                "{} long {} truncated to the header",
                repairs.long_rows,
                plural(repairs.long_rows, "row", "rows")
            ));
        }
        Some(
            Finding::new(
                FindingStage::Ingest,
                QualitySeverity::Warning,
                chain.as_str(),
                "read",
                parts.join("; "),
            )
            .with_count(repairs.undecodable_cells + repairs.short_rows + repairs.long_rows),
        )
    }

    /// Normalize both sources, unify them A before B, validate, and write
    /// every output through the port. Structural errors abort the run.
    pub fn run(&self, abc: SourceExtract, xyz: SourceExtract) -> Result<CleanOutcome> {
        let mut report = QualityReport::new();
        let run_id = report.run_id;

        let mut normalized = Vec::with_capacity(2);
        let mut ingested_lengths = Vec::with_capacity(2);
        for (chain, extract) in [(Chain::Abc, abc), (Chain::Xyz, xyz)] {
            let _span = info_span!("normalize", run_id = %run_id, chain = %chain).entered();
            report.push(Self::ingest_finding(chain, &extract));
            if let Some(finding) = Self::repair_finding(chain, &extract) {
                report.push(finding);
            }
            ingested_lengths.push((chain.as_str().to_string(), extract.frame.len()));

            let outcome = self.registry.normalize(chain, extract.frame)?;
            report.extend(outcome.findings);

            let projected = project(&outcome.frame, &SHARED_COLUMNS)?;
            self.output.write_normalized(chain, &projected)?;
            normalized.push(outcome.frame);
        }

        let unified = {
            let _span = info_span!("unify", run_id = %run_id).entered();
            match unify(&normalized[0], &normalized[1], &SHARED_COLUMNS) {
                Ok(mut unified) => {
                    unified.merged = unified.merged.with_ingested_lengths(ingested_lengths);
                    unified
                }
                Err(e) => {
                    UnifyMetrics::record_schema_error();
                    return Err(e);
                }
            }
        };
        UnifyMetrics::record_unified(unified.merged.len());
        report.extend(unified.findings);

        let validation = {
            let _span = info_span!("validate", run_id = %run_id).entered();
            self.gate.assess(&unified.merged)
        };
        ValidateMetrics::record_findings(&validation);
        report.extend(validation);

        self.output.write_merged(unified.merged.frame())?;
        self.output.write_quality_report(&report)?;

        info!(
            run_id = %run_id,
            rows = unified.merged.len(),
            findings = report.findings.len(),
            problems = report.problem_count(),
            "Clean stage complete"
        );

        Ok(CleanOutcome {
            merged: unified.merged,
            report,
        })
    }
}
