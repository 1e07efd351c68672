pub mod normalizers;
pub mod registry;
pub mod repairs;

use tracing::{debug, info, warn};

use crate::config::DatePolicy;
use crate::constants::{BASE_SOURCE_COLUMNS, IDENTIFIER_COLUMNS};
use crate::error::Result;
use crate::pipeline::frame::Frame;
use crate::pipeline::processing::quality_gate::{
    percent, plural, Finding, FindingStage, QualitySeverity,
};
use normalizers::SourceProfile;
use repairs::{
    AuxiliaryDerivation, ColumnDecision, ColumnRepair, DateRepair, VocabularyRepair,
};

pub use normalizers::{MetricsNormalizer, SourceNormalizer};
pub use registry::NormalizationRegistry;

/// A source frame in the shared vocabulary, plus everything the repairs
/// changed along the way
#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub frame: Frame,
    pub findings: Vec<Finding>,
    pub renamed: Vec<(String, String)>,
    pub column_decisions: Vec<ColumnDecision>,
    pub dates: DateRepair,
    pub identifiers: ColumnRepair,
    pub amounts: ColumnRepair,
    pub vocabulary: VocabularyRepair,
    pub auxiliary: AuxiliaryDerivation,
}

/// Run the full repair sequence for one source.
///
/// Structural problems (a missing expected column) fail the source; every
/// value-level problem is degraded to unknown and reported instead.
pub fn normalize_source(
    mut frame: Frame,
    profile: &SourceProfile,
    policy: &DatePolicy,
) -> Result<NormalizeOutcome> {
    let source = profile.chain.as_str();
    debug!(source, rows = frame.len(), "Normalizing source");

    let renamed = repairs::canonicalize_columns(&mut frame);

    let expected: Vec<&str> = BASE_SOURCE_COLUMNS
        .iter()
        .chain(profile.extra_columns.iter())
        .copied()
        .collect();
    repairs::require_columns(&frame, &expected)?;

    let column_decisions = repairs::drop_unusable_columns(&mut frame, profile.droppable_columns);
    repairs::tag_chain(&mut frame, profile.chain);
    let dates = repairs::repair_dates(&mut frame, policy);
    let identifiers = repairs::repair_identifiers(&mut frame, &IDENTIFIER_COLUMNS);
    let amounts = repairs::repair_amounts(&mut frame);
    let vocabulary = repairs::normalize_vocabulary(&mut frame, profile.category_map);
    let auxiliary = repairs::derive_auxiliary(&mut frame);

    let mut outcome = NormalizeOutcome {
        frame,
        findings: Vec::new(),
        renamed,
        column_decisions,
        dates,
        identifiers,
        amounts,
        vocabulary,
        auxiliary,
    };
    outcome.findings = describe(&outcome, policy);

    for finding in &outcome.findings {
        if finding.is_problem() {
            warn!(source, check = finding.check, "{}", finding.description);
        } else {
            info!(source, check = finding.check, "{}", finding.description);
        }
    }
    Ok(outcome)
}

fn describe(outcome: &NormalizeOutcome, policy: &DatePolicy) -> Vec<Finding> {
    let scope = outcome.frame.name().to_string();
    let rows = outcome.frame.len();
    let finding = |severity, check, description: String| {
        Finding::new(FindingStage::Normalize, severity, scope.clone(), check, description)
    };
    let mut findings = Vec::new();

    if !outcome.renamed.is_empty() {
        let pairs = outcome
            .renamed
            .iter()
            .map(|(from, to)| format!("{} -> {}", from, to))
            .collect::<Vec<_>>()
            .join(", ");
        findings.push(finding(
            QualitySeverity::Info,
            "canonicalize_columns",
            format!(
                "renamed {} raw {}: {}",
                outcome.renamed.len(),
                plural(outcome.renamed.len(), "column", "columns"),
                pairs
            ),
        ));
    }

    for decision in &outcome.column_decisions {
        match decision {
            ColumnDecision::Dropped { column, rows } => findings.push(
                finding(
                    QualitySeverity::Warning,
                    "drop_unusable_columns",
                    format!("dropped {} (100% missing across {} rows)", column, rows),
                )
                .with_column(column.clone())
                .with_count(*rows),
            ),
            ColumnDecision::Kept { column, present, rows } => findings.push(
                finding(
                    QualitySeverity::Info,
                    "drop_unusable_columns",
                    format!("kept {} ({} of {} rows carry a value)", column, present, rows),
                )
                .with_column(column.clone())
                .with_count(*present),
            ),
            ColumnDecision::Absent { .. } => {}
        }
    }

    findings.push(finding(
        QualitySeverity::Info,
        "tag_chain",
        format!("tagged {} {} with chain {}", rows, plural(rows, "row", "rows"), scope),
    ));

    let dates = &outcome.dates;
    let corrupt_severity = if dates.corrupt > 0 {
        QualitySeverity::Warning
    } else {
        QualitySeverity::Info
    };
    findings.push(
        finding(
            corrupt_severity,
            "repair_dates",
            format!(
                "{} corrupt {} ({}) reset to unknown",
                dates.corrupt,
                plural(dates.corrupt, "date", "dates"),
                percent(dates.corrupt, rows)
            ),
        )
        .with_column(crate::constants::PURCHASE_DATE)
        .with_count(dates.corrupt),
    );
    if dates.unparseable > 0 {
        findings.push(
            finding(
                QualitySeverity::Warning,
                "repair_dates",
                format!(
                    "{} unparseable {} ({}) reset to unknown",
                    dates.unparseable,
                    plural(dates.unparseable, "date", "dates"),
                    percent(dates.unparseable, rows)
                ),
            )
            .with_column(crate::constants::PURCHASE_DATE)
            .with_count(dates.unparseable),
        );
    }
    if dates.implausible > 0 {
        let action = if dates.implausible_reset {
            "reset to unknown"
        } else {
            "kept and flagged"
        };
        findings.push(
            finding(
                QualitySeverity::Warning,
                "repair_dates",
                format!(
                    "{} implausible {} outside {}-{} ({}) {}",
                    dates.implausible,
                    plural(dates.implausible, "date", "dates"),
                    policy.plausible_min_year,
                    policy.plausible_max_year,
                    percent(dates.implausible, rows),
                    action
                ),
            )
            .with_column(crate::constants::PURCHASE_DATE)
            .with_count(dates.implausible),
        );
    }
    if dates.unparseable_times > 0 {
        findings.push(
            finding(
                QualitySeverity::Warning,
                "repair_dates",
                format!(
                    "{} unparseable {} ({}) reset to unknown",
                    dates.unparseable_times,
                    plural(dates.unparseable_times, "time", "times"),
                    percent(dates.unparseable_times, rows)
                ),
            )
            .with_column(crate::constants::PURCHASE_TIME)
            .with_count(dates.unparseable_times),
        );
    }

    for (check, repair) in [
        ("repair_identifiers", &outcome.identifiers),
        ("repair_amounts", &outcome.amounts),
    ] {
        for (column, count) in &repair.invalid {
            findings.push(
                finding(
                    QualitySeverity::Warning,
                    check,
                    format!(
                        "{} non-numeric {} {} ({}) reset to unknown",
                        count,
                        column,
                        plural(*count, "value", "values"),
                        percent(*count, rows)
                    ),
                )
                .with_column(column.clone())
                .with_count(*count),
            );
        }
    }

    let vocabulary = &outcome.vocabulary;
    let categories = vocabulary
        .categories
        .keys()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    findings.push(
        finding(
            QualitySeverity::Info,
            "normalize_vocabulary",
            format!(
                "remapped {} {}; categories after mapping: [{}]",
                vocabulary.remapped,
                plural(vocabulary.remapped, "row", "rows"),
                categories
            ),
        )
        .with_column(crate::constants::ITEM_CATEGORY)
        .with_count(vocabulary.categories.len()),
    );
    for (value, count) in &vocabulary.unmapped {
        findings.push(
            finding(
                QualitySeverity::Warning,
                "normalize_vocabulary",
                format!(
                    "unmapped category '{}' passed through unchanged ({} {})",
                    value,
                    count,
                    plural(*count, "row", "rows")
                ),
            )
            .with_column(crate::constants::ITEM_CATEGORY)
            .with_count(*count),
        );
    }

    let auxiliary = &outcome.auxiliary;
    findings.push(finding(
        QualitySeverity::Info,
        "derive_auxiliary",
        format!(
            "derived month, year and season for {} of {} rows; AM/PM for {}",
            auxiliary.dated_rows, rows, auxiliary.timed_rows
        ),
    ));
    for (column, count) in &auxiliary.unrecognized_flags.invalid {
        findings.push(
            finding(
                QualitySeverity::Warning,
                "derive_auxiliary",
                format!(
                    "{} unrecognized {} {} ({}) reset to unknown",
                    count,
                    column,
                    plural(*count, "code", "codes"),
                    percent(*count, rows)
                ),
            )
            .with_column(column.clone())
            .with_count(*count),
        );
    }

    findings
}
