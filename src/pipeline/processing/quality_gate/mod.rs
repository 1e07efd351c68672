use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

use crate::constants::{
    is_canonical_category, CHAIN, DATE_DERIVED_COLUMNS, ITEM_CATEGORY, MENU_PRICE,
    ITEM_TOTAL_COST, ORDER_TOTAL_COST, PURCHASE_DATE, REQUIRED_COLUMNS, SHARED_COLUMNS,
};
use crate::pipeline::frame::{cell_text, is_missing};
use crate::pipeline::processing::unify::MergedDataset;
use crate::types::Chain;

/// Pipeline stage a finding was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingStage {
    Ingest,
    Normalize,
    Unify,
    Validate,
}

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum QualitySeverity {
    /// Informational, nothing was changed or lost
    Info,
    /// Data was degraded to unknown or passed through unrecognized
    Warning,
    /// An invariant of the merged dataset does not hold
    Error,
}

/// One line of the quality report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub stage: FindingStage,
    pub severity: QualitySeverity,
    /// Source name, or `merged` for checks over the unified set
    pub scope: String,
    /// Operation or check that produced the finding
    pub check: &'static str,
    pub description: String,
    pub column: Option<String>,
    pub count: Option<usize>,
}

impl Finding {
    pub fn new(
        stage: FindingStage,
        severity: QualitySeverity,
        scope: impl Into<String>,
        check: &'static str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            severity,
            scope: scope.into(),
            check,
            description: description.into(),
            column: None,
            count: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn is_problem(&self) -> bool {
        self.severity >= QualitySeverity::Warning
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.scope, self.check, self.description)
    }
}

/// The authoritative record of data-quality issues for one run.
/// Findings keep the order in which the checks ran.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub findings: Vec<Finding>,
}

impl QualityReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            findings: Vec::new(),
        }
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    /// One line per finding, in check order
    pub fn lines(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.to_string()).collect()
    }

    pub fn render(&self) -> String {
        let mut text = self.lines().join("\n");
        text.push('\n');
        text
    }

    pub fn problem_count(&self) -> usize {
        self.findings.iter().filter(|f| f.is_problem()).count()
    }
}

impl Default for QualityReport {
    fn default() -> Self {
        Self::new()
    }
}

/// `12.5%` style share of `total`, one decimal
pub fn percent(count: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", count as f64 / total as f64 * 100.0)
}

pub fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

/// Trait for post-merge quality assessment. Implementations never mutate data.
pub trait QualityGate {
    fn assess(&self, merged: &MergedDataset) -> Vec<Finding>;
}

/// Configuration for the default quality gate
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    pub expected_chains: Vec<Chain>,
    pub expected_columns: Vec<String>,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            expected_chains: Chain::ALL.to_vec(),
            expected_columns: SHARED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Default quality gate covering conservation, unknowns, vocabulary,
/// provenance, date range and the record invariants
pub struct DefaultQualityGate {
    pub config: QualityGateConfig,
}

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self {
            config: QualityGateConfig::default(),
        }
    }

    fn finding(severity: QualitySeverity, check: &'static str, description: String) -> Finding {
        Finding::new(FindingStage::Validate, severity, "merged", check, description)
    }

    fn check_conservation(&self, merged: &MergedDataset) -> Vec<Finding> {
        let expected: usize = merged.ingested_lengths().iter().map(|(_, n)| n).sum();
        let actual = merged.len();
        let breakdown = merged
            .ingested_lengths()
            .iter()
            .map(|(name, n)| format!("{} {}", name, n))
            .collect::<Vec<_>>()
            .join(" + ");

        let mut findings = Vec::new();
        if actual == expected {
            findings.push(
                Self::finding(
                    QualitySeverity::Info,
                    "row_conservation",
                    format!("{} rows = {}", actual, breakdown),
                )
                .with_count(actual),
            );
        } else {
            findings.push(
                Self::finding(
                    QualitySeverity::Error,
                    "row_conservation",
                    format!("{} rows but sources hold {} ({})", actual, expected, breakdown),
                )
                .with_count(actual),
            );
        }

        let columns = merged.columns();
        if columns == self.config.expected_columns.as_slice() {
            findings.push(Self::finding(
                QualitySeverity::Info,
                "columns",
                format!("{} columns in shared layout", columns.len()),
            ));
        } else {
            findings.push(Self::finding(
                QualitySeverity::Error,
                "columns",
                format!(
                    "layout differs from shared columns: [{}]",
                    columns.join(", ")
                ),
            ));
        }
        findings
    }

    fn check_unknowns(&self, merged: &MergedDataset) -> Vec<Finding> {
        let total = merged.len();
        let mut findings = Vec::new();
        for column in merged.columns() {
            let missing = merged.frame().missing_count(column);
            if missing > 0 {
                findings.push(
                    Self::finding(
                        QualitySeverity::Warning,
                        "unknown_values",
                        format!("{}: {} unknown ({})", column, missing, percent(missing, total)),
                    )
                    .with_column(column.clone())
                    .with_count(missing),
                );
            }
        }
        if findings.is_empty() {
            findings.push(Self::finding(
                QualitySeverity::Info,
                "unknown_values",
                "no unknown values in any column".to_string(),
            ));
        }
        findings
    }

    fn check_categories(&self, merged: &MergedDataset) -> Vec<Finding> {
        let mut observed: BTreeMap<String, usize> = BTreeMap::new();
        for record in merged.frame().records() {
            if let Some(category) = cell_text(record.get(ITEM_CATEGORY)) {
                *observed.entry(category.into_owned()).or_default() += 1;
            }
        }

        let listing = observed.keys().cloned().collect::<Vec<_>>().join(", ");
        let mut findings = vec![Self::finding(
            QualitySeverity::Info,
            "categories",
            format!("{} distinct item_category values: [{}]", observed.len(), listing),
        )
        .with_column(ITEM_CATEGORY)
        .with_count(observed.len())];

        for (category, rows) in observed.iter().filter(|(c, _)| !is_canonical_category(c)) {
            findings.push(
                Self::finding(
                    QualitySeverity::Warning,
                    "categories",
                    format!(
                        "non-canonical category '{}' in {} {}",
                        category,
                        rows,
                        plural(*rows, "row", "rows")
                    ),
                )
                .with_column(ITEM_CATEGORY)
                .with_count(*rows),
            );
        }
        findings
    }

    fn check_chains(&self, merged: &MergedDataset) -> Vec<Finding> {
        let observed: BTreeSet<String> = merged
            .frame()
            .records()
            .iter()
            .filter_map(|r| cell_text(r.get(CHAIN)).map(|c| c.into_owned()))
            .collect();
        let expected: BTreeSet<String> = self
            .config
            .expected_chains
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();

        let listing = observed.iter().cloned().collect::<Vec<_>>().join(", ");
        if observed == expected {
            vec![Self::finding(
                QualitySeverity::Info,
                "chains",
                format!("chain values: [{}]", listing),
            )
            .with_column(CHAIN)]
        } else {
            let missing: Vec<_> = expected.difference(&observed).cloned().collect();
            let unexpected: Vec<_> = observed.difference(&expected).cloned().collect();
            vec![Self::finding(
                QualitySeverity::Error,
                "chains",
                format!(
                    "chain values: [{}]; missing [{}], unexpected [{}]",
                    listing,
                    missing.join(", "),
                    unexpected.join(", ")
                ),
            )
            .with_column(CHAIN)]
        }
    }

    fn check_date_range(&self, merged: &MergedDataset) -> Vec<Finding> {
        let dates: Vec<NaiveDate> = merged
            .frame()
            .records()
            .iter()
            .filter_map(|r| cell_text(r.get(PURCHASE_DATE)))
            .filter_map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
            .collect();

        let description = match (dates.iter().min(), dates.iter().max()) {
            (Some(min), Some(max)) => format!(
                "purchase_date range {} to {} over {} known {}",
                min,
                max,
                dates.len(),
                plural(dates.len(), "date", "dates")
            ),
            _ => "no known purchase_date values".to_string(),
        };
        let severity = if dates.is_empty() && !merged.is_empty() {
            QualitySeverity::Warning
        } else {
            QualitySeverity::Info
        };
        vec![Self::finding(severity, "date_range", description)
            .with_column(PURCHASE_DATE)
            .with_count(dates.len())]
    }

    fn check_required_fields(&self, merged: &MergedDataset) -> Vec<Finding> {
        let mut findings = Vec::new();
        for column in REQUIRED_COLUMNS {
            let violations = merged
                .frame()
                .records()
                .iter()
                .filter(|r| {
                    let value = r.get(column);
                    if is_missing(value) {
                        return true;
                    }
                    match column {
                        CHAIN => cell_text(value).and_then(|c| Chain::parse(&c)).is_none(),
                        ORDER_TOTAL_COST => !matches!(value, Some(Value::Number(_))),
                        _ => false,
                    }
                })
                .count();
            if violations > 0 {
                findings.push(
                    Self::finding(
                        QualitySeverity::Error,
                        "required_fields",
                        format!(
                            "{} {} without a well-typed {}",
                            violations,
                            plural(violations, "row", "rows"),
                            column
                        ),
                    )
                    .with_column(column)
                    .with_count(violations),
                );
            }
        }
        if findings.is_empty() {
            findings.push(Self::finding(
                QualitySeverity::Info,
                "required_fields",
                format!("all rows carry {}", REQUIRED_COLUMNS.join(", ")),
            ));
        }
        findings
    }

    fn check_date_consistency(&self, merged: &MergedDataset) -> Vec<Finding> {
        let inconsistent = merged
            .frame()
            .records()
            .iter()
            .filter(|r| {
                let date_known = !is_missing(r.get(PURCHASE_DATE));
                DATE_DERIVED_COLUMNS
                    .iter()
                    .any(|c| is_missing(r.get(*c)) == date_known)
            })
            .count();

        if inconsistent == 0 {
            vec![Self::finding(
                QualitySeverity::Info,
                "date_consistency",
                "derived date fields agree with purchase_date on every row".to_string(),
            )]
        } else {
            vec![Self::finding(
                QualitySeverity::Error,
                "date_consistency",
                format!(
                    "{} {} with derived date fields out of step with purchase_date",
                    inconsistent,
                    plural(inconsistent, "row", "rows")
                ),
            )
            .with_count(inconsistent)]
        }
    }

    fn check_prices(&self, merged: &MergedDataset) -> Vec<Finding> {
        let mut findings = Vec::new();
        for column in [MENU_PRICE, ITEM_TOTAL_COST, ORDER_TOTAL_COST] {
            let negative = merged
                .frame()
                .records()
                .iter()
                .filter_map(|r| r.get(column).and_then(Value::as_f64))
                .filter(|v| *v < 0.0 || !v.is_finite())
                .count();
            if negative > 0 {
                findings.push(
                    Self::finding(
                        QualitySeverity::Warning,
                        "prices",
                        format!(
                            "{}: {} negative or non-finite {}",
                            column,
                            negative,
                            plural(negative, "value", "values")
                        ),
                    )
                    .with_column(column)
                    .with_count(negative),
                );
            }
        }
        findings
    }
}

impl Default for DefaultQualityGate {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityGate for DefaultQualityGate {
    fn assess(&self, merged: &MergedDataset) -> Vec<Finding> {
        let mut findings = Vec::new();
        findings.extend(self.check_conservation(merged));
        findings.extend(self.check_unknowns(merged));
        findings.extend(self.check_categories(merged));
        findings.extend(self.check_chains(merged));
        findings.extend(self.check_date_range(merged));
        findings.extend(self.check_required_fields(merged));
        findings.extend(self.check_date_consistency(merged));
        findings.extend(self.check_prices(merged));
        findings
    }
}
