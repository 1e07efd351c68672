use serde_json::Value;
use std::collections::HashSet;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::pipeline::frame::{Frame, Record};
use crate::pipeline::processing::quality_gate::{Finding, FindingStage, QualitySeverity};
use crate::types::NormalizedRecord;

/// Both sources stacked in the shared layout, first source first
#[derive(Debug, Clone)]
pub struct MergedDataset {
    frame: Frame,
    source_lengths: Vec<(String, usize)>,
    ingested_lengths: Option<Vec<(String, usize)>>,
}

impl MergedDataset {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn columns(&self) -> &[String] {
        self.frame.columns()
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Row count each source contributed, in stacking order
    pub fn source_lengths(&self) -> &[(String, usize)] {
        &self.source_lengths
    }

    /// Record the raw row counts read from disk, before any normalization
    pub fn with_ingested_lengths(mut self, lengths: Vec<(String, usize)>) -> Self {
        self.ingested_lengths = Some(lengths);
        self
    }

    /// Raw row counts per source when known, else the contributed counts
    pub fn ingested_lengths(&self) -> &[(String, usize)] {
        self.ingested_lengths.as_deref().unwrap_or(&self.source_lengths)
    }

    /// Typed view of the merged rows
    pub fn records(&self) -> Result<Vec<NormalizedRecord>> {
        self.frame
            .records()
            .iter()
            .map(|r| Ok(serde_json::from_value(Value::Object(r.clone()))?))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct UnifyOutcome {
    pub merged: MergedDataset,
    pub findings: Vec<Finding>,
}

/// Restrict a normalized source to the shared columns, in shared order.
/// Fails with `SchemaMismatch` if the source lacks one of them.
pub fn project(source: &Frame, shared_columns: &[&str]) -> Result<Frame> {
    let mut seen = HashSet::new();
    for column in shared_columns {
        if !seen.insert(*column) {
            return Err(EtlError::DuplicateColumn(column.to_string()));
        }
        if !source.has_column(column) {
            return Err(EtlError::SchemaMismatch {
                source_name: source.name().to_string(),
                column: column.to_string(),
            });
        }
    }

    let records = source
        .records()
        .iter()
        .map(|record| {
            shared_columns
                .iter()
                .map(|c| (c.to_string(), record.get(*c).cloned().unwrap_or(Value::Null)))
                .collect::<Record>()
        })
        .collect();

    Ok(Frame::from_records(
        source.name(),
        shared_columns.iter().map(|c| c.to_string()).collect(),
        records,
    ))
}

/// Project both sources onto the shared layout and stack them, all of
/// `source_a` before `source_b`. Rows are never dropped or deduplicated.
pub fn unify(source_a: &Frame, source_b: &Frame, shared_columns: &[&str]) -> Result<UnifyOutcome> {
    let projected_a = project(source_a, shared_columns)?;
    let projected_b = project(source_b, shared_columns)?;

    let mut findings = Vec::new();
    for (source, projected) in [(source_a, &projected_a), (source_b, &projected_b)] {
        let excluded: Vec<&str> = source
            .columns()
            .iter()
            .map(String::as_str)
            .filter(|c| !shared_columns.contains(c))
            .collect();
        if !excluded.is_empty() {
            findings.push(
                Finding::new(
                    FindingStage::Unify,
                    QualitySeverity::Info,
                    source.name(),
                    "project",
                    format!("excluded source-only columns: [{}]", excluded.join(", ")),
                )
                .with_count(excluded.len()),
            );
        }
        findings.push(
            Finding::new(
                FindingStage::Unify,
                QualitySeverity::Info,
                source.name(),
                "unify",
                format!("contributed {} rows", projected.len()),
            )
            .with_count(projected.len()),
        );
    }

    let source_lengths = vec![
        (projected_a.name().to_string(), projected_a.len()),
        (projected_b.name().to_string(), projected_b.len()),
    ];
    let columns = projected_a.columns().to_vec();
    let mut records = projected_a.into_records();
    records.extend(projected_b.into_records());

    info!(
        rows = records.len(),
        columns = columns.len(),
        "Unified sources into the shared layout"
    );

    Ok(UnifyOutcome {
        merged: MergedDataset {
            frame: Frame::from_records("merged", columns, records),
            source_lengths,
            ingested_lengths: None,
        },
        findings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(name: &str, columns: &[&str], rows: &[&[Value]]) -> Frame {
        let mut frame = Frame::new(name, columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            let record: Record = columns
                .iter()
                .zip(row.iter())
                .map(|(c, v)| (c.to_string(), v.clone()))
                .collect();
            frame.push(record);
        }
        frame
    }

    #[test]
    fn test_project_reorders_and_excludes() {
        let source = frame("XYZ", &["b", "extra", "a"], &[&[json!(2), json!("x"), json!(1)]]);
        let projected = project(&source, &["a", "b"]).unwrap();
        assert_eq!(projected.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(projected.records()[0].get("a"), Some(&json!(1)));
        assert!(projected.records()[0].get("extra").is_none());
    }

    #[test]
    fn test_project_rejects_missing_and_duplicate_columns() {
        let source = frame("ABC", &["a"], &[]);
        assert!(matches!(
            project(&source, &["a", "b"]),
            Err(EtlError::SchemaMismatch { .. })
        ));
        assert!(matches!(
            project(&source, &["a", "a"]),
            Err(EtlError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_unify_stacks_first_source_first() {
        let a = frame("ABC", &["chain", "n"], &[&[json!("ABC"), json!(1)], &[json!("ABC"), json!(2)]]);
        let b = frame("XYZ", &["n", "chain"], &[&[json!(3), json!("XYZ")]]);
        let outcome = unify(&a, &b, &["chain", "n"]).unwrap();

        assert_eq!(outcome.merged.len(), 3);
        let order: Vec<&Value> = outcome.merged.frame().records().iter().map(|r| &r["n"]).collect();
        assert_eq!(order, vec![&json!(1), &json!(2), &json!(3)]);
        assert_eq!(
            outcome.merged.source_lengths(),
            &[("ABC".to_string(), 2), ("XYZ".to_string(), 1)]
        );
    }

    #[test]
    fn test_unify_with_empty_source() {
        let a = frame("ABC", &["chain"], &[]);
        let b = frame("XYZ", &["chain"], &[&[json!("XYZ")]]);
        let outcome = unify(&a, &b, &["chain"]).unwrap();
        assert_eq!(outcome.merged.len(), 1);
    }
}
