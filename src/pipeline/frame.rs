use serde_json::{Map, Value};
use std::borrow::Cow;
use std::io::Write;

use crate::error::Result;

/// One row keyed by column name. `Value::Null` is the "unknown" sentinel.
pub type Record = Map<String, Value>;

/// An ordered set of records sharing one explicit column list.
///
/// The column list is the authority on layout: records may be looked up by
/// name, but output order always follows `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    name: String,
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Frame {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            records: Vec::new(),
        }
    }

    pub fn from_records(name: impl Into<String>, columns: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            columns,
            records,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Append a column (no-op if present). Existing records get `Null`.
    pub fn add_column(&mut self, column: &str) {
        if self.has_column(column) {
            return;
        }
        self.columns.push(column.to_string());
        for record in &mut self.records {
            record.entry(column.to_string()).or_insert(Value::Null);
        }
    }

    /// Rename a column in place, keeping its position. Returns false if `from`
    /// is absent or `to` already exists.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if self.has_column(to) {
            return false;
        }
        let Some(position) = self.columns.iter().position(|c| c == from) else {
            return false;
        };
        self.columns[position] = to.to_string();
        for record in &mut self.records {
            let value = record.remove(from).unwrap_or(Value::Null);
            record.insert(to.to_string(), value);
        }
        true
    }

    pub fn drop_column(&mut self, column: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| c != column);
        if self.columns.len() == before {
            return false;
        }
        for record in &mut self.records {
            record.remove(column);
        }
        true
    }

    /// Number of records whose value for `column` is missing
    pub fn missing_count(&self, column: &str) -> usize {
        self.records
            .iter()
            .filter(|r| is_missing(r.get(column)))
            .count()
    }

    /// Write the frame as CSV, header first, in column order
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for record in &self.records {
            let row = self
                .columns
                .iter()
                .map(|c| cell_to_string(record.get(c)).into_owned());
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// `None`, `Null` and blank strings all count as missing
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Text view of a cell, `None` when missing
pub fn cell_text(value: Option<&Value>) -> Option<Cow<'_, str>> {
    if is_missing(value) {
        return None;
    }
    match value? {
        Value::String(s) => Some(Cow::Borrowed(s.trim())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

fn cell_to_string(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(Value::Bool(b)) => Cow::Owned(b.to_string()),
        Some(other) => Cow::Owned(other.to_string()),
    }
}
