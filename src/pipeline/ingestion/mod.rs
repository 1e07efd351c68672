//! Source readers: load the raw extracts and the merged file back from disk.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::SHARED_COLUMNS;
use crate::error::{EtlError, Result};
use crate::pipeline::frame::{Frame, Record};
use crate::types::NormalizedRecord;

/// Cells and rows the reader had to repair before any column logic ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadRepair {
    /// Cells holding invalid UTF-8, decoded with replacement characters
    pub undecodable_cells: usize,
    /// Rows with fewer cells than the header; the missing cells are unknown
    pub short_rows: usize,
    /// Rows with more cells than the header; the extra cells are ignored
    pub long_rows: usize,
}

impl ReadRepair {
    pub fn is_clean(&self) -> bool {
        *self == ReadRepair::default()
    }
}

/// A raw extract as read from disk, before any repair
#[derive(Debug, Clone)]
pub struct SourceExtract {
    pub path: PathBuf,
    /// Hex sha256 of the file bytes, recorded in the quality report
    pub sha256: String,
    pub frame: Frame,
    pub repairs: ReadRepair,
}

/// Read a raw CSV extract. Every cell is kept as text; empty cells become `Null`.
pub fn read_source(path: &Path, source_name: &str) -> Result<SourceExtract> {
    if !path.exists() {
        return Err(EtlError::MissingInput(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    let (frame, repairs) = parse_extract(bytes.as_slice(), source_name)?;

    info!(
        source = source_name,
        rows = frame.len(),
        columns = frame.columns().len(),
        "Loaded raw extract from {}",
        path.display()
    );
    if !repairs.is_clean() {
        warn!(
            source = source_name,
            undecodable_cells = repairs.undecodable_cells,
            short_rows = repairs.short_rows,
            long_rows = repairs.long_rows,
            "Repaired malformed cells while reading"
        );
    }

    Ok(SourceExtract {
        path: path.to_path_buf(),
        sha256,
        frame,
        repairs,
    })
}

fn decode_cell(bytes: &[u8], repairs: &mut ReadRepair) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            repairs.undecodable_cells += 1;
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Parse raw CSV bytes into an untyped frame plus the reader-level repairs.
///
/// Undecodable bytes and ragged rows never fail the read: cells are decoded
/// lossily, missing trailing cells become `Null` and surplus cells are dropped.
pub fn parse_extract<R: std::io::Read>(
    reader: R,
    source_name: &str,
) -> Result<(Frame, ReadRepair)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut repairs = ReadRepair::default();
    let headers: Vec<String> = csv_reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let mut frame = Frame::new(source_name, headers.clone());

    for row in csv_reader.byte_records() {
        let row = row?;
        if row.len() < headers.len() {
            repairs.short_rows += 1;
        } else if row.len() > headers.len() {
            repairs.long_rows += 1;
        }

        let mut record = Record::new();
        for (index, header) in headers.iter().enumerate() {
            let value = match row.get(index) {
                Some(cell) if !cell.is_empty() => Value::String(decode_cell(cell, &mut repairs)),
                _ => Value::Null,
            };
            record.insert(header.clone(), value);
        }
        frame.push(record);
    }

    debug!(source = source_name, rows = frame.len(), "Parsed raw rows");
    Ok((frame, repairs))
}

/// Parse raw CSV text into an untyped frame
pub fn parse_source<R: std::io::Read>(reader: R, source_name: &str) -> Result<Frame> {
    parse_extract(reader, source_name).map(|(frame, _)| frame)
}

/// Read the merged file back into typed records.
///
/// The header must be exactly the shared layout; anything else is a
/// structural error, not something to reorder silently.
pub fn read_merged(path: &Path) -> Result<Vec<NormalizedRecord>> {
    if !path.exists() {
        return Err(EtlError::MissingInput(path.to_path_buf()));
    }
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let found: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    if found != SHARED_COLUMNS {
        return Err(EtlError::HeaderMismatch {
            path: path.to_path_buf(),
            expected: SHARED_COLUMNS.join(","),
            found: found.join(","),
        });
    }

    let mut records = Vec::new();
    for row in csv_reader.deserialize::<NormalizedRecord>() {
        records.push(row?);
    }
    info!(rows = records.len(), "Loaded merged dataset from {}", path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_keeps_text_and_nulls_empty_cells() {
        let csv = "customer_id,order_number,item_category\n C1 ,12,\nC2,abc,Pizza\n";
        let frame = parse_source(csv.as_bytes(), "ABC").unwrap();

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.columns().len(), 3);
        let first = &frame.records()[0];
        assert_eq!(first.get("customer_id"), Some(&Value::String("C1".into())));
        assert_eq!(first.get("item_category"), Some(&Value::Null));
        assert_eq!(
            frame.records()[1].get("order_number"),
            Some(&Value::String("abc".into()))
        );
    }

    #[test]
    fn test_undecodable_cell_is_decoded_lossily_and_counted() {
        let mut bytes = b"customer_id,item_description\nC1,Caf".to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b"\nC2,Soup\n");

        let (frame, repairs) = parse_extract(bytes.as_slice(), "ABC").unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(repairs.undecodable_cells, 1);
        assert_eq!(
            frame.records()[0].get("item_description"),
            Some(&Value::String("Caf\u{FFFD}".into()))
        );
        assert_eq!(
            frame.records()[1].get("item_description"),
            Some(&Value::String("Soup".into()))
        );
    }

    #[test]
    fn test_ragged_rows_are_padded_or_truncated() {
        let csv = "customer_id,order_number,item_category\nC1,1,Pizza\nC2,2\nC3,3,Pasta,extra\n";
        let (frame, repairs) = parse_extract(csv.as_bytes(), "XYZ").unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(repairs.short_rows, 1);
        assert_eq!(repairs.long_rows, 1);
        assert_eq!(frame.records()[1].get("item_category"), Some(&Value::Null));
        assert_eq!(frame.records()[2].len(), 3);
        assert_eq!(
            frame.records()[2].get("item_category"),
            Some(&Value::String("Pasta".into()))
        );
    }

    #[test]
    fn test_read_source_reports_missing_file() {
        let result = read_source(Path::new("/no/such/extract.csv"), "ABC");
        assert!(matches!(result, Err(EtlError::MissingInput(_))));
    }
}
