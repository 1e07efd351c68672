//! Column-level repair operations shared by every source normalizer.
//!
//! Each operation rewrites the frame in place and returns the counts the
//! quality report needs. None of them drops a row.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashMap};

use crate::config::DatePolicy;
use crate::constants::{
    is_canonical_category, ALCOHOL_PURCHASED, CHAIN, COUPON_USED, HAS_CHILDREN, ITEM_CATEGORY,
    MONEY_COLUMNS, MONTH, MONTH_NAME, PURCHASE_DATE, PURCHASE_TIME, QUANTITY, RAW_COLUMN_RENAMES,
    SEASON, TIME_OF_DAY_FLAG, YEAR,
};
use crate::error::{EtlError, Result};
use crate::pipeline::frame::{cell_text, Frame};
use crate::types::{Chain, Season, TimeOfDay, YesNo};

/// Integer text, optionally carrying a zero fraction (`42`, `42.0`)
static INTEGER_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(\.0*)?$").expect("valid integer regex"));

/// A bare number in the date column, read as nanoseconds since the epoch
static EPOCH_NANOS_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid epoch regex"));

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

const TIME_FORMATS: [&str; 5] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

/// Coded boolean columns rendered as Yes/No labels
pub const CODED_FLAG_COLUMNS: [&str; 3] = [COUPON_USED, ALCOHOL_PURCHASED, HAS_CHILDREN];

/// Outcome of parsing one date cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Date(NaiveDate),
    Unparseable,
}

/// Parse a date cell. Accepts ISO dates and datetimes, US-style dates and
/// bare epoch-nanosecond integers.
pub fn parse_date_text(text: &str) -> ParsedDate {
    let text = text.trim();

    if EPOCH_NANOS_TEXT.is_match(text) {
        return match text.parse::<f64>() {
            Ok(nanos) if (i64::MIN as f64..=i64::MAX as f64).contains(&nanos) => {
                let nanos = nanos as i64;
                let secs = nanos.div_euclid(1_000_000_000);
                let subsec = nanos.rem_euclid(1_000_000_000) as u32;
                DateTime::from_timestamp(secs, subsec)
                    .map(|dt| ParsedDate::Date(dt.date_naive()))
                    .unwrap_or(ParsedDate::Unparseable)
            }
            _ => ParsedDate::Unparseable,
        };
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return ParsedDate::Date(datetime.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return ParsedDate::Date(date);
        }
    }
    ParsedDate::Unparseable
}

/// Parse a time cell into a time of day
pub fn parse_time_text(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRepair {
    /// Rows whose date carried the sentinel year, reset to unknown
    pub corrupt: usize,
    /// Rows whose date text could not be parsed, reset to unknown
    pub unparseable: usize,
    /// Rows with a real but out-of-range year
    pub implausible: usize,
    /// Whether the implausible dates were reset rather than only counted
    pub implausible_reset: bool,
    /// Rows whose time text could not be parsed, reset to unknown
    pub unparseable_times: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRepair {
    /// Values per column that could not be coerced and became unknown
    pub invalid: BTreeMap<String, usize>,
}

impl ColumnRepair {
    fn record(&mut self, column: &str) {
        *self.invalid.entry(column.to_string()).or_default() += 1;
    }

    pub fn total(&self) -> usize {
        self.invalid.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyRepair {
    /// Rows whose category text changed through the mapping
    pub remapped: usize,
    /// Non-canonical values passed through unchanged, with row counts
    pub unmapped: BTreeMap<String, usize>,
    /// Distinct categories after mapping
    pub categories: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxiliaryDerivation {
    /// Rows with a known date that received month/year/season
    pub dated_rows: usize,
    /// Rows with a known time that received an AM/PM flag
    pub timed_rows: usize,
    /// Unrecognized codes per flag column, reset to unknown
    pub unrecognized_flags: ColumnRepair,
}

/// What `drop_unusable_columns` decided for one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDecision {
    Dropped { column: String, rows: usize },
    Kept { column: String, present: usize, rows: usize },
    Absent { column: String },
}

/// Rename raw extract headers to their canonical names. Already canonical
/// frames are left alone. Returns the renames performed.
pub fn canonicalize_columns(frame: &mut Frame) -> Vec<(String, String)> {
    let mut renamed = Vec::new();
    for (raw, canonical) in RAW_COLUMN_RENAMES {
        if frame.rename_column(raw, canonical) {
            renamed.push((raw.to_string(), canonical.to_string()));
        }
    }
    renamed
}

/// Fail with `MissingColumn` on the first expected column the frame lacks
pub fn require_columns(frame: &Frame, expected: &[&str]) -> Result<()> {
    match expected.iter().find(|c| !frame.has_column(c)) {
        Some(column) => Err(EtlError::MissingColumn {
            source_name: frame.name().to_string(),
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

/// Remove each listed column only when no row carries a value for it
pub fn drop_unusable_columns(frame: &mut Frame, columns: &[&str]) -> Vec<ColumnDecision> {
    let rows = frame.len();
    columns
        .iter()
        .map(|column| {
            if !frame.has_column(column) {
                return ColumnDecision::Absent {
                    column: column.to_string(),
                };
            }
            let present = rows - frame.missing_count(column);
            if present == 0 {
                frame.drop_column(column);
                ColumnDecision::Dropped {
                    column: column.to_string(),
                    rows,
                }
            } else {
                ColumnDecision::Kept {
                    column: column.to_string(),
                    present,
                    rows,
                }
            }
        })
        .collect()
}

/// Attach the provenance column to every record
pub fn tag_chain(frame: &mut Frame, chain: Chain) {
    frame.add_column(CHAIN);
    for record in frame.records_mut() {
        record.insert(CHAIN.to_string(), Value::String(chain.as_str().to_string()));
    }
}

/// Reset sentinel-year and unparseable dates to unknown, write known dates
/// as `YYYY-MM-DD` and times as `HH:MM`.
pub fn repair_dates(frame: &mut Frame, policy: &DatePolicy) -> DateRepair {
    let mut repair = DateRepair {
        implausible_reset: policy.reset_implausible_dates,
        ..DateRepair::default()
    };

    for record in frame.records_mut() {
        if record.contains_key(PURCHASE_DATE) {
            let repaired = repair_date_cell(record.get(PURCHASE_DATE), policy, &mut repair);
            record.insert(PURCHASE_DATE.to_string(), repaired);
        }

        if record.contains_key(PURCHASE_TIME) {
            let repaired = match cell_text(record.get(PURCHASE_TIME)) {
                None => Value::Null,
                Some(text) => match parse_time_text(&text) {
                    Some(time) => Value::String(time.format("%H:%M").to_string()),
                    None => {
                        repair.unparseable_times += 1;
                        Value::Null
                    }
                },
            };
            record.insert(PURCHASE_TIME.to_string(), repaired);
        }
    }
    repair
}

fn repair_date_cell(value: Option<&Value>, policy: &DatePolicy, repair: &mut DateRepair) -> Value {
    let Some(text) = cell_text(value) else {
        return Value::Null;
    };
    match parse_date_text(&text) {
        ParsedDate::Unparseable => {
            repair.unparseable += 1;
            Value::Null
        }
        ParsedDate::Date(date) if date.year() == policy.sentinel_year => {
            repair.corrupt += 1;
            Value::Null
        }
        ParsedDate::Date(date) if !policy.is_plausible_year(date.year()) => {
            repair.implausible += 1;
            if policy.reset_implausible_dates {
                Value::Null
            } else {
                Value::String(date.format("%Y-%m-%d").to_string())
            }
        }
        ParsedDate::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
    }
}

/// Integer view of a cell: `Ok(None)` when missing, `Err(())` when present
/// but not an integer
fn coerce_integer(value: Option<&Value>) -> std::result::Result<Option<i64>, ()> {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(Some(f as i64)),
                    _ => Err(()),
                }
            }
        }
        other => match cell_text(other) {
            None => Ok(None),
            Some(text) if INTEGER_TEXT.is_match(&text) => {
                let whole = text.split('.').next().unwrap_or_default();
                whole.parse::<i64>().map(Some).map_err(|_| ())
            }
            Some(_) => Err(()),
        },
    }
}

fn coerce_decimal(value: Option<&Value>) -> std::result::Result<Option<f64>, ()> {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()).map(Some).ok_or(()),
        other => match cell_text(other) {
            None => Ok(None),
            Some(text) => match text.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Some(f)),
                _ => Err(()),
            },
        },
    }
}

fn repair_integer_columns(frame: &mut Frame, columns: &[&str], repair: &mut ColumnRepair) {
    for record in frame.records_mut() {
        for column in columns {
            if !record.contains_key(*column) {
                continue;
            }
            let repaired = match coerce_integer(record.get(*column)) {
                Ok(Some(i)) => Value::Number(Number::from(i)),
                Ok(None) => Value::Null,
                Err(()) => {
                    repair.record(column);
                    Value::Null
                }
            };
            record.insert(column.to_string(), repaired);
        }
    }
}

/// Coerce identifier columns to integers; non-numeric text becomes unknown
pub fn repair_identifiers(frame: &mut Frame, columns: &[&str]) -> ColumnRepair {
    let mut repair = ColumnRepair::default();
    repair_integer_columns(frame, columns, &mut repair);
    repair
}

/// Coerce quantity to an integer and the money columns to decimals
pub fn repair_amounts(frame: &mut Frame) -> ColumnRepair {
    let mut repair = ColumnRepair::default();
    repair_integer_columns(frame, &[QUANTITY], &mut repair);

    for record in frame.records_mut() {
        for column in MONEY_COLUMNS {
            if !record.contains_key(column) {
                continue;
            }
            let repaired = match coerce_decimal(record.get(column)) {
                Ok(Some(f)) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
                Ok(None) => Value::Null,
                Err(()) => {
                    repair.record(column);
                    Value::Null
                }
            };
            record.insert(column.to_string(), repaired);
        }
    }
    repair
}

/// Map source category labels through `mapping`. Unmapped values pass
/// through unchanged and are counted when they are not canonical.
pub fn normalize_vocabulary(frame: &mut Frame, mapping: &HashMap<&str, &str>) -> VocabularyRepair {
    let mut repair = VocabularyRepair::default();

    for record in frame.records_mut() {
        let Some(raw) = cell_text(record.get(ITEM_CATEGORY)).map(|c| c.into_owned()) else {
            record.insert(ITEM_CATEGORY.to_string(), Value::Null);
            continue;
        };
        let category = match mapping.get(raw.as_str()) {
            Some(mapped) => mapped.to_string(),
            None => raw.clone(),
        };
        if category != raw {
            repair.remapped += 1;
        }
        if !is_canonical_category(&category) {
            *repair.unmapped.entry(category.clone()).or_default() += 1;
        }
        *repair.categories.entry(category.clone()).or_default() += 1;
        record.insert(ITEM_CATEGORY.to_string(), Value::String(category));
    }
    repair
}

/// Derive AM/PM, month, month name, year and season from the repaired
/// date and time, and render the coded flags as Yes/No.
pub fn derive_auxiliary(frame: &mut Frame) -> AuxiliaryDerivation {
    for column in [TIME_OF_DAY_FLAG, MONTH, MONTH_NAME, YEAR, SEASON] {
        frame.add_column(column);
    }

    let mut derivation = AuxiliaryDerivation::default();
    for record in frame.records_mut() {
        let time = cell_text(record.get(PURCHASE_TIME)).and_then(|t| parse_time_text(&t));
        let flag = match time {
            Some(time) => {
                derivation.timed_rows += 1;
                Value::String(TimeOfDay::from_hour(time.hour()).as_str().to_string())
            }
            None => Value::Null,
        };
        record.insert(TIME_OF_DAY_FLAG.to_string(), flag);

        let date = cell_text(record.get(PURCHASE_DATE))
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());
        match date {
            Some(date) => {
                derivation.dated_rows += 1;
                let season = Season::from_month(date.month())
                    .map(|s| Value::String(s.as_str().to_string()))
                    .unwrap_or(Value::Null);
                record.insert(MONTH.to_string(), Value::Number(Number::from(date.month())));
                record.insert(MONTH_NAME.to_string(), Value::String(date.format("%B").to_string()));
                record.insert(YEAR.to_string(), Value::Number(Number::from(date.year())));
                record.insert(SEASON.to_string(), season);
            }
            None => {
                for column in [MONTH, MONTH_NAME, YEAR, SEASON] {
                    record.insert(column.to_string(), Value::Null);
                }
            }
        }

        for column in CODED_FLAG_COLUMNS {
            if !record.contains_key(column) {
                continue;
            }
            let label = match cell_text(record.get(column)) {
                None => Value::Null,
                Some(code) => match YesNo::from_code(&code) {
                    Some(flag) => Value::String(flag.as_str().to_string()),
                    None => {
                        derivation.unrecognized_flags.record(column);
                        Value::Null
                    }
                },
            };
            record.insert(column.to_string(), label);
        }
    }
    derivation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::frame::Record;
    use serde_json::json;

    fn frame_with(column: &str, values: Vec<Value>) -> Frame {
        let mut frame = Frame::new("ABC", vec![column.to_string()]);
        for value in values {
            let mut record = Record::new();
            record.insert(column.to_string(), value);
            frame.push(record);
        }
        frame
    }

    fn column_values(frame: &Frame, column: &str) -> Vec<Value> {
        frame
            .records()
            .iter()
            .map(|r| r.get(column).cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn test_parse_date_text_formats() {
        let expected = NaiveDate::from_ymd_opt(2018, 3, 14).unwrap();
        assert_eq!(parse_date_text("2018-03-14"), ParsedDate::Date(expected));
        assert_eq!(parse_date_text("2018-03-14 00:00:00"), ParsedDate::Date(expected));
        assert_eq!(parse_date_text("03/14/2018"), ParsedDate::Date(expected));
        assert_eq!(parse_date_text("not a date"), ParsedDate::Unparseable);
    }

    #[test]
    fn test_bare_integer_date_lands_in_epoch_year() {
        match parse_date_text("1539302400") {
            ParsedDate::Date(date) => assert_eq!(date.year(), 1970),
            other => panic!("expected a date, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_epoch_integer_is_unparseable() {
        assert_eq!(
            parse_date_text("99999999999999999999999"),
            ParsedDate::Unparseable
        );
        assert_eq!(
            parse_date_text("-99999999999999999999999"),
            ParsedDate::Unparseable
        );
    }

    #[test]
    fn test_repair_dates_resets_sentinel_year() {
        let mut frame = frame_with(
            PURCHASE_DATE,
            vec![json!("1970-01-01"), json!("2018-06-02"), Value::Null, json!("garbage")],
        );
        let repair = repair_dates(&mut frame, &DatePolicy::default());

        assert_eq!(repair.corrupt, 1);
        assert_eq!(repair.unparseable, 1);
        assert_eq!(
            column_values(&frame, PURCHASE_DATE),
            vec![Value::Null, json!("2018-06-02"), Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_implausible_dates_follow_policy() {
        let mut kept = frame_with(PURCHASE_DATE, vec![json!("2009-05-01")]);
        let repair = repair_dates(&mut kept, &DatePolicy::default());
        assert_eq!(repair.implausible, 1);
        assert_eq!(column_values(&kept, PURCHASE_DATE), vec![json!("2009-05-01")]);

        let policy = DatePolicy {
            reset_implausible_dates: true,
            ..DatePolicy::default()
        };
        let mut reset = frame_with(PURCHASE_DATE, vec![json!("2009-05-01")]);
        let repair = repair_dates(&mut reset, &policy);
        assert!(repair.implausible_reset);
        assert_eq!(column_values(&reset, PURCHASE_DATE), vec![Value::Null]);
    }

    #[test]
    fn test_times_are_written_as_hours_and_minutes() {
        let mut frame = frame_with(
            PURCHASE_TIME,
            vec![json!("13:45:10"), json!("07:05"), json!("late")],
        );
        let repair = repair_dates(&mut frame, &DatePolicy::default());
        assert_eq!(repair.unparseable_times, 1);
        assert_eq!(
            column_values(&frame, PURCHASE_TIME),
            vec![json!("13:45"), json!("07:05"), Value::Null]
        );
    }

    #[test]
    fn test_repair_identifiers_coerces_or_nulls() {
        let mut frame = frame_with(
            "order_number",
            vec![json!("1001"), json!("1002.0"), json!("A-17"), json!(7), Value::Null],
        );
        let repair = repair_identifiers(&mut frame, &["order_number"]);
        assert_eq!(repair.invalid.get("order_number"), Some(&1));
        assert_eq!(
            column_values(&frame, "order_number"),
            vec![json!(1001), json!(1002), Value::Null, json!(7), Value::Null]
        );
    }

    #[test]
    fn test_repair_amounts() {
        let mut frame = frame_with("menu_price", vec![json!("12.50"), json!("free")]);
        frame.add_column(QUANTITY);
        frame.records_mut()[0].insert(QUANTITY.into(), json!("2"));
        let repair = repair_amounts(&mut frame);
        assert_eq!(repair.total(), 1);
        assert_eq!(column_values(&frame, "menu_price"), vec![json!(12.5), Value::Null]);
        assert_eq!(column_values(&frame, QUANTITY), vec![json!(2), Value::Null]);
    }

    #[test]
    fn test_vocabulary_passes_unmapped_values_through() {
        let mapping: HashMap<&str, &str> = [("salad", "Salads")].into_iter().collect();
        let mut frame = frame_with(
            ITEM_CATEGORY,
            vec![json!("salad"), json!("Salads"), json!("Soup"), Value::Null],
        );
        let repair = normalize_vocabulary(&mut frame, &mapping);
        assert_eq!(repair.remapped, 1);
        assert_eq!(repair.unmapped.get("Soup"), Some(&1));
        assert_eq!(
            column_values(&frame, ITEM_CATEGORY),
            vec![json!("Salads"), json!("Salads"), json!("Soup"), Value::Null]
        );
    }

    #[test]
    fn test_derive_auxiliary_leaves_unknown_date_fields_unknown() {
        let mut frame = Frame::new(
            "XYZ",
            vec![PURCHASE_DATE.into(), PURCHASE_TIME.into(), COUPON_USED.into()],
        );
        let mut known = Record::new();
        known.insert(PURCHASE_DATE.into(), json!("2019-12-24"));
        known.insert(PURCHASE_TIME.into(), json!("18:30"));
        known.insert(COUPON_USED.into(), json!("Y"));
        let mut unknown = Record::new();
        unknown.insert(PURCHASE_DATE.into(), Value::Null);
        unknown.insert(PURCHASE_TIME.into(), Value::Null);
        unknown.insert(COUPON_USED.into(), json!("?"));
        frame.push(known);
        frame.push(unknown);

        let derivation = derive_auxiliary(&mut frame);
        assert_eq!(derivation.dated_rows, 1);
        assert_eq!(derivation.unrecognized_flags.total(), 1);

        let first = &frame.records()[0];
        assert_eq!(first.get(MONTH), Some(&json!(12)));
        assert_eq!(first.get(MONTH_NAME), Some(&json!("December")));
        assert_eq!(first.get(SEASON), Some(&json!("Winter")));
        assert_eq!(first.get(TIME_OF_DAY_FLAG), Some(&json!("PM")));
        assert_eq!(first.get(COUPON_USED), Some(&json!("Yes")));

        let second = &frame.records()[1];
        for column in [MONTH, MONTH_NAME, YEAR, SEASON, TIME_OF_DAY_FLAG, COUPON_USED] {
            assert_eq!(second.get(column), Some(&Value::Null), "{column}");
        }
    }

    #[test]
    fn test_drop_unusable_columns_only_drops_fully_missing() {
        let mut frame = frame_with("item_product_cost", vec![Value::Null, json!("")]);
        let decisions = drop_unusable_columns(&mut frame, &["item_product_cost", "absent"]);
        assert!(matches!(decisions[0], ColumnDecision::Dropped { rows: 2, .. }));
        assert!(matches!(decisions[1], ColumnDecision::Absent { .. }));
        assert!(!frame.has_column("item_product_cost"));

        let mut kept = frame_with("item_product_cost", vec![Value::Null, json!("3.10")]);
        let decisions = drop_unusable_columns(&mut kept, &["item_product_cost"]);
        assert!(matches!(decisions[0], ColumnDecision::Kept { present: 1, rows: 2, .. }));
    }
}
