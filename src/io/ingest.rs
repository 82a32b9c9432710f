//! Row parsing and normalization for exchange close tables.
//!
//! This module turns one exchange's raw rows into `CbPriceRecord`s.
//!
//! Design goals:
//! - **Row isolation**: a bad row is skipped with a reason, never aborts the rest
//! - **Observable skips**: every dropped row and every defaulted field is reported
//! - **Deterministic behavior**: the caller supplies `update_time`; no clock reads here
//!
//! Both exchanges use the same positional layout:
//! `[code, name, close_price, change, change_percent, volume, ...]`.

use std::fmt;

use serde_json::Value;

use crate::domain::{CbPriceRecord, Exchange, RawSourceResponse};

/// Substring a TPEx bond name must contain to be a convertible ("轉換公司債").
pub const CONVERTIBLE_MARKER: char = '轉';

const COL_CODE: usize = 0;
const COL_NAME: usize = 1;
const COL_CLOSE: usize = 2;
const COL_CHANGE: usize = 3;
const COL_CHANGE_PERCENT: usize = 4;
const COL_VOLUME: usize = 5;

/// Why a row produced no record.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The row is not an array of cells.
    NotARow,
    MissingCode,
    /// Close price is the `--` sentinel: the bond did not trade.
    NoTrade,
    InvalidClosePrice(String),
    /// Straight bond mixed into the TPEx feed.
    NotConvertible,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotARow => f.write_str("row is not an array"),
            SkipReason::MissingCode => f.write_str("missing code"),
            SkipReason::NoTrade => f.write_str("no trade"),
            SkipReason::InvalidClosePrice(raw) => write!(f, "invalid close price '{raw}'"),
            SkipReason::NotConvertible => f.write_str("not a convertible bond"),
        }
    }
}

/// A row that was dropped, with its position in the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSkip {
    pub index: usize,
    pub code: Option<String>,
    pub reason: SkipReason,
}

/// Non-key numeric columns that fall back to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Change,
    ChangePercent,
    Volume,
}

impl NumericField {
    pub fn name(self) -> &'static str {
        match self {
            NumericField::Change => "change",
            NumericField::ChangePercent => "change_percent",
            NumericField::Volume => "volume",
        }
    }
}

/// A malformed field that was replaced by 0 on an otherwise valid record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFallback {
    pub index: usize,
    pub code: String,
    pub field: NumericField,
    /// Offending cell text; `None` when the cell was missing entirely.
    pub raw: Option<String>,
}

/// Parser output for one exchange: kept records plus what was dropped or defaulted.
#[derive(Debug, Clone)]
pub struct ParseReport {
    pub exchange: Exchange,
    pub rows_read: usize,
    pub records: Vec<CbPriceRecord>,
    pub skipped: Vec<RowSkip>,
    pub fallbacks: Vec<FieldFallback>,
}

impl ParseReport {
    fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            rows_read: 0,
            records: Vec::new(),
            skipped: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    /// Skips that indicate bad data, as opposed to expected exclusions
    /// (no-trade sentinels and non-convertible TPEx bonds).
    pub fn malformed_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| !matches!(s.reason, SkipReason::NoTrade | SkipReason::NotConvertible))
            .count()
    }
}

struct ParsedRow {
    record: CbPriceRecord,
    fallbacks: Vec<FieldFallback>,
}

/// Parse every row of an exchange response, preserving source order.
pub fn parse_response(raw: &RawSourceResponse, update_time: &str) -> ParseReport {
    let mut report = ParseReport::new(raw.exchange);

    for (index, row) in raw.rows.iter().enumerate() {
        report.rows_read += 1;
        match parse_row(raw.exchange, index, row, update_time) {
            Ok(parsed) => {
                for fb in &parsed.fallbacks {
                    log::debug!(
                        "{} row {} ({}) {} defaulted to 0 from {}",
                        raw.exchange,
                        fb.index,
                        fb.code,
                        fb.field.name(),
                        fb.raw.as_deref().map_or("missing cell".to_string(), |r| format!("'{r}'"))
                    );
                }
                report.fallbacks.extend(parsed.fallbacks);
                report.records.push(parsed.record);
            }
            Err(skip) => {
                log::debug!(
                    "{} row {} ({}) skipped: {}",
                    raw.exchange,
                    skip.index,
                    skip.code.as_deref().unwrap_or("?"),
                    skip.reason
                );
                report.skipped.push(skip);
            }
        }
    }

    report
}

fn parse_row(exchange: Exchange, index: usize, row: &Value, update_time: &str) -> Result<ParsedRow, RowSkip> {
    let skip = |code: Option<&str>, reason: SkipReason| RowSkip {
        index,
        code: code.map(str::to_string),
        reason,
    };

    let Value::Array(cells) = row else {
        return Err(skip(None, SkipReason::NotARow));
    };

    let code = text_cell(cells, COL_CODE)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| skip(None, SkipReason::MissingCode))?;

    let name = name_cell(cells);

    if exchange.requires_convertible_marker() && !name.contains(CONVERTIBLE_MARKER) {
        return Err(skip(Some(code), SkipReason::NotConvertible));
    }

    let close_price = match numeric_cell(cells, COL_CLOSE) {
        NumericCell::Value(v) => v,
        NumericCell::Placeholder => return Err(skip(Some(code), SkipReason::NoTrade)),
        NumericCell::Invalid(raw) => return Err(skip(Some(code), SkipReason::InvalidClosePrice(raw))),
        NumericCell::Missing => {
            return Err(skip(Some(code), SkipReason::InvalidClosePrice(String::new())));
        }
    };

    let mut fallbacks = Vec::new();
    let mut fallback = |field: NumericField, raw: Option<String>| {
        fallbacks.push(FieldFallback {
            index,
            code: code.to_string(),
            field,
            raw,
        });
    };

    let mut decimal_or_zero = |col: usize, field: NumericField| match numeric_cell(cells, col) {
        NumericCell::Value(v) => v,
        NumericCell::Placeholder => 0.0,
        NumericCell::Invalid(raw) => {
            fallback(field, Some(raw));
            0.0
        }
        NumericCell::Missing => {
            fallback(field, None);
            0.0
        }
    };

    let change = decimal_or_zero(COL_CHANGE, NumericField::Change);
    let change_percent = decimal_or_zero(COL_CHANGE_PERCENT, NumericField::ChangePercent);
    let volume = match numeric_cell(cells, COL_VOLUME) {
        NumericCell::Value(v) if (0.0..u64::MAX as f64).contains(&v) => v.trunc() as u64,
        NumericCell::Value(v) => {
            fallback(NumericField::Volume, Some(v.to_string()));
            0
        }
        NumericCell::Placeholder => 0,
        NumericCell::Invalid(raw) => {
            fallback(NumericField::Volume, Some(raw));
            0
        }
        NumericCell::Missing => {
            fallback(NumericField::Volume, None);
            0
        }
    };

    Ok(ParsedRow {
        record: CbPriceRecord {
            code: code.to_string(),
            name,
            close_price,
            change,
            change_percent,
            volume,
            update_time: update_time.to_string(),
        },
        fallbacks,
    })
}

/// Trimmed text of a string cell; `None` for missing or non-string cells.
fn text_cell(cells: &[Value], col: usize) -> Option<&str> {
    match cells.get(col) {
        Some(Value::String(s)) => Some(s.trim()),
        _ => None,
    }
}

/// Display name; an unreadable cell degrades to an empty name.
fn name_cell(cells: &[Value]) -> String {
    match cells.get(COL_NAME) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

enum NumericCell {
    Value(f64),
    /// `--` or blank: the exchange reported no value.
    Placeholder,
    Invalid(String),
    Missing,
}

fn numeric_cell(cells: &[Value], col: usize) -> NumericCell {
    match cells.get(col) {
        None => NumericCell::Missing,
        Some(Value::String(s)) => {
            let text = s.trim();
            if is_placeholder(text) {
                NumericCell::Placeholder
            } else {
                parse_decimal(text).map_or_else(|| NumericCell::Invalid(text.to_string()), NumericCell::Value)
            }
        }
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map_or_else(|| NumericCell::Invalid(n.to_string()), NumericCell::Value),
        Some(Value::Null) => NumericCell::Placeholder,
        Some(other) => NumericCell::Invalid(other.to_string()),
    }
}

fn is_placeholder(text: &str) -> bool {
    text.is_empty() || text.chars().all(|c| c == '-')
}

/// Parse exchange-formatted numbers such as `1,234.50`, `+0.35`, `-1.2%`.
fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '%').collect();
    let v = cleaned.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
