//! Shared domain types.
//!
//! `CbPriceRecord` and `LatestPriceEnvelope` are the persisted shapes; their
//! serde field names are the on-disk contract read by downstream consumers,
//! so renaming a field here is a breaking change.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Timestamp format used for `update_time` fields.
pub const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Compact date format used in file names and the envelope `date` field.
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// Exchanges we ingest from, in the order a run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// Taiwan Stock Exchange (listed CBs).
    Twse,
    /// Taipei Exchange (OTC bond board, mixes CBs with straight bonds).
    Tpex,
}

impl Exchange {
    pub const ALL: [Exchange; 2] = [Exchange::Twse, Exchange::Tpex];

    pub fn display_name(self) -> &'static str {
        match self {
            Exchange::Twse => "TWSE",
            Exchange::Tpex => "TPEx",
        }
    }

    /// JSON field holding the row array in this exchange's response body.
    pub fn rows_field(self) -> &'static str {
        match self {
            Exchange::Twse => "data",
            Exchange::Tpex => "aaData",
        }
    }

    /// Date-keyed query parameters for a daily close request.
    pub fn query(self, date: NaiveDate) -> Vec<(&'static str, String)> {
        match self {
            Exchange::Twse => vec![
                ("response", "json".to_string()),
                ("date", date.format(COMPACT_DATE_FORMAT).to_string()),
            ],
            Exchange::Tpex => vec![
                ("l", "zh-tw".to_string()),
                ("d", date.format("%Y/%m/%d").to_string()),
            ],
        }
    }

    /// Whether rows must carry the convertible marker in their name to be kept.
    pub fn requires_convertible_marker(self) -> bool {
        matches!(self, Exchange::Tpex)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Rows exactly as one exchange returned them.
///
/// Each row is normally an array of cells; anything else is left for the
/// parser to reject row by row.
#[derive(Debug, Clone)]
pub struct RawSourceResponse {
    pub exchange: Exchange,
    pub rows: Vec<serde_json::Value>,
}

/// One convertible bond's daily close, normalized across exchanges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CbPriceRecord {
    pub code: String,
    pub name: String,
    pub close_price: f64,
    pub change: f64,
    /// Unscaled percent: `1.23` means 1.23%.
    pub change_percent: f64,
    /// Traded lots.
    pub volume: u64,
    pub update_time: String,
}

/// Contents of `latest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestPriceEnvelope {
    pub update_time: String,
    /// Trading date as `YYYYMMDD`.
    pub date: String,
    pub count: usize,
    pub data: Vec<CbPriceRecord>,
}

impl LatestPriceEnvelope {
    pub fn new(update_time: String, date: NaiveDate, data: Vec<CbPriceRecord>) -> Self {
        Self {
            update_time,
            date: date.format(COMPACT_DATE_FORMAT).to_string(),
            count: data.len(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_are_date_keyed_per_exchange() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();

        let twse = Exchange::Twse.query(date);
        assert_eq!(
            twse,
            vec![("response", "json".to_string()), ("date", "20250307".to_string())]
        );

        let tpex = Exchange::Tpex.query(date);
        assert_eq!(
            tpex,
            vec![("l", "zh-tw".to_string()), ("d", "2025/03/07".to_string())]
        );
    }

    #[test]
    fn record_serializes_with_contract_field_names() {
        let record = CbPriceRecord {
            code: "2890".to_string(),
            name: "永豐金轉一".to_string(),
            close_price: 101.5,
            change: 1.2,
            change_percent: 1.2,
            volume: 500,
            update_time: "2025-03-07 14:30:00".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["code", "name", "close_price", "change", "change_percent", "volume", "update_time"] {
            assert!(keys.contains(&key), "missing key {key}");
        }
        assert_eq!(keys.len(), 7);
        assert_eq!(value["close_price"], serde_json::json!(101.5));
    }

    #[test]
    fn envelope_count_tracks_data() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let envelope = LatestPriceEnvelope::new("2025-03-07 14:30:00".to_string(), date, Vec::new());
        assert_eq!(envelope.count, 0);
        assert_eq!(envelope.date, "20250307");
    }
}
