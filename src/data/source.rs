//! Source adapter contract and fetch outcomes.
//!
//! The `PriceSource` trait abstracts over exchanges so the coordinator can be
//! driven by fakes in tests. Adapters never return `Err`: a failed fetch is an
//! ordinary `FetchOutcome` value so one bad exchange can't stop the run.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Exchange, RawSourceResponse};

/// Why a fetch produced nothing usable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("response format changed: {0}")]
    Malformed(String),
}

/// Result of one adapter call.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The exchange answered with at least one row.
    Rows(RawSourceResponse),
    /// Valid answer, no rows (holiday, or data not published yet).
    Empty,
    /// Transient failure; the exchange contributes nothing this run.
    Failed(FetchError),
}

pub trait PriceSource {
    fn exchange(&self) -> Exchange;

    /// Fetch the daily close table for `date`. One request, no retry.
    fn fetch(&self, date: NaiveDate) -> FetchOutcome;
}
