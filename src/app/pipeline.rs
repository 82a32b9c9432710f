//! Shared ingest pipeline: fetch -> parse -> merge -> persist.
//!
//! `run_with` takes its sources and writer as arguments so the whole flow can
//! be exercised with fakes; `run_ingest` wires the real exchange clients.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;

use crate::clock::Clock;
use crate::config::Settings;
use crate::data::{ExchangeClient, FetchError, FetchOutcome, PriceSource};
use crate::domain::{CbPriceRecord, Exchange};
use crate::error::AppError;
use crate::io::ingest::{ParseReport, parse_response};
use crate::io::snapshot::{SnapshotError, SnapshotPaths, SnapshotWriter};

/// What one exchange contributed to a run.
#[derive(Debug)]
pub enum SourceStatus {
    Parsed(ParseReport),
    Empty,
    Failed(FetchError),
}

#[derive(Debug)]
pub struct SourceRun {
    pub exchange: Exchange,
    pub status: SourceStatus,
}

impl SourceRun {
    pub fn contributed(&self) -> usize {
        match &self.status {
            SourceStatus::Parsed(report) => report.records.len(),
            SourceStatus::Empty | SourceStatus::Failed(_) => 0,
        }
    }
}

/// Overall outcome of the fetch/merge phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every source contributed records.
    Success,
    /// At least one source contributed, at least one did not.
    Partial,
    /// No source contributed anything.
    NoData,
}

/// Records from every source, concatenated in visiting order.
///
/// A code quoted by both exchanges appears twice; nothing is deduplicated.
#[derive(Debug)]
pub struct MergeOutcome {
    pub date: NaiveDate,
    pub sources: Vec<SourceRun>,
    pub records: Vec<CbPriceRecord>,
}

impl MergeOutcome {
    pub fn has_data(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn status(&self) -> RunStatus {
        let contributing = self.sources.iter().filter(|s| s.contributed() > 0).count();
        if contributing == 0 {
            RunStatus::NoData
        } else if contributing == self.sources.len() {
            RunStatus::Success
        } else {
            RunStatus::Partial
        }
    }
}

/// Fetch and parse each source in turn, pausing `cooldown` between requests.
pub fn collect_prices(
    sources: &[&dyn PriceSource],
    date: NaiveDate,
    clock: &dyn Clock,
    cooldown: Duration,
) -> MergeOutcome {
    let mut runs = Vec::with_capacity(sources.len());
    let mut records = Vec::new();

    for (idx, source) in sources.iter().enumerate() {
        if idx > 0 && !cooldown.is_zero() {
            log::debug!("Cooling down {cooldown:?} before next exchange");
            thread::sleep(cooldown);
        }

        let exchange = source.exchange();
        let status = match source.fetch(date) {
            FetchOutcome::Rows(raw) => {
                let report = parse_response(&raw, &clock.timestamp());
                log::info!(
                    "{exchange}: {} records from {} rows ({} skipped)",
                    report.records.len(),
                    report.rows_read,
                    report.skipped.len()
                );
                if !report.fallbacks.is_empty() {
                    log::warn!(
                        "{exchange}: {} malformed fields defaulted to 0",
                        report.fallbacks.len()
                    );
                }
                records.extend(report.records.iter().cloned());
                SourceStatus::Parsed(report)
            }
            FetchOutcome::Empty => {
                log::warn!("{exchange}: no data for {date}");
                SourceStatus::Empty
            }
            FetchOutcome::Failed(err) => {
                log::warn!("{exchange}: fetch failed: {err}");
                SourceStatus::Failed(err)
            }
        };

        runs.push(SourceRun { exchange, status });
    }

    MergeOutcome {
        date,
        sources: runs,
        records,
    }
}

/// Result of the persist phase.
#[derive(Debug)]
pub enum Persistence {
    Written(SnapshotPaths),
    /// Nothing to write; existing files were left untouched.
    Skipped,
    Failed(SnapshotError),
}

/// Everything a run produced, for reporting and exit-code mapping.
#[derive(Debug)]
pub struct RunSummary {
    pub merge: MergeOutcome,
    pub persistence: Persistence,
}

impl RunSummary {
    /// Map the run to the process result.
    pub fn into_result(self) -> Result<(), AppError> {
        match self.persistence {
            Persistence::Written(_) => Ok(()),
            Persistence::Skipped => Err(AppError::no_data(format!(
                "No CB prices for {}; nothing persisted.",
                self.merge.date
            ))),
            Persistence::Failed(err) => Err(AppError::persistence(format!("Failed to persist CB prices: {err}"))),
        }
    }
}

/// Run the full pipeline against the given sources and writer.
pub fn run_with(
    sources: &[&dyn PriceSource],
    writer: &SnapshotWriter,
    date: NaiveDate,
    clock: &dyn Clock,
    cooldown: Duration,
) -> RunSummary {
    let merge = collect_prices(sources, date, clock, cooldown);

    let persistence = if merge.has_data() {
        match writer.write(date, &merge.records, clock) {
            Ok(paths) => Persistence::Written(paths),
            Err(err) => {
                log::error!("{err}");
                Persistence::Failed(err)
            }
        }
    } else {
        log::warn!("No exchange returned CB prices for {date}; leaving {} untouched", writer.dir().display());
        Persistence::Skipped
    };

    RunSummary { merge, persistence }
}

/// Run the pipeline against the live TWSE and TPEx endpoints.
pub fn run_ingest(settings: &Settings, date: NaiveDate, clock: &dyn Clock) -> Result<RunSummary, AppError> {
    let clients = Exchange::ALL
        .iter()
        .map(|&exchange| ExchangeClient::new(exchange, settings))
        .collect::<Result<Vec<_>, _>>()?;
    let sources: Vec<&dyn PriceSource> = clients.iter().map(|c| c as &dyn PriceSource).collect();
    let writer = SnapshotWriter::new(&settings.output_dir);

    Ok(run_with(&sources, &writer, date, clock, settings.cooldown))
}
