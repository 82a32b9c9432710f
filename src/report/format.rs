//! Terminal summary of a run.
//!
//! Kept separate from the pipeline so log output and the human-facing
//! summary can change independently.

use crate::app::pipeline::{MergeOutcome, Persistence, RunStatus, RunSummary, SourceRun, SourceStatus};
use crate::io::ingest::{ParseReport, SkipReason};

const RULE: &str = "============================================================";

/// Format the end-of-run summary printed by the binary.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("CB price ingest for {}\n", summary.merge.date));
    out.push_str(RULE);
    out.push('\n');

    for run in &summary.merge.sources {
        out.push_str(&format_source_line(run));
        out.push('\n');
    }

    out.push_str(&format!(
        "\nStatus: {} ({} records)\n",
        status_label(&summary.merge, &summary.persistence),
        summary.merge.records.len()
    ));

    match &summary.persistence {
        Persistence::Written(paths) => {
            out.push_str(&format!("Snapshot: {}\n", paths.dated.display()));
            out.push_str(&format!("Latest:   {}\n", paths.latest.display()));
        }
        Persistence::Skipped => out.push_str("No data to persist today; existing files left untouched.\n"),
        Persistence::Failed(err) => out.push_str(&format!("Persist failed: {err}\n")),
    }

    out.push_str(RULE);
    out
}

fn format_source_line(run: &SourceRun) -> String {
    let label = format!("{:<5}", run.exchange.display_name());
    match &run.status {
        SourceStatus::Parsed(report) => format!("{label} ok      {}", describe_report(report)),
        SourceStatus::Empty => format!("{label} no data"),
        SourceStatus::Failed(err) => format!("{label} failed  {err}"),
    }
}

fn describe_report(report: &ParseReport) -> String {
    let no_trade = count_reason(report, |r| matches!(r, SkipReason::NoTrade));
    let excluded = count_reason(report, |r| matches!(r, SkipReason::NotConvertible));
    let malformed = report.malformed_count();

    let mut parts = vec![format!("{} rows", report.rows_read)];
    if no_trade > 0 {
        parts.push(format!("{no_trade} no trade"));
    }
    if excluded > 0 {
        parts.push(format!("{excluded} not convertible"));
    }
    if malformed > 0 {
        parts.push(format!("{malformed} malformed"));
    }
    if !report.fallbacks.is_empty() {
        parts.push(format!("{} fields defaulted", report.fallbacks.len()));
    }

    format!("{} records ({})", report.records.len(), parts.join(", "))
}

fn count_reason(report: &ParseReport, pred: impl Fn(&SkipReason) -> bool) -> usize {
    report.skipped.iter().filter(|s| pred(&s.reason)).count()
}

fn status_label(merge: &MergeOutcome, persistence: &Persistence) -> &'static str {
    if matches!(persistence, Persistence::Failed(_)) {
        return "FAILED";
    }
    match merge.status() {
        RunStatus::Success => "OK",
        RunStatus::Partial => "PARTIAL",
        RunStatus::NoData => "NO DATA",
    }
}
