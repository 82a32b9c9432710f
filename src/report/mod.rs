//! Reporting utilities: the human-readable run summary.

pub mod format;

pub use format::format_run_summary;
