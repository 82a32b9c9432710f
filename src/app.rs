//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initialises logging
//! - loads settings from the environment
//! - runs the ingest pipeline
//! - prints the run summary and maps the outcome to an exit code

use clap::Parser;

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `cb-prices` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging();

    let mut settings = Settings::from_env()?;
    if let Some(dir) = cli.out_dir {
        settings.output_dir = dir;
    }

    let clock = SystemClock;
    let date = cli.date.unwrap_or_else(|| clock.today());
    log::info!("Starting CB price ingest for {date} into {}", settings.output_dir.display());

    let summary = pipeline::run_ingest(&settings, date, &clock)?;
    println!("{}", crate::report::format_run_summary(&summary));

    summary.into_result()
}

fn init_logging() {
    // `try_init` so embedding callers (and tests) that already set a logger win.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
