//! Command-line parsing for the daily CB price ingest.
//!
//! With no arguments the binary ingests "today" on the exchange calendar and
//! writes to the configured directory, which is what the daily cron job runs.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "cb-prices",
    version,
    about = "Fetch TWSE/TPEx convertible-bond closes and write dated + latest JSON snapshots"
)]
pub struct Cli {
    /// Trading date to ingest (YYYYMMDD or YYYY-MM-DD). Defaults to today (UTC+8).
    #[arg(long, value_parser = parse_trading_date)]
    pub date: Option<NaiveDate>,

    /// Output directory. Overrides CB_PRICES_DIR.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

fn parse_trading_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| format!("expected YYYYMMDD or YYYY-MM-DD, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_today_and_configured_dir() {
        let cli = Cli::try_parse_from(["cb-prices"]).unwrap();
        assert!(cli.date.is_none());
        assert!(cli.out_dir.is_none());
    }

    #[test]
    fn date_accepts_both_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        for arg in ["20250307", "2025-03-07"] {
            let cli = Cli::try_parse_from(["cb-prices", "--date", arg]).unwrap();
            assert_eq!(cli.date, Some(expected));
        }
        assert!(Cli::try_parse_from(["cb-prices", "--date", "07/03/2025"]).is_err());
    }
}
