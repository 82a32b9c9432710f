//! Persist a run's records as a dated snapshot plus the `latest.json` envelope.
//!
//! Layout: `{dir}/cb_prices_{YYYYMMDD}.json` and `{dir}/latest.json`.
//!
//! Each file is written to `{name}.tmp` and renamed into place, so readers never
//! see a half-written file. The pair itself is not transactional: if the dated
//! write succeeds and the latest write fails, the two disagree until the next
//! successful run.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::clock::Clock;
use crate::domain::{COMPACT_DATE_FORMAT, CbPriceRecord, LatestPriceEnvelope};

pub const LATEST_FILE_NAME: &str = "latest.json";

pub fn dated_file_name(date: NaiveDate) -> String {
    format!("cb_prices_{}.json", date.format(COMPACT_DATE_FORMAT))
}

/// A single file that could not be written.
#[derive(Debug)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.path.display(), self.error)
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no records to persist")]
    NoData,

    #[error("failed to create output directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", join_failures(.failures))]
    Write {
        /// Files that did land; the run is still a failure.
        written: Vec<PathBuf>,
        failures: Vec<WriteFailure>,
    },
}

fn join_failures(failures: &[WriteFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Paths written by a successful `SnapshotWriter::write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub dated: PathBuf,
    pub latest: PathBuf,
}

pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dated_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(dated_file_name(date))
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE_NAME)
    }

    /// Write the dated snapshot, then the latest envelope, from the same records.
    ///
    /// Both writes are always attempted; the call succeeds only if both land.
    pub fn write(
        &self,
        date: NaiveDate,
        records: &[CbPriceRecord],
        clock: &dyn Clock,
    ) -> Result<SnapshotPaths, SnapshotError> {
        if records.is_empty() {
            return Err(SnapshotError::NoData);
        }

        fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let dated = self.dated_path(date);
        let latest = self.latest_path();
        let envelope = LatestPriceEnvelope::new(clock.timestamp(), date, records.to_vec());

        let mut written = Vec::new();
        let mut failures = Vec::new();

        match write_json_atomic(&dated, &records) {
            Ok(()) => {
                log::info!("Wrote {} records to {}", records.len(), dated.display());
                written.push(dated.clone());
            }
            Err(error) => failures.push(WriteFailure {
                path: dated.clone(),
                error,
            }),
        }

        match write_json_atomic(&latest, &envelope) {
            Ok(()) => {
                log::info!("Updated {}", latest.display());
                written.push(latest.clone());
            }
            Err(error) => failures.push(WriteFailure {
                path: latest.clone(),
                error,
            }),
        }

        if failures.is_empty() {
            Ok(SnapshotPaths { dated, latest })
        } else {
            Err(SnapshotError::Write { written, failures })
        }
    }
}

/// Read a dated snapshot file.
pub fn read_snapshot(path: &Path) -> io::Result<Vec<CbPriceRecord>> {
    read_json(path)
}

/// Read a `latest.json` envelope.
pub fn read_latest(path: &Path) -> io::Result<LatestPriceEnvelope> {
    read_json(path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(io::BufReader::new(file))?)
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");

    let result = (|| -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock::at_local(date(), 15, 0, 0).unwrap()
    }

    fn record(code: &str, close: f64) -> CbPriceRecord {
        CbPriceRecord {
            code: code.to_string(),
            name: format!("{code}轉一"),
            close_price: close,
            change: 0.5,
            change_percent: 0.46,
            volume: 12,
            update_time: "2025-03-07 14:30:00".to_string(),
        }
    }

    #[test]
    fn dated_and_latest_files_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(tmp.path().join("prices"));
        let records = vec![record("2890", 101.5), record("35031", 110.0)];

        let paths = writer.write(date(), &records, &clock()).unwrap();
        assert!(paths.dated.ends_with("cb_prices_20250307.json"));
        assert!(paths.latest.ends_with("latest.json"));

        let dated = read_snapshot(&paths.dated).unwrap();
        let latest = read_latest(&paths.latest).unwrap();
        assert_eq!(dated, records);
        assert_eq!(latest.data, dated);
        assert_eq!(latest.count, latest.data.len());
        assert_eq!(latest.date, "20250307");
        assert_eq!(latest.update_time, "2025-03-07 15:00:00");
    }

    #[test]
    fn rewriting_the_same_date_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(tmp.path());

        writer.write(date(), &[record("2890", 101.5), record("2891", 99.0)], &clock()).unwrap();
        writer.write(date(), &[record("2890", 102.0)], &clock()).unwrap();

        let dated = read_snapshot(&writer.dated_path(date())).unwrap();
        assert_eq!(dated, vec![record("2890", 102.0)]);
        assert_eq!(read_latest(&writer.latest_path()).unwrap().count, 1);

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn empty_input_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("prices");
        let writer = SnapshotWriter::new(&dir);

        let err = writer.write(date(), &[], &clock()).unwrap_err();
        assert!(matches!(err, SnapshotError::NoData));
        assert!(!dir.exists());
    }

    #[test]
    fn non_ascii_names_are_written_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(tmp.path());
        let paths = writer.write(date(), &[record("2890", 101.5)], &clock()).unwrap();

        let text = fs::read_to_string(paths.dated).unwrap();
        assert!(text.contains("2890轉一"));
        assert!(text.contains("\n  {"), "expected two-space indentation:\n{text}");
    }

    #[test]
    fn dated_failure_still_writes_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(tmp.path());
        // A directory squatting on the dated file name makes the rename fail.
        fs::create_dir(writer.dated_path(date())).unwrap();

        let err = writer.write(date(), &[record("2890", 101.5)], &clock()).unwrap_err();
        match err {
            SnapshotError::Write { written, failures } => {
                assert_eq!(written, vec![writer.latest_path()]);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].path, writer.dated_path(date()));
            }
            other => panic!("expected write failure, got {other:?}"),
        }
        assert_eq!(read_latest(&writer.latest_path()).unwrap().count, 1);
    }

    #[test]
    fn unusable_directory_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let writer = SnapshotWriter::new(blocker.join("prices"));
        let err = writer.write(date(), &[record("2890", 101.5)], &clock()).unwrap_err();
        assert!(matches!(err, SnapshotError::CreateDir { .. }));
    }
}
