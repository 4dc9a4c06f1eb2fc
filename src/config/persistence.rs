//! Results persistence module
//!
//! Appends fixed-schema rows to the per-trial and summary CSV logs. Each
//! call opens the file, writes the header if the file is new, writes one
//! row and closes it again, so an interrupted sweep loses at most the row
//! in flight.

use crate::models::{SummaryResult, TrialResult};
use crate::{DiskMarkError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TRIAL_HEADER: &str = "Date, Time, Filesize(KiB), Pattern, ReadThroughput(MiB/s), \
WriteThroughput(MiB/s), ReadIOPS, WriteIOPS, CombinedIOPS, DeviceReadMiB/s, DeviceWriteMiB/s, \
DeviceReadIOPS, DeviceWriteIOPS, DeviceCombinedIOPS";

pub const SUMMARY_HEADER: &str = "Filesize(KiB), Pattern, AvgReadThroughput, AvgWriteThroughput, \
AvgReadIOPS, AvgWriteIOPS, CombinedIOPS";

/// Append one trial row to `path`
pub fn append_trial(path: &Path, trial: &TrialResult) -> Result<()> {
    append_row(path, TRIAL_HEADER, &trial_row(trial))
}

/// Append one summary row to `path`
pub fn append_summary(path: &Path, summary: &SummaryResult) -> Result<()> {
    append_row(path, SUMMARY_HEADER, &summary_row(summary))
}

/// Render a trial as a CSV row (no trailing newline)
pub fn trial_row(trial: &TrialResult) -> String {
    format!(
        "{},{},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
        trial.timestamp.format("%d.%m.%Y"),
        trial.timestamp.format("%H:%M:%S"),
        trial.workload.file_size_kib(),
        trial.workload.access_pattern,
        trial.read_throughput(),
        trial.write_throughput(),
        trial.read_iops(),
        trial.write_iops(),
        trial.combined_iops(),
        trial.device_read_mibps(),
        trial.device_write_mibps(),
        trial.device_read_iops(),
        trial.device_write_iops(),
        trial.device_combined_iops(),
    )
}

/// Render a summary as a CSV row (no trailing newline)
pub fn summary_row(summary: &SummaryResult) -> String {
    format!(
        "{},{},{:.2},{:.2},{:.2},{:.2},{:.2}",
        summary.file_size_kib(),
        summary.pattern,
        summary.avg_read_throughput,
        summary.avg_write_throughput,
        summary.avg_read_iops,
        summary.avg_write_iops,
        summary.combined_iops,
    )
}

fn append_row(path: &Path, header: &str, row: &str) -> Result<()> {
    let persistence_error = |e: std::io::Error| {
        DiskMarkError::PersistenceError(format!("{}: {}", path.display(), e))
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(persistence_error)?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(persistence_error)?;

    // An empty file is treated as new, so a crash before the header landed heals itself
    let is_new = file.metadata().map_err(persistence_error)?.len() == 0;

    let mut chunk = String::with_capacity(header.len() + row.len() + 2);
    if is_new {
        chunk.push_str(header);
        chunk.push('\n');
    }
    chunk.push_str(row);
    chunk.push('\n');

    file.write_all(chunk.as_bytes()).map_err(persistence_error)?;
    file.flush().map_err(persistence_error)
}

/// The two CSV artifacts of a sweep
#[derive(Debug, Clone)]
pub struct ResultsLog {
    trials_path: PathBuf,
    summary_path: PathBuf,
}

impl ResultsLog {
    pub fn new(trials_path: PathBuf, summary_path: PathBuf) -> Self {
        Self {
            trials_path,
            summary_path,
        }
    }

    pub fn append_trial(&self, trial: &TrialResult) -> Result<()> {
        append_trial(&self.trials_path, trial)
    }

    pub fn append_summary(&self, summary: &SummaryResult) -> Result<()> {
        append_summary(&self.summary_path, summary)
    }

    pub fn trials_path(&self) -> &Path {
        &self.trials_path
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AccessPattern, DeviceDelta, Operation, RateSample, WorkloadSpec,
    };
    use chrono::{Local, TimeZone};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_trial() -> TrialResult {
        let rate = |throughput: f64| RateSample {
            rounds: 2,
            elapsed: Duration::from_secs(1),
            throughput_mibps: throughput,
            iops: throughput * 16.0,
        };
        TrialResult {
            timestamp: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            workload: WorkloadSpec::new(
                1024 * 1024,
                64 * 1024,
                AccessPattern::Random,
                Operation::Write,
            )
            .unwrap(),
            write: Some(rate(100.0)),
            read: Some(rate(250.5)),
            device: DeviceDelta {
                read_bytes: 4 * 1024 * 1024,
                write_bytes: 2 * 1024 * 1024,
                read_ops: 30,
                write_ops: 10,
            },
            elapsed: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_trial_row_columns() {
        let row = trial_row(&create_test_trial());
        let cols: Vec<&str> = row.split(',').collect();
        assert_eq!(cols.len(), TRIAL_HEADER.split(',').count());
        assert_eq!(cols[0], "09.03.2024");
        assert_eq!(cols[1], "14:05:07");
        assert_eq!(cols[2], "1024");
        assert_eq!(cols[3], "random");
        assert_eq!(cols[4], "250.50");
        assert_eq!(cols[5], "100.00");
        assert_eq!(cols[8], format!("{:.2}", 250.5 * 16.0 + 100.0 * 16.0));
        assert_eq!(cols[9], "2.00");
        assert_eq!(cols[10], "1.00");
        assert_eq!(cols[13], "20.00");
    }

    #[test]
    fn test_header_written_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hddstats.csv");
        let trial = create_test_trial();

        append_trial(&path, &trial).unwrap();
        append_trial(&path, &trial).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TRIAL_HEADER);
        assert_eq!(content.matches("Date, Time").count(), 1);
    }

    #[test]
    fn test_existing_rows_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("summary.csv");
        fs::write(&path, format!("{}\n1,sequential,1,2,3,4,7\n", SUMMARY_HEADER)).unwrap();

        let summary = SummaryResult::from_trials(&[create_test_trial()]).unwrap();
        append_summary(&path, &summary).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1,sequential,1,2,3,4,7");
        assert!(lines[2].starts_with("1024,random,250.50,100.00,"));
    }

    #[test]
    fn test_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log = ResultsLog::new(
            temp_dir.path().join("out").join("trials.csv"),
            temp_dir.path().join("out").join("summary.csv"),
        );
        log.append_trial(&create_test_trial()).unwrap();
        assert!(log.trials_path().exists());
        assert!(!log.summary_path().exists());
    }

    #[test]
    fn test_unwritable_path_is_persistence_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened for append
        let err = append_trial(temp_dir.path(), &create_test_trial()).unwrap_err();
        assert!(matches!(err, DiskMarkError::PersistenceError(_)));
    }
}
