//! Trial and summary result data models
//!
//! Contains the per-trial measurement record, the device counter samples
//! that bracket a trial, and the per-configuration average.

use crate::models::workload::{AccessPattern, WorkloadSpec};
use crate::util::units::round2;
use crate::{DiskMarkError, Result, MIB};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application-measured rate for one direction of a trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    /// Completed full-file passes
    pub rounds: u64,
    /// Wall-clock time of the drive loop
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// Throughput in MiB per second
    pub throughput_mibps: f64,
    /// Throughput re-expressed in block-sized operations per second
    pub iops: f64,
}

/// Cumulative device counters at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCounterSnapshot {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ops: u64,
    pub write_ops: u64,
}

/// Difference between two counter snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDelta {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ops: u64,
    pub write_ops: u64,
}

impl DeviceCounterSnapshot {
    /// Counters accumulated since `earlier`
    ///
    /// Saturates at zero so a counter reset between samples never underflows.
    pub fn delta_since(&self, earlier: &DeviceCounterSnapshot) -> DeviceDelta {
        DeviceDelta {
            read_bytes: self.read_bytes.saturating_sub(earlier.read_bytes),
            write_bytes: self.write_bytes.saturating_sub(earlier.write_bytes),
            read_ops: self.read_ops.saturating_sub(earlier.read_ops),
            write_ops: self.write_ops.saturating_sub(earlier.write_ops),
        }
    }
}

impl DeviceDelta {
    pub fn read_mibps(&self, elapsed: Duration) -> f64 {
        per_second(self.read_bytes as f64 / MIB, elapsed)
    }

    pub fn write_mibps(&self, elapsed: Duration) -> f64 {
        per_second(self.write_bytes as f64 / MIB, elapsed)
    }

    pub fn read_iops(&self, elapsed: Duration) -> f64 {
        per_second(self.read_ops as f64, elapsed)
    }

    pub fn write_iops(&self, elapsed: Duration) -> f64 {
        per_second(self.write_ops as f64, elapsed)
    }

    pub fn combined_iops(&self, elapsed: Duration) -> f64 {
        self.read_iops(elapsed) + self.write_iops(elapsed)
    }
}

fn per_second(amount: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        amount / secs
    } else {
        0.0
    }
}

/// One measured trial: timed write and/or read loops bracketed by device samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Local time the trial finished
    pub timestamp: DateTime<Local>,
    pub workload: WorkloadSpec,
    pub write: Option<RateSample>,
    pub read: Option<RateSample>,
    /// Device counter delta across the whole trial
    pub device: DeviceDelta,
    /// Wall-clock time between the two device samples
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
}

impl TrialResult {
    pub fn write_throughput(&self) -> f64 {
        self.write.map(|r| r.throughput_mibps).unwrap_or(0.0)
    }

    pub fn read_throughput(&self) -> f64 {
        self.read.map(|r| r.throughput_mibps).unwrap_or(0.0)
    }

    pub fn write_iops(&self) -> f64 {
        self.write.map(|r| r.iops).unwrap_or(0.0)
    }

    pub fn read_iops(&self) -> f64 {
        self.read.map(|r| r.iops).unwrap_or(0.0)
    }

    pub fn combined_iops(&self) -> f64 {
        self.read_iops() + self.write_iops()
    }

    pub fn device_read_mibps(&self) -> f64 {
        self.device.read_mibps(self.elapsed)
    }

    pub fn device_write_mibps(&self) -> f64 {
        self.device.write_mibps(self.elapsed)
    }

    pub fn device_read_iops(&self) -> f64 {
        self.device.read_iops(self.elapsed)
    }

    pub fn device_write_iops(&self) -> f64 {
        self.device.write_iops(self.elapsed)
    }

    pub fn device_combined_iops(&self) -> f64 {
        self.device.combined_iops(self.elapsed)
    }
}

/// Arithmetic mean over all trials of one (file size, pattern) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub file_size_bytes: u64,
    pub block_size_bytes: u64,
    pub pattern: AccessPattern,
    pub trial_count: usize,
    pub avg_read_throughput: f64,
    pub avg_write_throughput: f64,
    pub avg_read_iops: f64,
    pub avg_write_iops: f64,
    pub combined_iops: f64,
}

impl SummaryResult {
    /// Average the ordered trial sequence of a single configuration
    ///
    /// Simple mean, no outlier rejection.
    pub fn from_trials(trials: &[TrialResult]) -> Result<Self> {
        let first = trials.first().ok_or_else(|| {
            DiskMarkError::ConfigInvalid("Cannot summarize zero trials".to_string())
        })?;

        let mean = |f: fn(&TrialResult) -> f64| -> f64 {
            trials.iter().map(f).sum::<f64>() / trials.len() as f64
        };

        let avg_read_iops = mean(TrialResult::read_iops);
        let avg_write_iops = mean(TrialResult::write_iops);

        Ok(Self {
            file_size_bytes: first.workload.file_size_bytes,
            block_size_bytes: first.workload.block_size_bytes,
            pattern: first.workload.access_pattern,
            trial_count: trials.len(),
            avg_read_throughput: mean(TrialResult::read_throughput),
            avg_write_throughput: mean(TrialResult::write_throughput),
            avg_read_iops,
            avg_write_iops,
            combined_iops: avg_read_iops + avg_write_iops,
        })
    }

    pub fn file_size_kib(&self) -> u64 {
        self.file_size_bytes / 1024
    }

    /// Copy with every average rounded to 2 decimals, for display
    pub fn rounded(&self) -> Self {
        Self {
            avg_read_throughput: round2(self.avg_read_throughput),
            avg_write_throughput: round2(self.avg_write_throughput),
            avg_read_iops: round2(self.avg_read_iops),
            avg_write_iops: round2(self.avg_write_iops),
            combined_iops: round2(self.combined_iops),
            ..self.clone()
        }
    }

    /// Human-readable one-liner, values rounded to 2 decimals
    pub fn summary(&self) -> String {
        format!(
            "{} KiB {} - read {:.2} MiB/s ({:.2} IOPS) - write {:.2} MiB/s ({:.2} IOPS) - combined {:.2} IOPS",
            self.file_size_kib(),
            self.pattern,
            self.avg_read_throughput,
            self.avg_read_iops,
            self.avg_write_throughput,
            self.avg_write_iops,
            self.combined_iops
        )
    }
}

// Durations are stored as nanoseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workload::Operation;

    fn workload() -> WorkloadSpec {
        WorkloadSpec::new(
            1024 * 1024,
            64 * 1024,
            AccessPattern::Sequential,
            Operation::Write,
        )
        .unwrap()
    }

    fn rate(throughput: f64, iops: f64) -> RateSample {
        RateSample {
            rounds: 3,
            elapsed: Duration::from_secs(2),
            throughput_mibps: throughput,
            iops,
        }
    }

    fn trial(read: f64, write: f64) -> TrialResult {
        TrialResult {
            timestamp: Local::now(),
            workload: workload(),
            write: Some(rate(write, write * 16.0)),
            read: Some(rate(read, read * 16.0)),
            device: DeviceDelta::default(),
            elapsed: Duration::from_secs(4),
        }
    }

    #[test]
    fn test_delta_since() {
        let before = DeviceCounterSnapshot {
            read_bytes: 1000,
            write_bytes: 2000,
            read_ops: 10,
            write_ops: 20,
        };
        let after = DeviceCounterSnapshot {
            read_bytes: 1000 + 2 * 1024 * 1024,
            write_bytes: 2000 + 4 * 1024 * 1024,
            read_ops: 14,
            write_ops: 60,
        };
        let delta = after.delta_since(&before);
        assert_eq!(delta.read_ops, 4);
        assert_eq!(delta.write_ops, 40);

        let elapsed = Duration::from_secs(2);
        assert!((delta.read_mibps(elapsed) - 1.0).abs() < 1e-9);
        assert!((delta.write_mibps(elapsed) - 2.0).abs() < 1e-9);
        assert!((delta.combined_iops(elapsed) - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_delta_saturates_on_counter_reset() {
        let before = DeviceCounterSnapshot {
            read_bytes: 500,
            ..Default::default()
        };
        let delta = DeviceCounterSnapshot::default().delta_since(&before);
        assert_eq!(delta, DeviceDelta::default());
        assert_eq!(delta.read_mibps(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_missing_direction_reports_zero() {
        let mut t = trial(10.0, 20.0);
        t.read = None;
        assert_eq!(t.read_throughput(), 0.0);
        assert_eq!(t.read_iops(), 0.0);
        assert_eq!(t.combined_iops(), t.write_iops());
    }

    #[test]
    fn test_summary_is_arithmetic_mean() {
        let trials = vec![trial(100.0, 50.0), trial(110.0, 55.0), trial(120.5, 61.25)];
        let summary = SummaryResult::from_trials(&trials).unwrap();

        let mean_read = (100.0 + 110.0 + 120.5) / 3.0;
        assert_eq!(round2(summary.avg_read_throughput), round2(mean_read));
        assert_eq!(
            round2(summary.avg_write_throughput),
            round2((50.0 + 55.0 + 61.25) / 3.0)
        );
        assert_eq!(summary.trial_count, 3);
        assert_eq!(summary.file_size_kib(), 1024);
        assert!(
            (summary.combined_iops - (summary.avg_read_iops + summary.avg_write_iops)).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_summary_of_nothing_fails() {
        assert!(matches!(
            SummaryResult::from_trials(&[]),
            Err(DiskMarkError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_summary_line_rounds() {
        let summary = SummaryResult::from_trials(&[trial(1.0 / 3.0, 2.0)]).unwrap();
        let line = summary.summary();
        assert!(line.contains("1024 KiB sequential"));
        assert!(line.contains("read 0.33 MiB/s"));
    }

    #[test]
    fn test_rounded_keeps_shape() {
        let summary = SummaryResult::from_trials(&[trial(1.0 / 3.0, 2.0 / 3.0)]).unwrap();
        let rounded = summary.rounded();

        assert_eq!(rounded.avg_read_throughput, 0.33);
        assert_eq!(rounded.avg_write_throughput, 0.67);
        assert_eq!(rounded.file_size_bytes, summary.file_size_bytes);
        assert_eq!(rounded.trial_count, 1);

        let json = serde_json::to_string(&rounded).unwrap();
        assert!(json.contains("\"avg_read_throughput\":0.33"));
    }

    #[test]
    fn test_trial_json_roundtrip() {
        let t = trial(12.5, 7.25);
        let json = serde_json::to_string(&t).unwrap();
        let back: TrialResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.workload, t.workload);
        assert_eq!(back.read, t.read);
        assert_eq!(back.elapsed, t.elapsed);
    }
}
