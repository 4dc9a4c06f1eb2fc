//! Configuration management module
//!
//! Handles loading, saving, and validation of the sweep configuration.

use crate::io::counters::{default_device, CounterSource, DEFAULT_DISKSTATS_PATH};
use crate::models::{AccessPattern, Operation, WorkloadSpec};
use crate::{DiskMarkError, Result, APP_NAME, CONFIG_FILE, SUMMARY_FILE, TRIALS_FILE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod persistence;

/// File sizes swept by default, in KiB
pub const DEFAULT_FILE_SIZES_KIB: &[u64] = &[
    1, 2, 4, 16, 32, 64, 128, 256, 512, 1024, 10240, 102400,
];

/// Sweep configuration: every parameter of a benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Directory the workload files are created in
    pub target_dir: PathBuf,
    /// Ordered file sizes to sweep (in bytes)
    pub file_sizes: Vec<u64>,
    /// Block size for I/O operations (in bytes)
    pub block_size: u64,
    /// Ordered access patterns to sweep
    pub patterns: Vec<AccessPattern>,
    /// Timed operations per trial, in execution order
    pub operations: Vec<Operation>,
    /// Trials per (file size, pattern) configuration
    pub trial_count: usize,
    /// Duration budget of each timed loop
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Block device whose counters bracket each trial
    pub device: String,
    /// Counter table in /proc/diskstats format
    pub diskstats_path: PathBuf,
    /// Per-trial CSV log
    pub trials_log: PathBuf,
    /// Per-configuration summary CSV log
    pub summary_log: PathBuf,
    /// Whether to keep workload files after each trial
    pub keep_temp_files: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            file_sizes: DEFAULT_FILE_SIZES_KIB.iter().map(|kib| kib * 1024).collect(),
            block_size: 1024, // smallest default file size
            patterns: vec![AccessPattern::Sequential],
            operations: vec![Operation::Write, Operation::Read],
            trial_count: 3,
            duration: Duration::from_secs(5),
            device: default_device().to_string(),
            diskstats_path: PathBuf::from(DEFAULT_DISKSTATS_PATH),
            trials_log: PathBuf::from(TRIALS_FILE),
            summary_log: PathBuf::from(SUMMARY_FILE),
            keep_temp_files: false,
        }
    }
}

impl SweepConfig {
    /// Create a new sweep configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.target_dir.exists() {
            return Err(DiskMarkError::ConfigInvalid(format!(
                "Target directory does not exist: {}",
                self.target_dir.display()
            )));
        }

        if !self.target_dir.is_dir() {
            return Err(DiskMarkError::ConfigInvalid(format!(
                "Target path is not a directory: {}",
                self.target_dir.display()
            )));
        }

        if self.file_sizes.is_empty() {
            return Err(DiskMarkError::ConfigInvalid(
                "At least one file size is required".to_string(),
            ));
        }

        if self.block_size == 0 {
            return Err(DiskMarkError::ConfigInvalid(
                "Block size must be greater than 0".to_string(),
            ));
        }

        for &size in &self.file_sizes {
            if size == 0 {
                return Err(DiskMarkError::ConfigInvalid(
                    "File size must be greater than 0".to_string(),
                ));
            }
            if size % 1024 != 0 {
                return Err(DiskMarkError::ConfigInvalid(format!(
                    "File size {} is not a whole number of KiB",
                    size
                )));
            }
            if size < self.block_size {
                return Err(DiskMarkError::ConfigInvalid(format!(
                    "Block size {} exceeds file size {}",
                    self.block_size, size
                )));
            }
        }

        if self.patterns.is_empty() {
            return Err(DiskMarkError::ConfigInvalid(
                "At least one access pattern is required".to_string(),
            ));
        }

        if self.operations.is_empty() {
            return Err(DiskMarkError::ConfigInvalid(
                "At least one operation is required".to_string(),
            ));
        }

        for (i, operation) in self.operations.iter().enumerate() {
            if self.operations[..i].contains(operation) {
                return Err(DiskMarkError::ConfigInvalid(format!(
                    "Operation '{}' is listed more than once",
                    operation
                )));
            }
        }

        if self.trial_count == 0 {
            return Err(DiskMarkError::ConfigInvalid(
                "Trial count must be greater than 0".to_string(),
            ));
        }

        if self.duration.is_zero() {
            return Err(DiskMarkError::ConfigInvalid(
                "Duration must be greater than 0".to_string(),
            ));
        }

        if self.device.trim().is_empty() {
            return Err(DiskMarkError::ConfigInvalid(
                "Device name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Workload templates in sweep order: file sizes outer, patterns inner
    ///
    /// The template's operation is the first configured one; the trial
    /// runner switches it per timed loop.
    pub fn workloads(&self) -> Result<Vec<WorkloadSpec>> {
        let operation = self.operations.first().copied().unwrap_or(Operation::Write);
        let mut workloads = Vec::with_capacity(self.file_sizes.len() * self.patterns.len());
        for &size in &self.file_sizes {
            for &pattern in &self.patterns {
                workloads.push(WorkloadSpec::new(size, self.block_size, pattern, operation)?);
            }
        }
        Ok(workloads)
    }

    /// Counter source implied by `diskstats_path` on this platform
    pub fn counter_source(&self) -> CounterSource {
        match CounterSource::platform_default() {
            CounterSource::Diskstats(_) => CounterSource::Diskstats(self.diskstats_path.clone()),
            CounterSource::Unsupported => CounterSource::Unsupported,
        }
    }

    /// Set the directory workload files are created in
    pub fn with_target_dir(mut self, dir: PathBuf) -> Self {
        self.target_dir = dir;
        self
    }

    /// Set the ordered file sizes (in bytes)
    pub fn with_file_sizes(mut self, sizes: Vec<u64>) -> Self {
        self.file_sizes = sizes;
        self
    }

    /// Set the block size for I/O operations
    pub fn with_block_size(mut self, size: u64) -> Self {
        self.block_size = size;
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<AccessPattern>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_operations(mut self, operations: Vec<Operation>) -> Self {
        self.operations = operations;
        self
    }

    pub fn with_trial_count(mut self, count: usize) -> Self {
        self.trial_count = count;
        self
    }

    /// Set the per-loop duration budget
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Set both CSV log locations
    pub fn with_logs(mut self, trials_log: PathBuf, summary_log: PathBuf) -> Self {
        self.trials_log = trials_log;
        self.summary_log = summary_log;
        self
    }

    /// Set whether to keep workload files
    pub fn with_keep_temp_files(mut self, keep: bool) -> Self {
        self.keep_temp_files = keep;
        self
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file
    ///
    /// Not validated here: CLI overrides are layered on top first.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DiskMarkError::ConfigInvalid(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            DiskMarkError::ConfigInvalid(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_file_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    DiskMarkError::ConfigInvalid(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(path, content).map_err(|e| {
            DiskMarkError::ConfigInvalid(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/diskmark/diskmark.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DiskMarkError::ConfigInvalid("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

// Durations are written as humantime strings ("5s", "1m 30s")
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn valid_config(dir: &Path) -> SweepConfig {
        SweepConfig::new()
            .with_target_dir(dir.to_path_buf())
            .with_file_sizes(vec![64 * 1024, 1024 * 1024])
            .with_block_size(64 * 1024)
    }

    #[test]
    fn test_defaults_follow_size_table() {
        let config = SweepConfig::default();
        assert_eq!(config.file_sizes.first(), Some(&1024));
        assert_eq!(config.file_sizes.last(), Some(&(102400 * 1024)));
        assert_eq!(config.block_size, 1024);
        assert_eq!(config.duration, Duration::from_secs(5));
        assert_eq!(config.operations, vec![Operation::Write, Operation::Read]);
        assert_eq!(config.trials_log, PathBuf::from("hddstats.csv"));
    }

    #[test]
    fn test_validate_accepts_valid() {
        let dir = tempdir().unwrap();
        assert!(valid_config(dir.path()).validate().is_ok());

        let defaults = SweepConfig::default().with_target_dir(dir.path().to_path_buf());
        assert!(defaults.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = tempdir().unwrap();
        let base = valid_config(dir.path());

        let cases = vec![
            base.clone().with_file_sizes(vec![]),
            base.clone().with_file_sizes(vec![0]),
            base.clone().with_block_size(0),
            base.clone().with_file_sizes(vec![1024]),
            base.clone().with_trial_count(0),
            base.clone().with_duration(Duration::ZERO),
            base.clone().with_patterns(vec![]),
            base.clone().with_operations(vec![]),
            base.clone()
                .with_operations(vec![Operation::Read, Operation::Write, Operation::Read]),
            base.clone().with_file_sizes(vec![64 * 1024 + 512]),
            base.clone().with_device(" "),
            base.clone().with_target_dir(dir.path().join("missing")),
        ];

        for config in cases {
            assert!(matches!(
                config.validate(),
                Err(DiskMarkError::ConfigInvalid(_))
            ));
        }
    }

    #[test]
    fn test_sizes_must_be_whole_kib() {
        let dir = tempdir().unwrap();
        let config = valid_config(dir.path()).with_block_size(512);

        for size in [512, 1536, 4096 + 1] {
            let err = config.clone().with_file_sizes(vec![size]).validate().unwrap_err();
            assert!(err.to_string().contains("whole number of KiB"));
        }
        assert!(config.with_file_sizes(vec![1024, 4096]).validate().is_ok());
    }

    #[test]
    fn test_duplicate_operations_rejected() {
        let dir = tempdir().unwrap();
        let err = valid_config(dir.path())
            .with_operations(vec![Operation::Write, Operation::Write])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_workloads_order() {
        let dir = tempdir().unwrap();
        let config = valid_config(dir.path())
            .with_patterns(vec![AccessPattern::Sequential, AccessPattern::Random]);
        let workloads = config.workloads().unwrap();

        let shape: Vec<(u64, AccessPattern)> = workloads
            .iter()
            .map(|w| (w.file_size_bytes, w.access_pattern))
            .collect();
        assert_eq!(
            shape,
            vec![
                (64 * 1024, AccessPattern::Sequential),
                (64 * 1024, AccessPattern::Random),
                (1024 * 1024, AccessPattern::Sequential),
                (1024 * 1024, AccessPattern::Random),
            ]
        );
    }

    #[test]
    fn test_toml_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("diskmark.toml");
        let config = valid_config(dir.path())
            .with_duration(Duration::from_millis(1500))
            .with_patterns(vec![AccessPattern::Random])
            .with_device("nvme0n1");

        config.save_to(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("duration = \"1s 500ms\""));
        assert!(text.contains("\"random\""));

        let loaded = SweepConfig::load_from(&path).unwrap();
        assert_eq!(loaded.duration, Duration::from_millis(1500));
        assert_eq!(loaded.patterns, vec![AccessPattern::Random]);
        assert_eq!(loaded.device, "nvme0n1");
        assert_eq!(loaded.file_sizes, config.file_sizes);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "trial_count = 7\nduration = \"2s\"\n").unwrap();

        let loaded = SweepConfig::load_from(&path).unwrap();
        assert_eq!(loaded.trial_count, 7);
        assert_eq!(loaded.duration, Duration::from_secs(2));
        assert_eq!(loaded.block_size, 1024);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "duration = \"forever\"\n").unwrap();
        assert!(matches!(
            SweepConfig::load_from(&path),
            Err(DiskMarkError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_config_file_path() {
        if let Ok(path) = SweepConfig::config_file_path() {
            assert!(path.ends_with("diskmark/diskmark.toml"));
        }
    }
}
