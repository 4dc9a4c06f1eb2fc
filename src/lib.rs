//! diskmark - storage throughput sweep
//!
//! Measures raw read/write throughput and IOPS of a storage device with
//! synthetic workload files, cross-checks the numbers against the host's
//! per-device counters, and appends per-trial and summary rows to CSV logs.

use std::fmt;
use std::path::PathBuf;

pub mod bench;
pub mod config;
pub mod console;
pub mod io;
pub mod models;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum DiskMarkError {
    /// Workload file could not be created (already exists, bad directory, ...)
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Write or seek failed while filling a workload file
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Read or seek failed while draining a workload file
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Configured block device is absent from the host counter table
    DeviceNotFound {
        device: String,
        available: Vec<String>,
    },
    /// Sweep configuration rejected by validation or parsing
    ConfigInvalid(String),
    /// Any other I/O failure
    Io(std::io::Error),
    /// CSV/JSON results could not be written
    PersistenceError(String),
}

impl fmt::Display for DiskMarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskMarkError::CreateFailed { path, source } => {
                write!(f, "Failed to create {}: {}", path.display(), source)
            }
            DiskMarkError::WriteFailed { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            DiskMarkError::ReadFailed { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            DiskMarkError::DeviceNotFound { device, available } => {
                if available.is_empty() {
                    write!(f, "Device '{}' not found in host disk counters", device)
                } else {
                    write!(
                        f,
                        "Device '{}' not found in host disk counters (known: {})",
                        device,
                        available.join(", ")
                    )
                }
            }
            DiskMarkError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            DiskMarkError::Io(err) => write!(f, "I/O error: {}", err),
            DiskMarkError::PersistenceError(msg) => write!(f, "Results persistence error: {}", msg),
        }
    }
}

impl std::error::Error for DiskMarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiskMarkError::CreateFailed { source, .. }
            | DiskMarkError::WriteFailed { source, .. }
            | DiskMarkError::ReadFailed { source, .. } => Some(source),
            DiskMarkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DiskMarkError {
    fn from(err: std::io::Error) -> Self {
        DiskMarkError::Io(err)
    }
}

impl From<serde_json::Error> for DiskMarkError {
    fn from(err: serde_json::Error) -> Self {
        DiskMarkError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for DiskMarkError {
    fn from(err: toml::de::Error) -> Self {
        DiskMarkError::ConfigInvalid(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for DiskMarkError {
    fn from(err: toml::ser::Error) -> Self {
        DiskMarkError::ConfigInvalid(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for diskmark operations
pub type Result<T> = std::result::Result<T, DiskMarkError>;

/// Error handling utilities
pub mod error {
    use super::DiskMarkError;

    /// Convert error to a one-line operator hint naming the failing path or device
    pub fn user_friendly_message(error: &DiskMarkError) -> String {
        match error {
            DiskMarkError::CreateFailed { path, source } => match source.kind() {
                std::io::ErrorKind::AlreadyExists => format!(
                    "Workload file {} already exists. Remove it or pick another target directory.",
                    path.display()
                ),
                std::io::ErrorKind::PermissionDenied => format!(
                    "Permission denied creating {}. Check directory permissions.",
                    path.display()
                ),
                _ => format!("Could not create {}: {}", path.display(), source),
            },
            DiskMarkError::WriteFailed { path, .. } => format!(
                "Writing {} failed. Check free space on the target device. ({})",
                path.display(),
                error
            ),
            DiskMarkError::ReadFailed { path, .. } => {
                format!("Reading {} failed. ({})", path.display(), error)
            }
            DiskMarkError::DeviceNotFound { .. } => format!(
                "{}. Pass --device with one of the host's block devices.",
                error
            ),
            DiskMarkError::ConfigInvalid(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            DiskMarkError::PersistenceError(_) => {
                format!("Failed to save results: {}", error)
            }
            DiskMarkError::Io(_) => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "diskmark";
pub const CONFIG_FILE: &str = "diskmark.toml";
pub const TRIALS_FILE: &str = "hddstats.csv";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const TEMP_FILE_PREFIX: &str = "tempfile";
pub const MIB: f64 = 1024.0 * 1024.0;
