//! Host disk counter sampling
//!
//! Reads cumulative per-device byte and operation counters so a trial can
//! be cross-checked against what the block device itself reports. On Linux
//! the counters come from `/proc/diskstats`; other platforms have no
//! supported source and every lookup fails with `DeviceNotFound`.

use crate::models::DeviceCounterSnapshot;
use crate::{DiskMarkError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sector unit used by /proc/diskstats regardless of the device's real sector size
const DISKSTATS_SECTOR_BYTES: u64 = 512;

pub const DEFAULT_DISKSTATS_PATH: &str = "/proc/diskstats";

/// Default device name for the host OS family
pub fn default_device() -> &'static str {
    if cfg!(target_os = "macos") {
        "disk0"
    } else if cfg!(windows) {
        "PhysicalDrive0"
    } else {
        "sda"
    }
}

/// Source of point-in-time device counters
pub trait CounterSampler {
    /// Sample the configured device
    fn snapshot(&self) -> Result<DeviceCounterSnapshot>;

    /// Name of the device this sampler reads
    fn device(&self) -> &str;
}

/// Where the counter table is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterSource {
    /// A file in /proc/diskstats format
    Diskstats(PathBuf),
    /// No counter table on this platform
    Unsupported,
}

impl CounterSource {
    /// Counter source for the host platform
    pub fn platform_default() -> Self {
        if cfg!(target_os = "linux") {
            CounterSource::Diskstats(PathBuf::from(DEFAULT_DISKSTATS_PATH))
        } else {
            CounterSource::Unsupported
        }
    }
}

/// Samples one named block device
#[derive(Debug, Clone)]
pub struct DiskCounterSampler {
    device: String,
    source: CounterSource,
}

impl DiskCounterSampler {
    pub fn new(device: impl Into<String>, source: CounterSource) -> Self {
        Self {
            device: device.into(),
            source,
        }
    }

    /// Build a sampler and take one probe snapshot so a missing device fails at startup
    pub fn connect(device: impl Into<String>, source: CounterSource) -> Result<Self> {
        let sampler = Self::new(device, source);
        let probe = sampler.snapshot()?;
        debug!(device = %sampler.device, ?probe, "device counters resolved");
        Ok(sampler)
    }

    fn read_table(&self) -> Result<BTreeMap<String, DeviceCounterSnapshot>> {
        match &self.source {
            CounterSource::Diskstats(path) => read_diskstats(path),
            CounterSource::Unsupported => Ok(BTreeMap::new()),
        }
    }
}

impl CounterSampler for DiskCounterSampler {
    fn snapshot(&self) -> Result<DeviceCounterSnapshot> {
        let mut table = self.read_table()?;
        table
            .remove(&self.device)
            .ok_or_else(|| DiskMarkError::DeviceNotFound {
                device: self.device.clone(),
                available: table.into_keys().collect(),
            })
    }

    fn device(&self) -> &str {
        &self.device
    }
}

/// Device names currently present in the host counter table
pub fn list_devices(source: &CounterSource) -> Result<Vec<String>> {
    match source {
        CounterSource::Diskstats(path) => Ok(read_diskstats(path)?.into_keys().collect()),
        CounterSource::Unsupported => Ok(Vec::new()),
    }
}

fn read_diskstats(path: &Path) -> Result<BTreeMap<String, DeviceCounterSnapshot>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_diskstats(&content))
}

/// Parse /proc/diskstats content
///
/// Format:
/// ```text
/// major minor name rd_ios rd_merges rd_sectors rd_ticks wr_ios wr_merges wr_sectors ...
/// ```
/// Partitions are kept; the configured name may be either a whole disk or
/// a partition. Malformed lines are skipped.
pub fn parse_diskstats(content: &str) -> BTreeMap<String, DeviceCounterSnapshot> {
    let mut devices = BTreeMap::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            continue;
        }

        let field = |i: usize| parts[i].parse::<u64>().ok();
        let (Some(read_ops), Some(read_sectors), Some(write_ops), Some(write_sectors)) =
            (field(3), field(5), field(7), field(9))
        else {
            continue;
        };

        devices.insert(
            parts[2].to_string(),
            DeviceCounterSnapshot {
                read_bytes: read_sectors * DISKSTATS_SECTOR_BYTES,
                write_bytes: write_sectors * DISKSTATS_SECTOR_BYTES,
                read_ops,
                write_ops,
            },
        );
    }

    devices
}
