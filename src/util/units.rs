//! Units formatting and conversion utilities
//!
//! Throughput/IOPS arithmetic shared by the drive loop and the reports,
//! plus human-readable formatting and size parsing for the CLI.

use crate::MIB;
use byte_unit::Byte;
use std::time::Duration;

/// Format bytes into human-readable size with appropriate units
///
/// # Examples
/// ```
/// use diskmark::util::units::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1048576), "1.0 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Parse a size such as `64KiB`, `1.5 MiB` or `100`
///
/// A bare number is taken as KiB, the unit workload sizes are listed in.
///
/// # Examples
/// ```
/// use diskmark::util::units::parse_size;
///
/// assert_eq!(parse_size("64").unwrap(), 64 * 1024);
/// assert_eq!(parse_size("1MiB").unwrap(), 1024 * 1024);
/// ```
pub fn parse_size(input: &str) -> Result<u64, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Empty size".to_string());
    }

    if let Ok(kib) = input.parse::<u64>() {
        return kib
            .checked_mul(1024)
            .ok_or_else(|| format!("Size too large: {}", input));
    }

    Byte::parse_str(input, true)
        .map(|b| b.as_u64())
        .map_err(|e| format!("Invalid size '{}': {}", input, e))
}

/// Throughput in MiB/s from bytes moved and elapsed time
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use diskmark::util::units::calculate_throughput_mibps;
///
/// let throughput = calculate_throughput_mibps(1048576, Duration::from_secs(1));
/// assert!((throughput - 1.0).abs() < 0.01);
/// ```
pub fn calculate_throughput_mibps(bytes: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }
    (bytes as f64 / MIB) / duration.as_secs_f64()
}

/// Throughput re-expressed as block-sized operations per second
///
/// `throughput_mibps * 1024 / block_size_kib`. Not an operation count: a
/// truncated last block is counted as a fraction of an operation.
pub fn derived_iops(throughput_mibps: f64, block_size_bytes: u64) -> f64 {
    if block_size_bytes == 0 {
        return 0.0;
    }
    let block_size_kib = block_size_bytes as f64 / 1024.0;
    throughput_mibps * 1024.0 / block_size_kib
}

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format throughput value with appropriate units
///
/// # Examples
/// ```
/// use diskmark::util::units::format_throughput;
///
/// assert_eq!(format_throughput(1024.0), "1.0 GiB/s");
/// assert_eq!(format_throughput(1.5), "1.5 MiB/s");
/// ```
pub fn format_throughput(mibps: f64) -> String {
    if mibps >= 1024.0 {
        format!("{:.1} GiB/s", mibps / 1024.0)
    } else if mibps >= 1.0 {
        format!("{:.1} MiB/s", mibps)
    } else if mibps >= 0.001 {
        format!("{:.1} KiB/s", mibps * 1024.0)
    } else {
        format!("{:.3} MiB/s", mibps)
    }
}

/// Format IOPS value with appropriate units
pub fn format_iops(iops: f64) -> String {
    if iops >= 1_000_000.0 {
        format!("{:.1}M IOPS", iops / 1_000_000.0)
    } else if iops >= 1_000.0 {
        format!("{:.1}K IOPS", iops / 1_000.0)
    } else {
        format!("{:.0} IOPS", iops)
    }
}
