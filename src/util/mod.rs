//! Utility functions module
//!
//! Contains helper functions for units formatting, size parsing and
//! throughput arithmetic.

pub mod units;

// Re-export commonly used functions
pub use units::{
    calculate_throughput_mibps, derived_iops, format_bytes, format_iops, format_throughput,
    parse_size, round2,
};
