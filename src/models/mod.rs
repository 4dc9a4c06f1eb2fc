//! Data models module
//!
//! Contains the workload description, per-trial measurements, device
//! counter samples and per-configuration summaries.

pub mod result;
pub mod workload;

// Re-export commonly used types
pub use result::{DeviceCounterSnapshot, DeviceDelta, RateSample, SummaryResult, TrialResult};
pub use workload::{AccessPattern, Block, Operation, WorkloadSpec};
