//! I/O operations module
//!
//! Workload file generation and host disk counter sampling.

pub mod counters;
pub mod generator;

pub use counters::{default_device, CounterSampler, CounterSource, DiskCounterSampler};
pub use generator::{overwrite_pass, write_file, write_file_with, WorkloadFile};
