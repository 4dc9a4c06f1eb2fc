//! Benchmark engine module
//!
//! Contains the timed drive loop and the trial aggregator built on it.

pub mod drive;
pub mod trial;

// Re-export commonly used types
pub use drive::DriveLoop;
pub use trial::{TrialEvent, TrialRunner};
