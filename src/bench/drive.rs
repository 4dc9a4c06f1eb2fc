//! Timed I/O drive loop
//!
//! Repeats full passes over a workload file until a wall-clock budget is
//! spent and converts the completed pass count into throughput and IOPS.
//!
//! The budget is a soft floor: a pass that has started always runs to the
//! end before the clock is checked again, so a large file can overshoot
//! the budget by up to one pass.
//!
//! Write loops create the file on their first pass when it does not exist
//! yet, so round 1 measures create+write while later rounds measure
//! in-place overwrite. Every round is counted.
//!
//! Read loops go through the OS page cache. Small files that fit in memory
//! mostly measure cache speed rather than device speed.

use crate::io::generator::{overwrite_pass, write_file_with};
use crate::models::{Block, Operation, RateSample, WorkloadSpec};
use crate::util::units::{calculate_throughput_mibps, derived_iops};
use crate::{DiskMarkError, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Drive loop executor
///
/// Owns the random source used for shuffled passes and random payloads;
/// tests inject a seeded one.
pub struct DriveLoop<R: Rng = SmallRng> {
    rng: R,
}

impl DriveLoop<SmallRng> {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl Default for DriveLoop<SmallRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> DriveLoop<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Run `workload.operation` against `path` for at least `budget`
    ///
    /// Any I/O error aborts the loop; a partial pass earns no credit.
    pub fn drive(
        &mut self,
        workload: &WorkloadSpec,
        path: &Path,
        budget: Duration,
    ) -> Result<RateSample> {
        workload.validate()?;

        let start = Instant::now();
        let rounds = match workload.operation {
            Operation::Write => self.write_rounds(workload, path, start, budget)?,
            Operation::Read => self.read_rounds(workload, path, start, budget)?,
        };
        let elapsed = start.elapsed();

        let throughput_mibps =
            calculate_throughput_mibps(workload.file_size_bytes.saturating_mul(rounds), elapsed);
        let sample = RateSample {
            rounds,
            elapsed,
            throughput_mibps,
            iops: derived_iops(throughput_mibps, workload.block_size_bytes),
        };

        debug!(
            operation = %workload.operation,
            pattern = %workload.access_pattern,
            file_size = workload.file_size_bytes,
            rounds,
            elapsed_ms = elapsed.as_millis() as u64,
            throughput_mibps,
            "drive loop finished"
        );
        Ok(sample)
    }

    fn write_rounds(
        &mut self,
        workload: &WorkloadSpec,
        path: &Path,
        start: Instant,
        budget: Duration,
    ) -> Result<u64> {
        let sequential = workload.is_sequential();
        let mut exists = path.exists();
        let mut rounds = 0u64;

        loop {
            if exists {
                overwrite_pass(
                    &mut self.rng,
                    path,
                    workload.file_size_bytes,
                    workload.block_size_bytes,
                    sequential,
                )?;
            } else {
                write_file_with(
                    &mut self.rng,
                    path,
                    workload.file_size_bytes,
                    workload.block_size_bytes,
                    sequential,
                )?;
                exists = true;
            }
            rounds += 1;

            if start.elapsed() >= budget {
                return Ok(rounds);
            }
        }
    }

    fn read_rounds(
        &mut self,
        workload: &WorkloadSpec,
        path: &Path,
        start: Instant,
        budget: Duration,
    ) -> Result<u64> {
        let mut file = File::open(path).map_err(|source| DiskMarkError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut buffer = vec![0u8; workload.block_size_bytes as usize];
        let mut rounds = 0u64;
        let mut short_bytes = 0u64;

        loop {
            let order = workload.pass_order(&mut self.rng);
            let read = read_pass(&mut file, path, &order, &mut buffer)?;
            short_bytes += workload.file_size_bytes.saturating_sub(read);
            rounds += 1;

            if start.elapsed() >= budget {
                if short_bytes > 0 {
                    debug!(path = %path.display(), short_bytes, "short reads tolerated");
                }
                return Ok(rounds);
            }
        }
    }
}

/// Read every block of `order` once, returning the bytes actually read
///
/// A short read does not abort the pass.
pub(crate) fn read_pass(
    file: &mut File,
    path: &Path,
    order: &[Block],
    buffer: &mut [u8],
) -> Result<u64> {
    let read_failed = |source| DiskMarkError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut total = 0u64;
    for block in order {
        file.seek(SeekFrom::Start(block.offset))
            .map_err(read_failed)?;
        let n = file
            .read(&mut buffer[..block.len as usize])
            .map_err(read_failed)?;
        total += n as u64;
    }
    Ok(total)
}
