//! Workload description and block partitioning
//!
//! A workload is a file of fixed size cut into fixed-size blocks. The last
//! block carries the remainder when the file size is not a multiple of the
//! block size.

use crate::{DiskMarkError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order in which blocks of a workload are visited during one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPattern {
    /// Ascending offset order
    Sequential,
    /// Uniformly shuffled order, each block exactly once per pass
    Random,
}

/// Direction of the timed I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Write,
    Read,
}

impl AccessPattern {
    pub fn is_sequential(&self) -> bool {
        matches!(self, AccessPattern::Sequential)
    }

    /// Label used in log rows
    pub fn label(&self) -> &'static str {
        match self {
            AccessPattern::Sequential => "sequential",
            AccessPattern::Random => "random",
        }
    }
}

impl fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Write => f.write_str("write"),
            Operation::Read => f.write_str("read"),
        }
    }
}

/// One block of a workload file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    pub offset: u64,
    pub len: u64,
}

/// Shape of a single measured workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub file_size_bytes: u64,
    pub block_size_bytes: u64,
    pub access_pattern: AccessPattern,
    pub operation: Operation,
}

impl WorkloadSpec {
    /// Build a workload, rejecting zero sizes and blocks larger than the file
    pub fn new(
        file_size_bytes: u64,
        block_size_bytes: u64,
        access_pattern: AccessPattern,
        operation: Operation,
    ) -> Result<Self> {
        let spec = Self {
            file_size_bytes,
            block_size_bytes,
            access_pattern,
            operation,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size_bytes == 0 {
            return Err(DiskMarkError::ConfigInvalid(
                "Block size must be greater than 0".to_string(),
            ));
        }
        if self.file_size_bytes == 0 {
            return Err(DiskMarkError::ConfigInvalid(
                "File size must be greater than 0".to_string(),
            ));
        }
        if self.block_size_bytes > self.file_size_bytes {
            return Err(DiskMarkError::ConfigInvalid(format!(
                "Block size {} exceeds file size {}",
                self.block_size_bytes, self.file_size_bytes
            )));
        }
        Ok(())
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn is_sequential(&self) -> bool {
        self.access_pattern.is_sequential()
    }

    /// ceil(file_size / block_size)
    pub fn block_count(&self) -> u64 {
        self.file_size_bytes.div_ceil(self.block_size_bytes)
    }

    pub fn file_size_kib(&self) -> u64 {
        self.file_size_bytes / 1024
    }

    pub fn block_size_kib(&self) -> f64 {
        self.block_size_bytes as f64 / 1024.0
    }

    /// Blocks in ascending offset order, last one truncated to the remainder
    pub fn blocks(&self) -> Vec<Block> {
        block_layout(self.file_size_bytes, self.block_size_bytes)
    }

    /// Blocks in the order one pass visits them
    ///
    /// Random passes reshuffle on every call, so consecutive rounds see
    /// different orders.
    pub fn pass_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Block> {
        pass_order(
            self.file_size_bytes,
            self.block_size_bytes,
            self.access_pattern,
            rng,
        )
    }
}

pub(crate) fn block_layout(size_bytes: u64, block_size_bytes: u64) -> Vec<Block> {
    if block_size_bytes == 0 {
        return Vec::new();
    }
    (0..size_bytes.div_ceil(block_size_bytes))
        .map(|i| {
            let offset = i * block_size_bytes;
            Block {
                offset,
                len: block_size_bytes.min(size_bytes - offset),
            }
        })
        .collect()
}

pub(crate) fn pass_order<R: Rng + ?Sized>(
    size_bytes: u64,
    block_size_bytes: u64,
    pattern: AccessPattern,
    rng: &mut R,
) -> Vec<Block> {
    let mut blocks = block_layout(size_bytes, block_size_bytes);
    if pattern == AccessPattern::Random {
        blocks.shuffle(rng);
    }
    blocks
}
