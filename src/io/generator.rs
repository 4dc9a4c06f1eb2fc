//! Workload file generation
//!
//! Fills files of an exact byte size with incompressible random bytes,
//! block by block, either in ascending order or over shuffled offsets.

use crate::models::workload::{block_layout, pass_order, AccessPattern};
use crate::{DiskMarkError, Result, TEMP_FILE_PREFIX};
use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const NAME_SUFFIX_LEN: usize = 16;

/// Create `path` exclusively and fill it with `size_bytes` of random data
///
/// Fails with `CreateFailed` if the path already exists.
pub fn write_file(
    path: &Path,
    size_bytes: u64,
    block_size_bytes: u64,
    sequential: bool,
) -> Result<()> {
    let mut rng = SmallRng::from_entropy();
    write_file_with(&mut rng, path, size_bytes, block_size_bytes, sequential)
}

/// Same as [`write_file`] with a caller-supplied random source
pub fn write_file_with<R: Rng>(
    rng: &mut R,
    path: &Path,
    size_bytes: u64,
    block_size_bytes: u64,
    sequential: bool,
) -> Result<()> {
    check_layout(size_bytes, block_size_bytes)?;

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| DiskMarkError::CreateFailed {
            path: path.to_path_buf(),
            source,
        })?;

    fill(rng, file, path, size_bytes, block_size_bytes, sequential)
}

/// Rewrite every block of an existing workload file in place
///
/// The file keeps its inode and length; no truncation happens, so every
/// pass after the first measures pure overwrite cost.
pub fn overwrite_pass<R: Rng>(
    rng: &mut R,
    path: &Path,
    size_bytes: u64,
    block_size_bytes: u64,
    sequential: bool,
) -> Result<()> {
    check_layout(size_bytes, block_size_bytes)?;

    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|source| DiskMarkError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;

    fill(rng, file, path, size_bytes, block_size_bytes, sequential)
}

fn check_layout(size_bytes: u64, block_size_bytes: u64) -> Result<()> {
    if block_size_bytes == 0 || size_bytes == 0 {
        return Err(DiskMarkError::ConfigInvalid(
            "File size and block size must be greater than 0".to_string(),
        ));
    }
    if block_size_bytes > size_bytes {
        return Err(DiskMarkError::ConfigInvalid(format!(
            "Block size {} exceeds file size {}",
            block_size_bytes, size_bytes
        )));
    }
    Ok(())
}

fn fill<R: Rng>(
    rng: &mut R,
    mut file: File,
    path: &Path,
    size_bytes: u64,
    block_size_bytes: u64,
    sequential: bool,
) -> Result<()> {
    let write_failed = |source| DiskMarkError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut buffer = vec![0u8; block_size_bytes as usize];

    if sequential {
        for block in block_layout(size_bytes, block_size_bytes) {
            let chunk = &mut buffer[..block.len as usize];
            rng.fill_bytes(chunk);
            file.write_all(chunk).map_err(write_failed)?;
        }
    } else {
        // The remainder block is found by its offset, wherever the shuffle put it
        let order = pass_order(size_bytes, block_size_bytes, AccessPattern::Random, rng);
        for block in order {
            file.seek(SeekFrom::Start(block.offset))
                .map_err(write_failed)?;
            let chunk = &mut buffer[..block.len as usize];
            rng.fill_bytes(chunk);
            file.write_all(chunk).map_err(write_failed)?;
        }
    }

    file.sync_all().map_err(write_failed)?;
    debug!(path = %path.display(), size_bytes, block_size_bytes, sequential, "workload pass written");
    Ok(())
}

/// `<prefix>_<16 random alphanumerics>`
pub fn random_file_name<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..NAME_SUFFIX_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect();
    format!("{}_{}", TEMP_FILE_PREFIX, suffix)
}

/// Path of an ephemeral workload file, deleted when dropped
///
/// The guard does not create the file; the drive loop or generator does.
#[derive(Debug)]
pub struct WorkloadFile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl WorkloadFile {
    /// Reserve a fresh random name inside `dir`
    pub fn fresh<R: Rng>(dir: &Path, rng: &mut R) -> Self {
        Self {
            path: dir.join(random_file_name(rng)),
            cleanup_on_drop: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Disable automatic cleanup (for debugging)
    pub fn keep_on_drop(&mut self) {
        self.cleanup_on_drop = false;
    }

    /// Delete the file now, surfacing the error instead of swallowing it
    pub fn remove(mut self) -> Result<()> {
        let cleanup = std::mem::replace(&mut self.cleanup_on_drop, false);
        if cleanup && self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Drop for WorkloadFile {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
