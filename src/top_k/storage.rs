use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::constants::*;
use crate::error::{Result, TopKError};

/// What the partitioner recorded about one partition.
#[derive(Debug, Clone)]
pub struct PartitionMetadata {
    pub index: usize,
    pub file_path: PathBuf,
    pub record_count: u64,
    pub bytes_written: u64,
}

impl PartitionMetadata {
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

/// Owns the private temporary directory holding every partition file.
///
/// The directory is created fresh under the system temp dir and removed
/// exactly once: by [`PartitionStore::release`], or on drop if a run unwinds
/// before reaching it. Releasing twice is a no-op.
#[derive(Debug)]
pub struct PartitionStore {
    dir: Option<TempDir>,
    root: PathBuf,
    partition_count: usize,
}

impl PartitionStore {
    pub fn create(partition_count: usize) -> Result<Self> {
        Self::build(partition_count, None)
    }

    #[cfg(test)]
    pub(crate) fn create_in(parent: &Path, partition_count: usize) -> Result<Self> {
        Self::build(partition_count, Some(parent))
    }

    fn build(partition_count: usize, parent: Option<&Path>) -> Result<Self> {
        if partition_count == 0 {
            return Err(TopKError::invalid_config("partition count must be at least 1"));
        }
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|source| TopKError::StorageInit { source })?;
        let root = dir.path().to_path_buf();

        debug!(path = %root.display(), partition_count, "created partition storage");

        Ok(Self {
            dir: Some(dir),
            root,
            partition_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    pub fn partition_path(&self, index: usize) -> PathBuf {
        self.root.join(format!(
            "{}{:05}{}",
            PARTITION_FILE_PREFIX, index, PARTITION_FILE_EXTENSION
        ))
    }

    /// Removes a single partition file. Missing files are not an error, so a
    /// partition may be released by its reducer and again by a global release.
    pub fn release_partition(&self, partition: &PartitionMetadata) -> io::Result<()> {
        match fs::remove_file(&partition.file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Removes the whole storage directory.
    pub fn release(&mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                debug!(path = %self.root.display(), "releasing partition storage");
                dir.close()
            }
            None => Ok(()),
        }
    }

    /// Release used on error paths: failures are logged so they never mask
    /// the error that caused the abort.
    pub fn release_quietly(&mut self) {
        if let Err(e) = self.release() {
            warn!(path = %self.root.display(), "failed to remove partition storage: {}", e);
        }
    }
}
