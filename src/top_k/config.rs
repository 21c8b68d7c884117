use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::TopKError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopKConfig {
    /// Number of on-disk partitions. More partitions means fewer distinct
    /// keys held in memory per reducer, at the cost of more files.
    pub partition_count: usize,
    pub top_k: usize,
    /// In-memory frame buffer per partition; the partition file is appended
    /// to each time its buffer fills.
    pub io_buffer_size_kb: usize,
    /// Cap on partition files held open at once while partitioning.
    pub max_open_partitions: usize,
    pub read_buffer_size_kb: usize,
    pub processing_threads: usize,
    pub partition_key_warn_threshold: usize,
    pub verbose: bool,
}

impl Default for TopKConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITION_COUNT,
            top_k: DEFAULT_TOP_K,
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            max_open_partitions: DEFAULT_MAX_OPEN_PARTITIONS,
            read_buffer_size_kb: DEFAULT_READ_BUFFER_SIZE_KB,
            processing_threads: DEFAULT_PROCESSING_THREADS,
            partition_key_warn_threshold: DEFAULT_PARTITION_KEY_WARN_THRESHOLD,
            verbose: false,
        }
    }
}

impl TopKConfig {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TopKError> {
        if self.partition_count < MIN_PARTITION_COUNT || self.partition_count > MAX_PARTITION_COUNT {
            return Err(TopKError::invalid_config(format!(
                "Partition count must be between {} and {}",
                MIN_PARTITION_COUNT, MAX_PARTITION_COUNT
            )));
        }

        if self.top_k < MIN_TOP_K || self.top_k > MAX_TOP_K {
            return Err(TopKError::invalid_config(format!(
                "Top K must be between {} and {}",
                MIN_TOP_K, MAX_TOP_K
            )));
        }

        if self.max_open_partitions < MIN_OPEN_PARTITIONS
            || self.max_open_partitions > MAX_PARTITION_COUNT
        {
            return Err(TopKError::invalid_config(format!(
                "Max open partitions must be between {} and {}",
                MIN_OPEN_PARTITIONS, MAX_PARTITION_COUNT
            )));
        }

        for (name, value) in [
            ("IO buffer size", self.io_buffer_size_kb),
            ("Read buffer size", self.read_buffer_size_kb),
        ] {
            if value < MIN_IO_BUFFER_SIZE_KB || value > MAX_IO_BUFFER_SIZE_KB {
                return Err(TopKError::invalid_config(format!(
                    "{} must be between {} and {} KB",
                    name, MIN_IO_BUFFER_SIZE_KB, MAX_IO_BUFFER_SIZE_KB
                )));
            }
        }

        if self.processing_threads < MIN_PROCESSING_THREADS
            || self.processing_threads > MAX_PROCESSING_THREADS
        {
            return Err(TopKError::invalid_config(format!(
                "Processing threads must be between {} and {}",
                MIN_PROCESSING_THREADS, MAX_PROCESSING_THREADS
            )));
        }

        Ok(())
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }

    pub fn read_buffer_size_bytes(&self) -> usize {
        self.read_buffer_size_kb * BYTES_PER_KB
    }

    /// Upper bound on memory held by partition write buffers while partitioning.
    pub fn max_write_buffer_bytes(&self) -> usize {
        self.partition_count * self.io_buffer_size_bytes()
    }
}
