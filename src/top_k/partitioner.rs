use fnv::FnvHasher;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::hash::Hasher;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::constants::*;
use crate::error::{Result, TopKError};
use crate::record::KeyExtractor;
use crate::top_k::storage::{PartitionMetadata, PartitionStore};

/// Partition a key belongs to: 64-bit FNV-1a over the key's UTF-8 bytes,
/// reduced modulo `partition_count`. Stable across runs and processes.
pub fn partition_index(key: &str, partition_count: usize) -> usize {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() % partition_count as u64) as usize
}

pub struct PartitionOutcome {
    pub partitions: Vec<PartitionMetadata>,
    pub total_records: u64,
}

impl PartitionOutcome {
    pub fn bytes_written(&self) -> u64 {
        self.partitions.iter().map(|p| p.bytes_written).sum()
    }
}

/// Single-pass splitter of a record stream into the store's partition files.
pub struct Partitioner<'a> {
    store: &'a PartitionStore,
    io_buffer_size: usize,
    max_open_partitions: usize,
    shutdown_flag: Arc<AtomicBool>,
}

impl<'a> Partitioner<'a> {
    pub fn new(
        store: &'a PartitionStore,
        io_buffer_size: usize,
        max_open_partitions: usize,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            io_buffer_size,
            max_open_partitions: max_open_partitions.max(1),
            shutdown_flag,
        }
    }

    /// Consumes `records` once, appending each extracted key to its partition.
    ///
    /// A partition file is created the first time its buffer is written out,
    /// and no more than `max_open_partitions` files are open at any moment.
    /// On error the partially written files are left for the store to release.
    pub fn partition<I, R, E>(&self, records: I, extractor: &E) -> Result<PartitionOutcome>
    where
        I: IntoIterator<Item = io::Result<R>>,
        R: AsRef<str>,
        E: KeyExtractor + ?Sized,
    {
        let partition_count = self.store.partition_count();
        let mut partitions: Vec<PartitionMetadata> = (0..partition_count)
            .map(|index| PartitionMetadata {
                index,
                file_path: self.store.partition_path(index),
                record_count: 0,
                bytes_written: 0,
            })
            .collect();
        let mut sink = PartitionSink::new(
            partitions.iter().map(|p| p.file_path.clone()).collect(),
            self.io_buffer_size,
            self.max_open_partitions,
        );
        let mut total_records: u64 = 0;

        for record in records {
            if total_records % SHUTDOWN_CHECK_INTERVAL_RECORDS == 0 && self.shutdown_requested() {
                debug!(total_records, "partitioning interrupted");
                return Err(TopKError::Aborted);
            }

            let record = record.map_err(TopKError::Input)?;
            let key = extractor.extract_key(record.as_ref());
            let index = partition_index(&key, partition_count);

            let written = sink.append(index, &key)?;
            let partition = &mut partitions[index];
            partition.record_count += 1;
            partition.bytes_written += written as u64;

            total_records += 1;
            if total_records % PROGRESS_REPORT_INTERVAL_RECORDS == 0 {
                debug!(total_records, "partitioning progress");
            }
        }

        sink.finish()?;

        Ok(PartitionOutcome {
            partitions,
            total_records,
        })
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }
}

/// Per-partition frame buffers in front of a bounded set of append handles.
///
/// Frames collect in memory until a partition's buffer reaches
/// `buffer_capacity`, then the buffer is appended to the partition file in one
/// write. When `max_open` handles are already held, the longest-held one is
/// closed before another file is opened.
struct PartitionSink {
    paths: Vec<PathBuf>,
    buffers: Vec<Vec<u8>>,
    handles: Vec<Option<File>>,
    open_order: VecDeque<usize>,
    buffer_capacity: usize,
    max_open: usize,
}

impl PartitionSink {
    fn new(paths: Vec<PathBuf>, buffer_capacity: usize, max_open: usize) -> Self {
        let partition_count = paths.len();
        Self {
            paths,
            buffers: (0..partition_count).map(|_| Vec::new()).collect(),
            handles: (0..partition_count).map(|_| None).collect(),
            open_order: VecDeque::with_capacity(max_open),
            buffer_capacity,
            max_open: max_open.max(1),
        }
    }

    fn append(&mut self, index: usize, key: &str) -> Result<usize> {
        let written = write_frame(&mut self.buffers[index], key)
            .map_err(|source| TopKError::PartitionWrite { partition: index, source })?;
        if self.buffers[index].len() >= self.buffer_capacity {
            self.flush_partition(index)?;
        }
        Ok(written)
    }

    fn flush_partition(&mut self, index: usize) -> Result<()> {
        if self.buffers[index].is_empty() {
            return Ok(());
        }
        self.write_buffer(index)
            .map_err(|source| TopKError::PartitionWrite { partition: index, source })
    }

    fn write_buffer(&mut self, index: usize) -> io::Result<()> {
        if self.handles[index].is_none() {
            if self.open_order.len() >= self.max_open {
                if let Some(evicted) = self.open_order.pop_front() {
                    self.handles[evicted] = None;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.paths[index])?;
            self.handles[index] = Some(file);
            self.open_order.push_back(index);
        }
        if let Some(file) = self.handles[index].as_mut() {
            file.write_all(&self.buffers[index])?;
        }
        self.buffers[index].clear();
        Ok(())
    }

    /// Writes out every non-empty buffer and closes all handles.
    fn finish(mut self) -> Result<()> {
        for index in 0..self.buffers.len() {
            self.flush_partition(index)?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn open_handles(&self) -> usize {
        self.open_order.len()
    }
}

/// Writes one length-prefixed key. Framing keeps empty keys and keys with
/// embedded newlines intact.
pub(crate) fn write_frame<W: Write>(writer: &mut W, key: &str) -> io::Result<usize> {
    let len = u32::try_from(key.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "key longer than u32::MAX bytes")
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(key.as_bytes())?;
    Ok(FRAME_HEADER_BYTES + key.len())
}
