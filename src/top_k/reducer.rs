use fnv::FnvHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use tracing::{debug, warn};

use crate::constants::*;
use crate::error::{Result, TopKError};
use crate::top_k::candidate::{select_top_k, Candidate};
use crate::top_k::storage::{PartitionMetadata, PartitionStore};

/// Sequential reader over the length-prefixed keys of one partition file.
pub struct FrameReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Next key, or `None` at a clean end of file. A frame cut short is
    /// reported as `UnexpectedEof`, a key that is not UTF-8 as `InvalidData`.
    pub fn next_key(&mut self) -> io::Result<Option<&str>> {
        if self.reader.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let mut header = [0u8; FRAME_HEADER_BYTES];
        self.reader.read_exact(&mut header)?;
        let len = u32::from_le_bytes(header) as usize;

        self.buffer.resize(len, 0);
        self.reader.read_exact(&mut self.buffer)?;

        std::str::from_utf8(&self.buffer)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// One partition's contribution to the merge.
#[derive(Debug, Clone)]
pub struct PartitionSummary {
    pub index: usize,
    pub record_count: u64,
    pub distinct_keys: usize,
    pub candidates: Vec<Candidate>,
}

/// Counts one partition at a time and keeps that partition's local top-K.
///
/// Memory per call is bounded by the partition's distinct-key count, not by
/// the global one. Reducers share nothing, so any number may run at once.
pub struct PartitionReducer {
    top_k: usize,
    read_buffer_size: usize,
    key_warn_threshold: usize,
}

impl PartitionReducer {
    pub fn new(top_k: usize, read_buffer_size: usize, key_warn_threshold: usize) -> Self {
        Self {
            top_k,
            read_buffer_size,
            key_warn_threshold,
        }
    }

    /// Reduces `partition` and then removes its file, whether or not counting
    /// succeeded.
    pub fn reduce(&self, store: &PartitionStore, partition: &PartitionMetadata) -> Result<PartitionSummary> {
        let counted = self.count_partition(partition);

        if let Err(e) = store.release_partition(partition) {
            warn!(partition = partition.index, "failed to remove partition file: {}", e);
        }

        let counts = counted.map_err(|source| TopKError::PartitionRead {
            partition: partition.index,
            path: partition.file_path.clone(),
            source,
        })?;

        let distinct_keys = counts.len();
        if distinct_keys > self.key_warn_threshold {
            warn!(
                partition = partition.index,
                distinct_keys,
                threshold = self.key_warn_threshold,
                "partition holds more distinct keys than expected; consider more partitions"
            );
        }

        let candidates = select_top_k(counts.into_iter().map(Candidate::from), self.top_k);

        debug!(
            partition = partition.index,
            records = partition.record_count,
            distinct_keys,
            candidates = candidates.len(),
            "partition reduced"
        );

        Ok(PartitionSummary {
            index: partition.index,
            record_count: partition.record_count,
            distinct_keys,
            candidates,
        })
    }

    fn count_partition(&self, partition: &PartitionMetadata) -> io::Result<FnvHashMap<String, u64>> {
        let mut counts: FnvHashMap<String, u64> = FnvHashMap::default();
        if partition.is_empty() {
            return Ok(counts);
        }

        let file = File::open(&partition.file_path)?;
        let mut frames = FrameReader::new(BufReader::with_capacity(self.read_buffer_size, file));
        let mut records: u64 = 0;

        while let Some(key) = frames.next_key()? {
            match counts.get_mut(key) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(key.to_owned(), 1);
                }
            }
            records += 1;
        }

        if records != partition.record_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "expected {} records, found {}",
                    partition.record_count, records
                ),
            ));
        }

        Ok(counts)
    }
}
