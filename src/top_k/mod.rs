//! Bounded-memory top-K over streams far larger than RAM.
//!
//! Keys are hash-partitioned to temporary files in one pass, every partition
//! is counted independently (in parallel) to a local top-K, and the local
//! lists are merged into the global ranking. Memory is bounded by the largest
//! partition's distinct-key count rather than by the whole key population.
//!
//! Reported counts are always exact. The ranking is taken from the union of
//! the partitions' local top-K lists; see [`merger::GlobalMerger`] for why no
//! qualifying key is lost under hash partitioning.

pub mod candidate;
pub mod config;
pub mod merger;
pub mod partitioner;
pub mod processor;
pub mod reducer;
pub mod storage;


pub use candidate::Candidate;
pub use config::TopKConfig;
pub use partitioner::partition_index;
pub use processor::TopKProcessor;

use serde::{Deserialize, Serialize};
use std::io::BufRead;

use crate::error::Result;
use crate::record::KeyExtractor;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopKStats {
    pub total_records: u64,
    pub partitions_used: usize,
    pub largest_partition_records: u64,
    pub distinct_keys: u64,
    pub candidates: usize,
    pub bytes_spilled: u64,
    pub partition_time_ms: u64,
    pub reduce_time_ms: u64,
    pub merge_time_ms: u64,
}

/// Final ranking, best first, plus what it took to compute it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopKReport {
    pub entries: Vec<Candidate>,
    pub stats: TopKStats,
}

impl TopKReport {
    pub fn pairs(&self) -> Vec<(String, u64)> {
        self.entries.iter().cloned().map(Candidate::into_pair).collect()
    }
}

pub fn top_k<I, R, E>(records: I, extractor: &E, config: TopKConfig) -> Result<TopKReport>
where
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
    E: KeyExtractor + ?Sized,
{
    TopKProcessor::new(config)?.process(records, extractor)
}

pub fn top_k_from_reader<B, E>(reader: B, extractor: &E, config: TopKConfig) -> Result<TopKReport>
where
    B: BufRead,
    E: KeyExtractor + ?Sized,
{
    TopKProcessor::new(config)?.process_reader(reader, extractor)
}
