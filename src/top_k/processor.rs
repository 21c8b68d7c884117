use rayon::prelude::*;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::constants::*;
use crate::error::{Result, TopKError};
use crate::record::{KeyExtractor, LossyLines};
use crate::top_k::merger::GlobalMerger;
use crate::top_k::partitioner::Partitioner;
use crate::top_k::reducer::{PartitionReducer, PartitionSummary};
use crate::top_k::storage::PartitionStore;
use crate::top_k::{TopKConfig, TopKReport, TopKStats};

/// Runs the partition, reduce and merge phases over one input stream.
///
/// Each run owns a fresh private partition store that is removed before the
/// run returns, whatever the outcome. The reduce worker pool is built once
/// and shared by every run of the processor.
pub struct TopKProcessor {
    config: TopKConfig,
    shutdown_flag: Arc<AtomicBool>,
    pool: rayon::ThreadPool,
    #[cfg(test)]
    storage_parent: Option<std::path::PathBuf>,
}

impl TopKProcessor {
    pub fn new(config: TopKConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.processing_threads)
            .build()?;
        Ok(Self {
            config,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            pool,
            #[cfg(test)]
            storage_parent: None,
        })
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    /// Places each run's private storage under `parent` so tests can see it.
    #[cfg(test)]
    pub(crate) fn with_storage_parent(mut self, parent: &std::path::Path) -> Self {
        self.storage_parent = Some(parent.to_path_buf());
        self
    }

    pub fn config(&self) -> &TopKConfig {
        &self.config
    }

    /// Top-K over an in-memory or lazily generated sequence of records.
    pub fn process<I, R, E>(&self, records: I, extractor: &E) -> Result<TopKReport>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
        E: KeyExtractor + ?Sized,
    {
        self.run(records.into_iter().map(Ok::<R, io::Error>), extractor)
    }

    /// Top-K over the lines of an already-open reader. Lines are decoded
    /// lossily; read failures abort the run with [`TopKError::Input`].
    pub fn process_reader<B, E>(&self, reader: B, extractor: &E) -> Result<TopKReport>
    where
        B: BufRead,
        E: KeyExtractor + ?Sized,
    {
        self.run(LossyLines::new(reader), extractor)
    }

    fn run<I, R, E>(&self, records: I, extractor: &E) -> Result<TopKReport>
    where
        I: IntoIterator<Item = io::Result<R>>,
        R: AsRef<str>,
        E: KeyExtractor + ?Sized,
    {
        let mut store = self.create_store()?;
        let outcome = self.execute(&store, records, extractor);
        store.release_quietly();
        outcome
    }

    fn create_store(&self) -> Result<PartitionStore> {
        #[cfg(test)]
        if let Some(parent) = &self.storage_parent {
            return PartitionStore::create_in(parent, self.config.partition_count);
        }
        PartitionStore::create(self.config.partition_count)
    }

    pub(crate) fn execute<I, R, E>(
        &self,
        store: &PartitionStore,
        records: I,
        extractor: &E,
    ) -> Result<TopKReport>
    where
        I: IntoIterator<Item = io::Result<R>>,
        R: AsRef<str>,
        E: KeyExtractor + ?Sized,
    {
        if self.config.verbose {
            info!(
                partitions = self.config.partition_count,
                top_k = self.config.top_k,
                threads = self.config.processing_threads,
                max_open_partitions = self.config.max_open_partitions,
                write_buffers_mb = self.config.max_write_buffer_bytes() as f64 / BYTES_PER_MB as f64,
                "starting top-k run"
            );
        }

        let partition_start = Instant::now();
        let partitioner = Partitioner::new(
            store,
            self.config.io_buffer_size_bytes(),
            self.config.max_open_partitions,
            self.shutdown_flag.clone(),
        );
        let partitioned = partitioner.partition(records, extractor)?;
        let partition_time_ms = partition_start.elapsed().as_millis() as u64;
        let bytes_spilled = partitioned.bytes_written();

        info!(
            records = partitioned.total_records,
            bytes_spilled,
            elapsed_ms = partition_time_ms,
            "partitioning complete"
        );

        let reduce_start = Instant::now();
        let reducer = PartitionReducer::new(
            self.config.top_k,
            self.config.read_buffer_size_bytes(),
            self.config.partition_key_warn_threshold,
        );
        let shutdown_flag = &self.shutdown_flag;
        let summaries: Vec<PartitionSummary> = self.pool.install(|| {
            partitioned
                .partitions
                .par_iter()
                .filter(|partition| !partition.is_empty())
                .map(|partition| {
                    if shutdown_flag.load(Ordering::Relaxed) {
                        return Err(TopKError::Aborted);
                    }
                    reducer.reduce(store, partition)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        let reduce_time_ms = reduce_start.elapsed().as_millis() as u64;

        let partitions_used = summaries.len();
        let largest_partition_records = summaries.iter().map(|s| s.record_count).max().unwrap_or(0);
        let distinct_keys: u64 = summaries.iter().map(|s| s.distinct_keys as u64).sum();
        let candidates: usize = summaries.iter().map(|s| s.candidates.len()).sum();

        info!(
            partitions_used,
            distinct_keys,
            candidates,
            elapsed_ms = reduce_time_ms,
            "reduction complete"
        );

        let merge_start = Instant::now();
        let entries = GlobalMerger::new(self.config.top_k).merge(summaries);
        let merge_time_ms = merge_start.elapsed().as_millis() as u64;

        debug!(entries = entries.len(), elapsed_ms = merge_time_ms, "merge complete");

        Ok(TopKReport {
            entries,
            stats: TopKStats {
                total_records: partitioned.total_records,
                partitions_used,
                largest_partition_records,
                distinct_keys,
                candidates,
                bytes_spilled,
                partition_time_ms,
                reduce_time_ms,
                merge_time_ms,
            },
        })
    }
}
