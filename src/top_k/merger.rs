use crate::top_k::candidate::{select_top_k, Candidate};
use crate::top_k::reducer::PartitionSummary;

/// Combines the local top-K lists of every partition into the final ranking.
///
/// The input is bounded by `partitions x K` candidates no matter how large the
/// original stream was. A key lives in exactly one partition, so candidates are
/// never de-duplicated here.
///
/// The result is drawn only from the union of local top-K lists. Because local
/// and global selection use the same total order (count descending, then key
/// ascending), a key that ranks within the global top-K also ranks within its
/// own partition's top-K, and every reported count is exact.
pub struct GlobalMerger {
    top_k: usize,
}

impl GlobalMerger {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn merge<I>(&self, summaries: I) -> Vec<Candidate>
    where
        I: IntoIterator<Item = PartitionSummary>,
    {
        let candidates = summaries.into_iter().flat_map(|summary| summary.candidates);
        select_top_k(candidates, self.top_k)
    }
}
