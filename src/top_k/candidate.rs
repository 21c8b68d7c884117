use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A key together with its exact occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub key: String,
    pub count: u64,
}

impl Candidate {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }

    pub fn into_pair(self) -> (String, u64) {
        (self.key, self.count)
    }
}

impl From<(String, u64)> for Candidate {
    fn from((key, count): (String, u64)) -> Self {
        Self { key, count }
    }
}

/// Rank order: a candidate is "greater" when it ranks higher. Higher counts
/// rank first; equal counts rank by key in ascending byte order.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded selection of the `k` highest-ranked candidates.
///
/// Holds a min-heap of at most `k` entries, so memory is bounded by `k` and
/// each offer costs O(log k). The rank order is total, which makes the
/// selection independent of the order candidates are offered in.
#[derive(Debug)]
pub struct TopKHeap {
    k: usize,
    heap: BinaryHeap<Reverse<Candidate>>,
}

impl TopKHeap {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offers a candidate, returning `true` if it is currently retained.
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        if self.k == 0 {
            return false;
        }
        if self.heap.len() == self.k {
            match self.heap.peek() {
                Some(Reverse(weakest)) if candidate <= *weakest => return false,
                _ => {}
            }
            self.heap.pop();
        }
        self.heap.push(Reverse(candidate));
        true
    }

    /// Drains the heap, best-ranked first.
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(candidate)| candidate)
            .collect()
    }
}

/// Selects the `k` best-ranked candidates from `candidates`, best first.
pub fn select_top_k<I>(candidates: I, k: usize) -> Vec<Candidate>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut heap = TopKHeap::new(k);
    for candidate in candidates {
        heap.offer(candidate);
    }
    heap.into_sorted_vec()
}
