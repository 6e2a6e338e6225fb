//! Cross-batch co-occurrence evidence between label pairs.

use std::collections::BTreeMap;

use crate::core::Label;

/// Unordered pair of distinct labels, stored smaller first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelPair {
    low: Label,
    high: Label,
}

impl LabelPair {
    /// Canonical pair, or `None` if both labels are the same.
    pub fn new(a: Label, b: Label) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Smaller label.
    #[inline]
    pub fn low(&self) -> Label {
        self.low
    }

    /// Larger label.
    #[inline]
    pub fn high(&self) -> Label {
        self.high
    }

    /// Does the pair contain `label`?
    #[inline]
    pub fn contains(&self, label: Label) -> bool {
        self.low == label || self.high == label
    }
}

impl std::fmt::Display for LabelPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.low.0, self.high.0)
    }
}

/// Co-occurrence counts per label pair.
///
/// A pair gains one count per segment in which both labels were merge
/// candidates, regardless of how many points overlapped. Counts only grow
/// until a merge removes the entry.
#[derive(Clone, Debug, Default)]
pub struct PairwiseConfidenceLedger {
    counts: BTreeMap<LabelPair, u32>,
}

impl PairwiseConfidenceLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one co-occurrence for every pair of distinct labels in `labels`.
    pub fn record_co_occurrence(&mut self, labels: &[Label]) {
        let mut distinct = labels.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        for (i, &a) in distinct.iter().enumerate() {
            for &b in &distinct[i + 1..] {
                if let Some(pair) = LabelPair::new(a, b) {
                    self.increment(pair, 1);
                }
            }
        }
    }

    /// Add `by` to a pair's count.
    pub fn increment(&mut self, pair: LabelPair, by: u32) {
        let count = self.counts.entry(pair).or_insert(0);
        *count = count.saturating_add(by);
    }

    /// Count for the pair `(a, b)` in either order.
    pub fn get(&self, a: Label, b: Label) -> u32 {
        LabelPair::new(a, b)
            .and_then(|pair| self.counts.get(&pair).copied())
            .unwrap_or(0)
    }

    /// Pairs whose count is strictly greater than `threshold`, in pair order.
    pub fn pairs_above(&self, threshold: u32) -> Vec<(LabelPair, u32)> {
        self.counts
            .iter()
            .filter(|&(_, &count)| count > threshold)
            .map(|(&pair, &count)| (pair, count))
            .collect()
    }

    /// Remove a pair, returning its count.
    pub fn remove(&mut self, pair: LabelPair) -> Option<u32> {
        self.counts.remove(&pair)
    }

    /// Move every entry that references `retired` onto `survivor`.
    ///
    /// Entries that collapse onto an existing pair keep the larger count,
    /// since one segment seeing all three labels has already been counted on
    /// both. An entry between the two labels themselves is dropped.
    pub fn rekey(&mut self, retired: Label, survivor: Label) {
        let affected: Vec<LabelPair> = self
            .counts
            .keys()
            .filter(|pair| pair.contains(retired))
            .copied()
            .collect();

        for pair in affected {
            let Some(count) = self.counts.remove(&pair) else {
                continue;
            };
            let other = if pair.low == retired {
                pair.high
            } else {
                pair.low
            };
            if let Some(moved) = LabelPair::new(other, survivor) {
                let entry = self.counts.entry(moved).or_insert(0);
                *entry = (*entry).max(count);
            }
        }
    }

    /// Add every entry of `other` to this ledger.
    pub fn absorb(&mut self, other: PairwiseConfidenceLedger) {
        for (pair, count) in other.counts {
            self.increment(pair, count);
        }
    }

    /// All entries in pair order.
    pub fn iter(&self) -> impl Iterator<Item = (LabelPair, u32)> + '_ {
        self.counts.iter().map(|(&pair, &count)| (pair, count))
    }

    /// Number of tracked pairs.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// No tracked pairs?
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
