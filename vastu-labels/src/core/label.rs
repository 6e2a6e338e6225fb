//! Label identities, the highest-issued label counter and per-label voxel counts.

use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::voxel::VoxelTransition;
use crate::error::FusionError;

/// Integer identity of an observed surface region.
///
/// `Label(0)` is reserved for voxels that were allocated but never observed.
/// Labels are minted from a [`LabelCounter`] and never reused, even after a
/// merge retires them.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Label(pub u32);

impl Label {
    /// Label carried by voxels that have never been observed.
    pub const UNOBSERVED: Label = Label(0);

    /// Create a label from its numeric id.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the numeric value.
    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Is this a real label (not [`Label::UNOBSERVED`])?
    #[inline]
    pub fn is_observed(&self) -> bool {
        self.0 != 0
    }
}

impl From<u32> for Label {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Label({})", self.0)
    }
}

/// Highest label issued so far.
///
/// Advanced by minting fresh labels and by voxel writes that carry an
/// externally supplied label larger than the current value. Voxel writes
/// under different lock bank entries race on it, so every update is a single
/// atomic operation.
#[derive(Debug, Default)]
pub struct LabelCounter {
    highest: AtomicU32,
}

impl LabelCounter {
    /// Counter that has issued nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter resuming after `highest`.
    pub fn starting_at(highest: Label) -> Self {
        Self {
            highest: AtomicU32::new(highest.0),
        }
    }

    /// Highest label issued or observed so far.
    #[inline]
    pub fn highest(&self) -> Label {
        Label(self.highest.load(Ordering::Acquire))
    }

    /// Mint a label that has never been issued.
    ///
    /// Fails with [`FusionError::LabelSpaceExhausted`] instead of wrapping
    /// once `u32::MAX` has been issued.
    pub fn mint(&self) -> Result<Label, FusionError> {
        match self
            .highest
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |h| h.checked_add(1))
        {
            Ok(previous) => Ok(Label(previous + 1)),
            Err(highest) => {
                log::warn!("Label space exhausted at {}", highest);
                Err(FusionError::LabelSpaceExhausted {
                    highest: Label(highest),
                })
            }
        }
    }

    /// Raise the counter to `label` if it is larger.
    ///
    /// Returns true if the counter moved.
    #[inline]
    pub fn observe(&self, label: Label) -> bool {
        self.highest.fetch_max(label.0, Ordering::AcqRel) < label.0
    }
}

/// Label count changes collected by one worker during a parallel pass.
///
/// Workers never touch the shared [`LabelCounts`]; their deltas are folded in
/// after the join barrier.
#[derive(Clone, Debug, Default)]
pub struct LabelCountDeltas {
    deltas: FxHashMap<Label, i64>,
}

impl LabelCountDeltas {
    /// Record the count effect of one voxel transition.
    #[inline]
    pub fn record(&mut self, transition: VoxelTransition) {
        if let VoxelTransition::Assigned { previous, label } = transition {
            if previous == label {
                return;
            }
            if label.is_observed() {
                *self.deltas.entry(label).or_insert(0) += 1;
            }
            if previous.is_observed() {
                *self.deltas.entry(previous).or_insert(0) -= 1;
            }
        }
    }

    /// Merge another worker's deltas into this one.
    pub fn merge(&mut self, other: LabelCountDeltas) {
        for (label, delta) in other.deltas {
            *self.deltas.entry(label).or_insert(0) += delta;
        }
    }

    /// Delta recorded for `label`.
    pub fn get(&self, label: Label) -> i64 {
        self.deltas.get(&label).copied().unwrap_or(0)
    }

    /// No transitions changed any label.
    pub fn is_empty(&self) -> bool {
        self.deltas.values().all(|&d| d == 0)
    }
}

/// Number of voxels currently carrying each label.
#[derive(Clone, Debug, Default)]
pub struct LabelCounts {
    counts: FxHashMap<Label, u64>,
}

impl LabelCounts {
    /// Empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a pass's deltas in.
    pub fn apply(&mut self, deltas: &LabelCountDeltas) {
        for (&label, &delta) in &deltas.deltas {
            let count = self.counts.entry(label).or_insert(0);
            *count = count.saturating_add_signed(delta);
        }
        self.counts.retain(|_, count| *count > 0);
    }

    /// Move `voxels` voxels from `from` to `to` (after a swap or merge).
    pub fn transfer(&mut self, from: Label, to: Label, voxels: usize) {
        if voxels == 0 || from == to {
            return;
        }
        if let Some(count) = self.counts.get_mut(&from) {
            *count = count.saturating_sub(voxels as u64);
            if *count == 0 {
                self.counts.remove(&from);
            }
        }
        if to.is_observed() {
            *self.counts.entry(to).or_insert(0) += voxels as u64;
        }
    }

    /// Voxels carrying `label`.
    pub fn get(&self, label: Label) -> u64 {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// Labels carried by at least one voxel, ascending.
    pub fn active_labels(&self) -> Vec<Label> {
        let mut labels: Vec<Label> = self
            .counts
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(&label, _)| label)
            .collect();
        labels.sort_unstable();
        labels
    }

    /// Forget all counts.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_is_monotonic() {
        let counter = LabelCounter::new();
        assert_eq!(counter.mint().unwrap(), Label(1));
        assert_eq!(counter.mint().unwrap(), Label(2));
        assert_eq!(counter.highest(), Label(2));
    }

    #[test]
    fn test_observe_raises_only_upward() {
        let counter = LabelCounter::starting_at(Label(10));
        assert!(!counter.observe(Label(4)));
        assert_eq!(counter.highest(), Label(10));

        assert!(counter.observe(Label(42)));
        assert_eq!(counter.highest(), Label(42));
        assert_eq!(counter.mint().unwrap(), Label(43));
    }

    #[test]
    fn test_mint_reports_exhaustion() {
        let counter = LabelCounter::starting_at(Label(u32::MAX - 1));
        assert_eq!(counter.mint().unwrap(), Label(u32::MAX));

        match counter.mint() {
            Err(FusionError::LabelSpaceExhausted { highest }) => {
                assert_eq!(highest, Label(u32::MAX))
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(counter.highest(), Label(u32::MAX));
    }

    #[test]
    fn test_concurrent_observe_keeps_maximum() {
        let counter = LabelCounter::new();
        std::thread::scope(|s| {
            for t in 0..4u32 {
                let counter = &counter;
                s.spawn(move || {
                    for i in 0..1000u32 {
                        counter.observe(Label(i * 4 + t));
                    }
                });
            }
        });
        assert_eq!(counter.highest(), Label(999 * 4 + 3));
    }

    #[test]
    fn test_counts_follow_transitions() {
        let mut deltas = LabelCountDeltas::default();
        deltas.record(VoxelTransition::Assigned {
            previous: Label::UNOBSERVED,
            label: Label(3),
        });
        deltas.record(VoxelTransition::Assigned {
            previous: Label::UNOBSERVED,
            label: Label(3),
        });
        deltas.record(VoxelTransition::Assigned {
            previous: Label(3),
            label: Label(5),
        });
        deltas.record(VoxelTransition::Reinforced);
        deltas.record(VoxelTransition::Contested);

        let mut counts = LabelCounts::new();
        counts.apply(&deltas);
        assert_eq!(counts.get(Label(3)), 1);
        assert_eq!(counts.get(Label(5)), 1);
        assert_eq!(counts.active_labels(), vec![Label(3), Label(5)]);

        counts.transfer(Label(3), Label(5), 1);
        assert_eq!(counts.get(Label(3)), 0);
        assert_eq!(counts.active_labels(), vec![Label(5)]);
    }
}
