//! Bulk label rewrites.
//!
//! Both operations scan every allocated block and must not run while a
//! parallel integration pass is writing voxels. Callers guarantee this by
//! holding the layer exclusively between passes.

use super::ledger::{LabelPair, PairwiseConfidenceLedger};
use crate::core::{Label, LabelCounts};
use crate::grid::LabelLayer;

/// One executed merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelMerge {
    /// Retired label; no voxel carries it afterwards.
    pub superseded: Label,
    /// Label the superseded voxels now carry.
    pub survivor: Label,
    /// Ledger count that triggered the merge.
    pub confidence: u32,
    /// Voxels rewritten.
    pub voxels: usize,
}

/// Rewrite every voxel labeled `old` to `new`, keeping confidence.
///
/// Blocks with rewritten voxels are flagged updated. Returns the number of
/// voxels rewritten.
pub fn swap_labels(layer: &LabelLayer, old: Label, new: Label) -> usize {
    if old == new {
        return 0;
    }
    layer.blocks().map(|block| block.relabel(old, new)).sum()
}

/// Merge every ledger pair whose count exceeds `threshold`.
///
/// The smaller label of a pair is superseded by the larger. Pairs are taken
/// lowest first; after each merge, ledger entries naming the retired label
/// are moved onto the survivor, so later pairs never reference a label that
/// no longer exists.
pub fn merge_labels(
    layer: &LabelLayer,
    ledger: &mut PairwiseConfidenceLedger,
    counts: &mut LabelCounts,
    threshold: u32,
) -> Vec<LabelMerge> {
    let mut merges = Vec::new();

    while let Some((pair, confidence)) = next_merge(ledger, threshold) {
        let (superseded, survivor) = (pair.low(), pair.high());
        let voxels = swap_labels(layer, superseded, survivor);
        counts.transfer(superseded, survivor, voxels);
        ledger.remove(pair);
        ledger.rekey(superseded, survivor);

        log::info!(
            "Merging labels {} and {} ({} voxels, confidence {})",
            superseded.0,
            survivor.0,
            voxels,
            confidence
        );
        merges.push(LabelMerge {
            superseded,
            survivor,
            confidence,
            voxels,
        });
    }

    merges
}

fn next_merge(ledger: &PairwiseConfidenceLedger, threshold: u32) -> Option<(LabelPair, u32)> {
    ledger.iter().find(|&(_, count)| count > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConfidencePolicy, GridGeometry, LabelCountDeltas, LabelCounter, VoxelState};
    use glam::IVec3;

    /// Layer with `labels[i]` written to voxel `(i, 0, 0)`, counts to match.
    fn layer_with(labels: &[u32]) -> (LabelLayer, LabelCounts) {
        let mut layer = LabelLayer::new(GridGeometry::new(0.1, 4));
        let counter = LabelCounter::new();
        let mut deltas = LabelCountDeltas::default();
        for (i, &label) in labels.iter().enumerate() {
            let voxel = IVec3::new(i as i32, 0, 0);
            layer.allocate_block(layer.geometry().block_of_voxel(voxel));
            let transition = layer.voxel(voxel).unwrap().observe(
                Label(label),
                2,
                ConfidencePolicy::uncapped(),
                &counter,
            );
            deltas.record(transition);
        }
        let mut counts = LabelCounts::new();
        counts.apply(&deltas);
        (layer, counts)
    }

    #[test]
    fn test_swap_keeps_confidence() {
        let (layer, _) = layer_with(&[1, 2, 1, 3, 1]);
        layer.take_updated_blocks();

        assert_eq!(swap_labels(&layer, Label(1), Label(7)), 3);
        assert_eq!(layer.count_label(Label(1)), 0);
        assert_eq!(layer.count_label(Label(7)), 3);
        assert_eq!(
            layer.voxel(IVec3::new(2, 0, 0)).map(|v| v.state()),
            Some(VoxelState::new(Label(7), 2))
        );
        assert_eq!(layer.take_updated_blocks().len(), 2);
        assert_eq!(swap_labels(&layer, Label(7), Label(7)), 0);
    }

    #[test]
    fn test_merge_supersedes_smaller_label() {
        let (layer, mut counts) = layer_with(&[1, 2, 2, 3]);
        let mut ledger = PairwiseConfidenceLedger::new();
        for _ in 0..3 {
            ledger.record_co_occurrence(&[Label(1), Label(2)]);
        }
        ledger.record_co_occurrence(&[Label(1), Label(3)]);

        let merges = merge_labels(&layer, &mut ledger, &mut counts, 2);

        assert_eq!(
            merges,
            vec![LabelMerge {
                superseded: Label(1),
                survivor: Label(2),
                confidence: 3,
                voxels: 1,
            }]
        );
        assert_eq!(layer.count_label(Label(1)), 0);
        assert_eq!(counts.get(Label(2)), 3);
        assert_eq!(counts.active_labels(), vec![Label(2), Label(3)]);
        // (1, 3) now refers to the survivor.
        assert_eq!(ledger.get(Label(1), Label(2)), 0);
        assert_eq!(ledger.get(Label(2), Label(3)), 1);

        // Merging again is a no-op.
        assert!(merge_labels(&layer, &mut ledger, &mut counts, 2).is_empty());
    }

    #[test]
    fn test_chained_merges_resolve_survivors() {
        let (layer, mut counts) = layer_with(&[1, 2, 3]);
        let mut ledger = PairwiseConfidenceLedger::new();
        for _ in 0..3 {
            ledger.record_co_occurrence(&[Label(1), Label(2)]);
            ledger.record_co_occurrence(&[Label(1), Label(3)]);
        }

        let merges = merge_labels(&layer, &mut ledger, &mut counts, 2);

        // (1,2) first; (1,3) becomes (2,3) and is merged in the same sweep.
        assert_eq!(merges.len(), 2);
        assert_eq!((merges[0].superseded, merges[0].survivor), (Label(1), Label(2)));
        assert_eq!((merges[1].superseded, merges[1].survivor), (Label(2), Label(3)));
        assert_eq!(layer.count_label(Label(3)), 3);
        assert_eq!(counts.active_labels(), vec![Label(3)]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_rekey_does_not_double_count_shared_segments() {
        let (layer, mut counts) = layer_with(&[1, 2, 3]);
        let mut ledger = PairwiseConfidenceLedger::new();
        ledger.record_co_occurrence(&[Label(1), Label(2), Label(3)]);
        ledger.record_co_occurrence(&[Label(1), Label(2), Label(3)]);
        ledger.record_co_occurrence(&[Label(1), Label(2)]);
        assert_eq!(ledger.get(Label(2), Label(3)), 2);

        let merges = merge_labels(&layer, &mut ledger, &mut counts, 2);

        // (2, 3) was seen by two segments only, at the threshold.
        assert_eq!(merges.len(), 1);
        assert_eq!((merges[0].superseded, merges[0].survivor), (Label(1), Label(2)));
        assert_eq!(ledger.get(Label(2), Label(3)), 2);
        assert_eq!(layer.count_label(Label(3)), 1);
        assert_eq!(counts.active_labels(), vec![Label(2), Label(3)]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let (layer, mut counts) = layer_with(&[1, 2]);
        let mut ledger = PairwiseConfidenceLedger::new();
        ledger.record_co_occurrence(&[Label(1), Label(2)]);
        ledger.record_co_occurrence(&[Label(1), Label(2)]);

        assert!(merge_labels(&layer, &mut ledger, &mut counts, 2).is_empty());
        assert_eq!(ledger.get(Label(1), Label(2)), 2);
    }
}
