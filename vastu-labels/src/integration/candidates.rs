//! Candidate generation: which existing labels does a segment overlap?
//!
//! Every point of a segment is looked up in the label layer. Observed voxels
//! add one overlap unit for (voxel label, segment) to a table shared by all
//! segments of the batch:
//!
//! ```text
//!              segment 0   segment 1   segment 2
//! Label(3)         41           2           .
//! Label(7)          5           .           .
//! Label(12)         .           .          30   ← minted, no overlap
//! ```
//!
//! A segment that overlaps nothing gets a freshly minted label as its only
//! candidate, with the segment size as overlap, so it is always assignable.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::LabelConfig;
use crate::core::{Label, LabelCounter, Segment};
use crate::error::Result;
use crate::grid::LabelLayer;
use crate::merging::PairwiseConfidenceLedger;

/// Overlap counts: label → segment index → points.
///
/// Ordered maps make the greedy resolver's tie-break deterministic: among
/// equal counts the lowest label wins, then the lowest segment index.
#[derive(Clone, Debug, Default)]
pub struct OverlapTable {
    entries: BTreeMap<Label, BTreeMap<usize, usize>>,
    fresh: BTreeSet<Label>,
}

impl OverlapTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `points` overlap units for (label, segment).
    pub fn add(&mut self, label: Label, segment: usize, points: usize) {
        *self
            .entries
            .entry(label)
            .or_default()
            .entry(segment)
            .or_insert(0) += points;
    }

    /// Add a freshly minted label as a segment's only candidate.
    pub fn insert_fresh(&mut self, label: Label, segment: usize, points: usize) {
        self.fresh.insert(label);
        self.add(label, segment, points);
    }

    /// Overlap units for (label, segment).
    pub fn get(&self, label: Label, segment: usize) -> usize {
        self.entries
            .get(&label)
            .and_then(|segments| segments.get(&segment))
            .copied()
            .unwrap_or(0)
    }

    /// Was `label` minted for this table?
    pub fn is_fresh(&self, label: Label) -> bool {
        self.fresh.contains(&label)
    }

    /// Labels overlapping `segment`, ascending.
    pub fn labels_for(&self, segment: usize) -> Vec<Label> {
        self.entries
            .iter()
            .filter(|(_, segments)| segments.contains_key(&segment))
            .map(|(&label, _)| label)
            .collect()
    }

    /// Remove a label from further consideration.
    pub fn remove_label(&mut self, label: Label) {
        self.entries.remove(&label);
    }

    /// Largest positive (segment, label, count) among segments not in
    /// `claimed`. The first maximum in (label, segment) order wins ties.
    pub fn best_unclaimed(&self, claimed: &BTreeSet<usize>) -> Option<(usize, Label, usize)> {
        let mut best: Option<(usize, Label, usize)> = None;
        for (&label, segments) in &self.entries {
            for (&segment, &count) in segments {
                if claimed.contains(&segment) {
                    continue;
                }
                if count > best.map_or(0, |(_, _, c)| c) {
                    best = Some((segment, label, count));
                }
            }
        }
        best
    }

    /// Number of labels still in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No labels left?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What candidate generation found for one segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentCandidates {
    /// Points that landed in an observed voxel.
    pub overlapping_points: usize,
    /// Labels covering more than the ratio threshold of the segment.
    pub merge_candidates: Vec<Label>,
    /// Label minted because nothing overlapped.
    pub fresh: Option<Label>,
}

/// Scan one segment against the layer and extend `table`.
///
/// With pairwise merging enabled, every pair of merge candidates gains one
/// count in `ledger`. Empty segments are skipped and get no label.
pub fn compute_segment_candidates(
    segment_index: usize,
    segment: &Segment,
    layer: &LabelLayer,
    table: &mut OverlapTable,
    ledger: &mut PairwiseConfidenceLedger,
    counter: &LabelCounter,
    config: &LabelConfig,
) -> Result<SegmentCandidates> {
    let mut result = SegmentCandidates::default();
    if segment.is_empty() {
        return Ok(result);
    }

    let mut overlap: BTreeMap<Label, usize> = BTreeMap::new();
    for point_g in segment.world_points() {
        if let Some(voxel) = layer.voxel_by_point(point_g) {
            let label = voxel.state().label;
            if label.is_observed() {
                *overlap.entry(label).or_insert(0) += 1;
            }
        }
    }

    for (&label, &points) in &overlap {
        table.add(label, segment_index, points);
        result.overlapping_points += points;
    }

    if config.enable_pairwise_confidence_merging {
        let size = segment.len() as f32;
        result.merge_candidates = overlap
            .iter()
            .filter(|&(_, &points)| {
                points as f32 / size > config.pairwise_confidence_ratio_threshold
            })
            .map(|(&label, _)| label)
            .collect();
        ledger.record_co_occurrence(&result.merge_candidates);
    }

    if overlap.is_empty() {
        let fresh = counter.mint()?;
        table.insert_fresh(fresh, segment_index, segment.len());
        result.fresh = Some(fresh);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Color, ConfidencePolicy, GridGeometry, LabelVoxel, Transformation};
    use glam::Vec3;

    fn layer_with(labels: &[(Vec3, Label)]) -> LabelLayer {
        let mut layer = LabelLayer::new(GridGeometry::new(0.1, 8));
        let counter = LabelCounter::new();
        for &(point, label) in labels {
            let index = layer.geometry().block_index(point);
            layer.allocate_block(index);
            let voxel: &LabelVoxel = layer.voxel_by_point(point).unwrap();
            voxel.observe(label, 1, ConfidencePolicy::uncapped(), &counter);
        }
        layer
    }

    fn segment(points: Vec<Vec3>) -> Segment {
        let colors = vec![Color::default(); points.len()];
        Segment::new(Transformation::IDENTITY, points, colors)
    }

    #[test]
    fn test_unseen_segment_gets_fresh_label() {
        let layer = layer_with(&[]);
        let counter = LabelCounter::starting_at(Label(5));
        let mut table = OverlapTable::new();
        let mut ledger = PairwiseConfidenceLedger::new();

        let seg = segment(vec![Vec3::new(0.05, 0.05, 0.05); 4]);
        let found = compute_segment_candidates(
            0,
            &seg,
            &layer,
            &mut table,
            &mut ledger,
            &counter,
            &LabelConfig::default(),
        )
        .unwrap();

        assert_eq!(found.fresh, Some(Label(6)));
        assert_eq!(table.get(Label(6), 0), 4);
        assert!(table.is_fresh(Label(6)));
    }

    #[test]
    fn test_overlap_counts_and_merge_candidates() {
        let a = Vec3::new(0.05, 0.05, 0.05);
        let b = Vec3::new(0.15, 0.05, 0.05);
        let c = Vec3::new(0.25, 0.05, 0.05);
        let layer = layer_with(&[(a, Label(1)), (b, Label(2)), (c, Label(3))]);
        let counter = LabelCounter::starting_at(Label(3));
        let mut table = OverlapTable::new();
        let mut ledger = PairwiseConfidenceLedger::new();
        let config = LabelConfig {
            enable_pairwise_confidence_merging: true,
            pairwise_confidence_ratio_threshold: 0.2,
            ..LabelConfig::default()
        };

        // 10 points: 4 on label 1, 4 on label 2, 1 on label 3, 1 unobserved.
        let mut points = vec![a; 4];
        points.extend(vec![b; 4]);
        points.push(c);
        points.push(Vec3::new(5.0, 5.0, 5.0));

        let found = compute_segment_candidates(
            2,
            &segment(points),
            &layer,
            &mut table,
            &mut ledger,
            &counter,
            &config,
        )
        .unwrap();

        assert_eq!(found.overlapping_points, 9);
        assert_eq!(found.fresh, None);
        assert_eq!(found.merge_candidates, vec![Label(1), Label(2)]);
        assert_eq!(table.get(Label(1), 2), 4);
        assert_eq!(table.get(Label(3), 2), 1);
        assert_eq!(table.labels_for(2), vec![Label(1), Label(2), Label(3)]);
        assert_eq!(ledger.get(Label(1), Label(2)), 1);
        assert_eq!(ledger.get(Label(1), Label(3)), 0);
        assert_eq!(counter.highest(), Label(3));
    }

    #[test]
    fn test_empty_segment_is_skipped() {
        let layer = layer_with(&[]);
        let counter = LabelCounter::new();
        let mut table = OverlapTable::new();
        let mut ledger = PairwiseConfidenceLedger::new();

        let found = compute_segment_candidates(
            0,
            &segment(Vec::new()),
            &layer,
            &mut table,
            &mut ledger,
            &counter,
            &LabelConfig::default(),
        )
        .unwrap();

        assert_eq!(found, SegmentCandidates::default());
        assert!(table.is_empty());
        assert_eq!(counter.highest(), Label::UNOBSERVED);
    }

    #[test]
    fn test_best_unclaimed_prefers_lowest_label_on_tie() {
        let mut table = OverlapTable::new();
        table.add(Label(4), 1, 7);
        table.add(Label(2), 3, 7);
        table.add(Label(2), 0, 7);

        let mut claimed = BTreeSet::new();
        assert_eq!(table.best_unclaimed(&claimed), Some((0, Label(2), 7)));
        claimed.insert(0);
        assert_eq!(table.best_unclaimed(&claimed), Some((3, Label(2), 7)));
    }
}
