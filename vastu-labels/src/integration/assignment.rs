//! Greedy assignment of one label per segment.
//!
//! The largest remaining overlap wins: its segment takes the label, the
//! segment is claimed and the label leaves the table. Segments left over
//! when no positive overlap remains get a freshly minted label.
//!
//! ```text
//! (segA, L1) = 5   (segA, L2) = 3   (segB, L1) = 4
//!
//! step 1: (segA, L1) = 5 wins → segA ← L1, L1 removed
//! step 2: (segA, L2) skipped (segA claimed), nothing left
//! final:  segB ← fresh label
//! ```
//!
//! This is greedy, not an optimal matching.

use std::collections::BTreeSet;

use super::candidates::OverlapTable;
use crate::core::{Label, LabelCounter, Segment};
use crate::error::Result;

/// Label committed to one segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentAssignment {
    /// Segment index in the batch.
    pub segment: usize,
    /// Label given to every point of the segment.
    pub label: Label,
    /// Overlap that won the label (0 for fallback labels).
    pub overlap: usize,
    /// Label was minted during this batch.
    pub fresh: bool,
}

/// Resolve the overlap table into one label per non-empty segment.
///
/// Consumes the table. Assignments are returned sorted by segment index.
pub fn resolve_assignments(
    mut table: OverlapTable,
    segments: &[Segment],
    counter: &LabelCounter,
) -> Result<Vec<SegmentAssignment>> {
    let mut claimed = BTreeSet::new();
    let mut assignments = Vec::with_capacity(segments.len());

    while let Some((segment, label, overlap)) = table.best_unclaimed(&claimed) {
        assignments.push(SegmentAssignment {
            segment,
            label,
            overlap,
            fresh: table.is_fresh(label),
        });
        claimed.insert(segment);
        table.remove_label(label);
    }

    for (index, segment) in segments.iter().enumerate() {
        if segment.is_empty() || claimed.contains(&index) {
            continue;
        }
        let label = counter.mint()?;
        log::trace!("Segment {} lost every candidate, minted {}", index, label);
        assignments.push(SegmentAssignment {
            segment: index,
            label,
            overlap: 0,
            fresh: true,
        });
        claimed.insert(index);
    }

    assignments.sort_unstable_by_key(|a| a.segment);
    Ok(assignments)
}

/// Write each assignment's label onto its segment's points.
pub fn apply_assignments(segments: &mut [Segment], assignments: &[SegmentAssignment]) {
    for assignment in assignments {
        segments[assignment.segment].assign_label(assignment.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Color, Transformation};
    use glam::Vec3;

    fn segments(sizes: &[usize]) -> Vec<Segment> {
        sizes
            .iter()
            .map(|&n| {
                Segment::new(
                    Transformation::IDENTITY,
                    vec![Vec3::ZERO; n],
                    vec![Color::default(); n],
                )
            })
            .collect()
    }

    #[test]
    fn test_greedy_precedence() {
        let (seg_a, seg_b) = (0, 1);
        let mut table = OverlapTable::new();
        table.add(Label(1), seg_a, 5);
        table.add(Label(2), seg_a, 3);
        table.add(Label(1), seg_b, 4);

        let counter = LabelCounter::starting_at(Label(2));
        let assignments = resolve_assignments(table, &segments(&[8, 4]), &counter).unwrap();

        assert_eq!(
            assignments,
            vec![
                SegmentAssignment {
                    segment: seg_a,
                    label: Label(1),
                    overlap: 5,
                    fresh: false,
                },
                SegmentAssignment {
                    segment: seg_b,
                    label: Label(3),
                    overlap: 0,
                    fresh: true,
                },
            ]
        );
    }

    #[test]
    fn test_each_label_claimed_once() {
        let mut table = OverlapTable::new();
        table.add(Label(7), 0, 10);
        table.add(Label(7), 1, 9);
        table.add(Label(8), 1, 2);
        table.insert_fresh(Label(9), 2, 3);

        let counter = LabelCounter::starting_at(Label(9));
        let assignments = resolve_assignments(table, &segments(&[10, 11, 3]), &counter).unwrap();

        let labels: Vec<_> = assignments.iter().map(|a| a.label).collect();
        assert_eq!(labels, vec![Label(7), Label(8), Label(9)]);
        assert!(assignments[2].fresh);
        assert_eq!(counter.highest(), Label(9));
    }

    #[test]
    fn test_apply_assignments_labels_points() {
        let mut segs = segments(&[3, 0]);
        let counter = LabelCounter::new();
        let assignments = resolve_assignments(OverlapTable::new(), &segs, &counter).unwrap();
        assert_eq!(assignments.len(), 1);

        apply_assignments(&mut segs, &assignments);
        assert_eq!(segs[0].labels, vec![Label(1); 3]);
        assert!(segs[1].labels.is_empty());
    }
}
