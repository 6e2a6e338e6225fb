//! Fixed cube of label voxels.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec3;

use crate::core::{BlockIndex, GlobalVoxelIndex, GridGeometry, Label, LabelVoxel, VoxelState};

/// Allocation unit of the label map: `voxels_per_side³` voxels.
///
/// Voxels are written through shared references (see [`LabelVoxel`]), so a
/// block can be handed to several workers at once.
#[derive(Debug)]
pub struct LabelBlock {
    index: BlockIndex,
    origin: Vec3,
    voxels: Box<[LabelVoxel]>,
    updated: AtomicBool,
}

impl LabelBlock {
    /// Allocate an unobserved block.
    pub fn new(index: BlockIndex, geometry: &GridGeometry) -> Self {
        Self {
            index,
            origin: geometry.block_origin(index),
            voxels: (0..geometry.voxels_per_block())
                .map(|_| LabelVoxel::default())
                .collect(),
            updated: AtomicBool::new(false),
        }
    }

    /// Block index.
    #[inline]
    pub fn index(&self) -> BlockIndex {
        self.index
    }

    /// World position of the minimum corner.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Number of voxels.
    #[inline]
    pub fn num_voxels(&self) -> usize {
        self.voxels.len()
    }

    /// Voxel at a linear slot.
    #[inline]
    pub fn voxel(&self, linear: usize) -> &LabelVoxel {
        &self.voxels[linear]
    }

    /// All voxels in linear order.
    pub fn voxels(&self) -> impl Iterator<Item = &LabelVoxel> {
        self.voxels.iter()
    }

    /// Observed voxels with their global index.
    pub fn observed_voxels<'a>(
        &'a self,
        geometry: &'a GridGeometry,
    ) -> impl Iterator<Item = (GlobalVoxelIndex, VoxelState)> + 'a {
        self.voxels
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.state()))
            .filter(|(_, state)| state.is_observed())
            .map(move |(i, state)| (geometry.global_index(self.index, i), state))
    }

    /// Rewrite every voxel carrying `old` to `new`. Returns voxels rewritten.
    pub fn relabel(&self, old: Label, new: Label) -> usize {
        let rewritten = self.voxels.iter().filter(|v| v.relabel(old, new)).count();
        if rewritten > 0 {
            self.mark_updated();
        }
        rewritten
    }

    /// Voxels carrying `label`.
    pub fn count_label(&self, label: Label) -> usize {
        self.voxels
            .iter()
            .filter(|v| v.state().label == label)
            .count()
    }

    /// Flag the block as changed.
    #[inline]
    pub fn mark_updated(&self) {
        self.updated.store(true, Ordering::Relaxed);
    }

    /// Has the block changed since the flag was last taken?
    #[inline]
    pub fn is_updated(&self) -> bool {
        self.updated.load(Ordering::Relaxed)
    }

    /// Read and clear the updated flag.
    #[inline]
    pub fn take_updated(&self) -> bool {
        self.updated.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConfidencePolicy, LabelCounter};
    use glam::IVec3;

    #[test]
    fn test_new_block_is_unobserved() {
        let geometry = GridGeometry::new(0.1, 4);
        let block = LabelBlock::new(IVec3::new(1, -1, 0), &geometry);

        assert_eq!(block.num_voxels(), 64);
        assert!((block.origin() - Vec3::new(0.4, -0.4, 0.0)).length() < 1e-6);
        assert_eq!(block.observed_voxels(&geometry).count(), 0);
        assert!(!block.is_updated());
    }

    #[test]
    fn test_relabel_marks_updated() {
        let geometry = GridGeometry::new(0.1, 4);
        let block = LabelBlock::new(IVec3::ZERO, &geometry);
        let counter = LabelCounter::new();

        for i in 0..10 {
            block
                .voxel(i)
                .observe(Label(2), 1, ConfidencePolicy::uncapped(), &counter);
        }
        block
            .voxel(10)
            .observe(Label(3), 1, ConfidencePolicy::uncapped(), &counter);

        assert_eq!(block.relabel(Label(2), Label(3)), 10);
        assert!(block.take_updated());
        assert!(!block.is_updated());
        assert_eq!(block.count_label(Label(3)), 11);
        assert_eq!(block.count_label(Label(2)), 0);

        let observed: Vec<_> = block.observed_voxels(&geometry).collect();
        assert_eq!(observed.len(), 11);
        assert_eq!(observed[1].0, IVec3::new(1, 0, 0));
    }
}
