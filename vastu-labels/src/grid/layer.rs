//! Main structure: sparse map from block index to installed block.

use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;

use super::block::LabelBlock;
use crate::core::{BlockIndex, GlobalVoxelIndex, GridGeometry, Label, LabelVoxel, VoxelState};

/// Installed label blocks.
///
/// Blocks are shared as `Arc` so worker threads can hold a handle while the
/// layer itself is only borrowed immutably. Insertion requires `&mut self`,
/// which keeps it out of the parallel phase.
#[derive(Debug)]
pub struct LabelLayer {
    geometry: GridGeometry,
    blocks: FxHashMap<BlockIndex, Arc<LabelBlock>>,
}

impl LabelLayer {
    /// Empty layer.
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            blocks: FxHashMap::default(),
        }
    }

    /// Grid geometry.
    #[inline]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Number of installed blocks.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Installed block at `index`.
    #[inline]
    pub fn block(&self, index: BlockIndex) -> Option<&Arc<LabelBlock>> {
        self.blocks.get(&index)
    }

    /// Is a block installed at `index`?
    #[inline]
    pub fn contains_block(&self, index: BlockIndex) -> bool {
        self.blocks.contains_key(&index)
    }

    /// All installed blocks (unordered).
    pub fn blocks(&self) -> impl Iterator<Item = &Arc<LabelBlock>> {
        self.blocks.values()
    }

    /// Voxel at a global index, if its block is installed.
    pub fn voxel(&self, voxel: GlobalVoxelIndex) -> Option<&LabelVoxel> {
        self.blocks
            .get(&self.geometry.block_of_voxel(voxel))
            .map(|block| block.voxel(self.geometry.linear_index(voxel)))
    }

    /// Voxel containing a world point, if its block is installed.
    pub fn voxel_by_point(&self, point: Vec3) -> Option<&LabelVoxel> {
        self.voxel(self.geometry.voxel_index(point))
    }

    /// Install a block. A block already at that index is replaced.
    pub fn insert_block(&mut self, block: Arc<LabelBlock>) -> Option<Arc<LabelBlock>> {
        self.blocks.insert(block.index(), block)
    }

    /// Get the block at `index`, allocating it if missing.
    pub fn allocate_block(&mut self, index: BlockIndex) -> &Arc<LabelBlock> {
        let geometry = self.geometry;
        self.blocks
            .entry(index)
            .or_insert_with(|| Arc::new(LabelBlock::new(index, &geometry)))
    }

    /// Indices of blocks whose `updated` flag was set, clearing the flags.
    pub fn take_updated_blocks(&self) -> Vec<BlockIndex> {
        let mut updated: Vec<BlockIndex> = self
            .blocks
            .values()
            .filter(|block| block.take_updated())
            .map(|block| block.index())
            .collect();
        updated.sort_unstable_by_key(|i| (i.x, i.y, i.z));
        updated
    }

    /// Every observed voxel with its global index.
    pub fn observed_voxels(&self) -> impl Iterator<Item = (GlobalVoxelIndex, VoxelState)> + '_ {
        self.blocks
            .values()
            .flat_map(|block| block.observed_voxels(&self.geometry))
    }

    /// Voxels carrying `label` across all blocks.
    pub fn count_label(&self, label: Label) -> usize {
        self.blocks.values().map(|b| b.count_label(label)).sum()
    }

    /// Drop every block.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
