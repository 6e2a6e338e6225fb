//! Staging buffer for blocks first touched during a parallel pass.
//!
//! Workers may not insert into the [`LabelLayer`] while others read it, so a
//! missing block is created here instead, under one coarse lock:
//!
//! ```text
//! worker ── layer.block(i)? ──yes──► handle
//!                │
//!                no
//!                ▼
//!        lock staging ─► get or create ─► unlock ─► handle (Arc)
//!
//! after join:  fold_into(layer)   (single-threaded, &mut both)
//! ```
//!
//! The coarse lock is paid once per new block per worker; later voxels in
//! the same block go through the worker's [`BlockCursor`].

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::block::LabelBlock;
use super::layer::LabelLayer;
use crate::core::{BlockIndex, GlobalVoxelIndex, GridGeometry, LabelVoxel};

/// Coarse-locked map of blocks not yet installed in the layer.
#[derive(Debug)]
pub struct StagingBuffer {
    geometry: GridGeometry,
    blocks: Mutex<FxHashMap<BlockIndex, Arc<LabelBlock>>>,
}

impl StagingBuffer {
    /// Empty buffer for blocks of `geometry`.
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            blocks: Mutex::new(FxHashMap::default()),
        }
    }

    /// Staged block at `index`, created if missing.
    ///
    /// The returned handle stays valid after the lock is released.
    pub fn get_or_create(&self, index: BlockIndex) -> Arc<LabelBlock> {
        let mut blocks = self.blocks.lock();
        Arc::clone(
            blocks
                .entry(index)
                .or_insert_with(|| Arc::new(LabelBlock::new(index, &self.geometry))),
        )
    }

    /// Number of staged blocks.
    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    /// Nothing staged?
    pub fn is_empty(&self) -> bool {
        self.blocks.lock().is_empty()
    }

    /// Install every staged block into `layer` and empty the buffer.
    ///
    /// Exclusive borrows of both structures guarantee no worker is running.
    /// Returns the number of blocks installed.
    pub fn fold_into(&mut self, layer: &mut LabelLayer) -> usize {
        let staged = self.blocks.get_mut();
        let installed = staged.len();
        for (index, block) in staged.drain() {
            // Cursors check the layer first, so this only happens when a
            // caller allocated the block directly between passes.
            if layer.insert_block(block).is_some() {
                log::warn!(
                    "Staged block ({}, {}, {}) replaced an installed block",
                    index.x,
                    index.y,
                    index.z
                );
            }
        }
        installed
    }
}

/// Per-worker block lookup with a one-entry cache.
///
/// Looks in the layer first, then the staging buffer. Blocks returned through
/// the cursor are flagged updated, since it is only used on the write path.
pub struct BlockCursor<'a> {
    layer: &'a LabelLayer,
    staging: &'a StagingBuffer,
    last: Option<Arc<LabelBlock>>,
}

impl<'a> BlockCursor<'a> {
    /// Cursor over `layer` backed by `staging`.
    pub fn new(layer: &'a LabelLayer, staging: &'a StagingBuffer) -> Self {
        Self {
            layer,
            staging,
            last: None,
        }
    }

    /// Voxel at a global index, staging its block if needed.
    pub fn voxel(&mut self, voxel: GlobalVoxelIndex) -> &LabelVoxel {
        let geometry = self.layer.geometry();
        let index = geometry.block_of_voxel(voxel);
        let linear = geometry.linear_index(voxel);
        let block = match self.last.take() {
            Some(block) if block.index() == index => block,
            _ => {
                let block = match self.layer.block(index) {
                    Some(block) => Arc::clone(block),
                    None => self.staging.get_or_create(index),
                };
                block.mark_updated();
                block
            }
        };
        let block = self.last.insert(block);
        block.voxel(linear)
    }
}
