//! Grid configuration section.

use serde::{Deserialize, Serialize};

use crate::core::GridGeometry;

use super::defaults;
use super::error::ConfigError;

/// Voxel and block layout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridConfig {
    /// Voxel edge length (meters)
    #[serde(default = "defaults::voxel_size")]
    pub voxel_size: f32,

    /// Voxels along one block edge
    #[serde(default = "defaults::voxels_per_side")]
    pub voxels_per_side: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            voxel_size: defaults::voxel_size(),
            voxels_per_side: defaults::voxels_per_side(),
        }
    }
}

impl GridConfig {
    /// Grid with the given voxel size and block edge.
    pub fn new(voxel_size: f32, voxels_per_side: u32) -> Self {
        Self {
            voxel_size,
            voxels_per_side,
        }
    }

    /// Addressing for this layout.
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.voxel_size, self.voxels_per_side)
    }

    /// Approximate bytes per allocated block (label + confidence per voxel).
    pub fn block_memory_bytes(&self) -> usize {
        self.geometry().voxels_per_block() * 8
    }

    /// Check the layout is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(ConfigError::InvalidVoxelSize(self.voxel_size));
        }
        if !(1..=256).contains(&self.voxels_per_side) {
            return Err(ConfigError::InvalidVoxelsPerSide(self.voxels_per_side));
        }
        Ok(())
    }
}
