//! Block and voxel addressing.
//!
//! The map is a sparse set of cubic blocks, each holding
//! `voxels_per_side³` voxels. Voxels are addressed globally by an integer
//! grid index; the block that owns a voxel is found by floor division and the
//! voxel's slot inside the block by euclidean remainder:
//!
//! ```text
//! global voxel (-1, 5, 17), voxels_per_side = 16
//!   block  = (-1, 0, 1)
//!   local  = (15, 5, 1)
//!   linear = 15 + 16 * (5 + 16 * 1) = 351
//! ```

use glam::{IVec3, Vec3};

/// Integer grid index of a voxel in world space.
pub type GlobalVoxelIndex = IVec3;

/// Integer index of a block.
pub type BlockIndex = IVec3;

/// Spatial layout shared by the label layer and the reconstruction backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    voxel_size: f32,
    voxel_size_inv: f32,
    voxels_per_side: u32,
}

impl GridGeometry {
    /// Create a geometry with `voxel_size` meters per voxel.
    pub fn new(voxel_size: f32, voxels_per_side: u32) -> Self {
        Self {
            voxel_size,
            voxel_size_inv: 1.0 / voxel_size,
            voxels_per_side,
        }
    }

    /// Voxel edge length (meters).
    #[inline]
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Pre-computed `1.0 / voxel_size`.
    #[inline]
    pub fn voxel_size_inv(&self) -> f32 {
        self.voxel_size_inv
    }

    /// Voxels along one block edge.
    #[inline]
    pub fn voxels_per_side(&self) -> u32 {
        self.voxels_per_side
    }

    /// Voxels in one block.
    #[inline]
    pub fn voxels_per_block(&self) -> usize {
        let vps = self.voxels_per_side as usize;
        vps * vps * vps
    }

    /// Block edge length (meters).
    #[inline]
    pub fn block_size(&self) -> f32 {
        self.voxel_size * self.voxels_per_side as f32
    }

    /// Voxel containing a world point.
    #[inline]
    pub fn voxel_index(&self, point: Vec3) -> GlobalVoxelIndex {
        (point * self.voxel_size_inv).floor().as_ivec3()
    }

    /// Block containing a global voxel.
    #[inline]
    pub fn block_of_voxel(&self, voxel: GlobalVoxelIndex) -> BlockIndex {
        let vps = self.voxels_per_side as i32;
        IVec3::new(
            voxel.x.div_euclid(vps),
            voxel.y.div_euclid(vps),
            voxel.z.div_euclid(vps),
        )
    }

    /// Block containing a world point.
    #[inline]
    pub fn block_index(&self, point: Vec3) -> BlockIndex {
        self.block_of_voxel(self.voxel_index(point))
    }

    /// Linear slot of a global voxel inside its block.
    #[inline]
    pub fn linear_index(&self, voxel: GlobalVoxelIndex) -> usize {
        let vps = self.voxels_per_side as i32;
        let x = voxel.x.rem_euclid(vps) as usize;
        let y = voxel.y.rem_euclid(vps) as usize;
        let z = voxel.z.rem_euclid(vps) as usize;
        let vps = vps as usize;
        x + vps * (y + vps * z)
    }

    /// Global voxel at `linear` inside `block`.
    #[inline]
    pub fn global_index(&self, block: BlockIndex, linear: usize) -> GlobalVoxelIndex {
        let vps = self.voxels_per_side as usize;
        let local = IVec3::new(
            (linear % vps) as i32,
            ((linear / vps) % vps) as i32,
            (linear / (vps * vps)) as i32,
        );
        block * self.voxels_per_side as i32 + local
    }

    /// World position of a block's minimum corner.
    #[inline]
    pub fn block_origin(&self, block: BlockIndex) -> Vec3 {
        block.as_vec3() * self.block_size()
    }

    /// World position of a voxel's center.
    #[inline]
    pub fn voxel_center(&self, voxel: GlobalVoxelIndex) -> Vec3 {
        (voxel.as_vec3() + Vec3::splat(0.5)) * self.voxel_size
    }
}
