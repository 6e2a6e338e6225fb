//! Capabilities consumed from the volumetric reconstruction engine.
//!
//! The label engine does not own surface reconstruction. It asks a backend
//! for the voxels a ray traverses and for point weights, and hands every
//! traversed voxel back so the backend can update its own state under the
//! same voxel lock.

use glam::Vec3;

use crate::config::FusionConfig;
use crate::core::{Color, GlobalVoxelIndex, GridGeometry, Label};
use crate::grid::{RayConfig, VoxelRay};

/// Points closer than this to the sensor plane get zero weight.
const WEIGHT_EPSILON: f32 = 1e-6;

/// Merged observation for one work item, as written along its ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    /// Sensor origin (world frame).
    pub origin: Vec3,
    /// Weighted mean point (world frame).
    pub point_g: Vec3,
    /// Blended color.
    pub color: Color,
    /// Summed point weight.
    pub weight: f32,
    /// Label carried by the contributing points.
    pub label: Label,
    /// Ray clears free space instead of observing a surface.
    pub clearing: bool,
}

/// Reconstruction engine capabilities used during integration.
///
/// Called concurrently from integration workers, hence `Sync`.
/// [`update_voxel`](Self::update_voxel) runs while the caller holds the lock
/// bank entry for `voxel`.
pub trait ReconstructionBackend: Sync {
    /// Voxels yielded by [`traverse_ray`](Self::traverse_ray).
    type Ray: Iterator<Item = GlobalVoxelIndex>;

    /// Voxel addressing shared with the label layer.
    fn geometry(&self) -> &GridGeometry;

    /// Contribution weight of a point in sensor frame.
    fn point_weight(&self, point_c: Vec3) -> f32;

    /// Ordered voxels from the sensor origin towards `point_g`.
    fn traverse_ray(&self, origin: Vec3, point_g: Vec3, clearing: bool) -> Self::Ray;

    /// Update the backend's own voxel for a traversed voxel.
    fn update_voxel(&self, _voxel: GlobalVoxelIndex, _sample: &SurfaceSample) {}

    /// Install blocks the backend allocated during the last pass.
    ///
    /// Called single-threaded after every pass, alongside the label fold-back.
    fn install_staged_blocks(&mut self) {}
}

/// Backend that only provides ray traversal and point weighting.
#[derive(Clone, Debug)]
pub struct RayTraversalBackend {
    geometry: GridGeometry,
    ray: RayConfig,
    use_const_weight: bool,
}

impl RayTraversalBackend {
    /// Create a backend.
    pub fn new(geometry: GridGeometry, ray: RayConfig, use_const_weight: bool) -> Self {
        Self {
            geometry,
            ray,
            use_const_weight,
        }
    }

    /// Backend matching a configuration.
    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(
            config.grid.geometry(),
            config.integrator.ray_config(),
            config.integrator.use_const_weight,
        )
    }

    /// Ray geometry.
    pub fn ray_config(&self) -> &RayConfig {
        &self.ray
    }
}

impl ReconstructionBackend for RayTraversalBackend {
    type Ray = VoxelRay;

    fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    fn point_weight(&self, point_c: Vec3) -> f32 {
        if self.use_const_weight {
            1.0
        } else if point_c.z.abs() > WEIGHT_EPSILON {
            1.0 / (point_c.z * point_c.z)
        } else {
            0.0
        }
    }

    fn traverse_ray(&self, origin: Vec3, point_g: Vec3, clearing: bool) -> VoxelRay {
        self.ray
            .cast(origin, point_g, clearing, self.geometry.voxel_size_inv())
    }
}
