//! 3D voxel traversal along sensor rays.
//!
//! Rays are walked with the Amanatides-Woo grid traversal: the parametric
//! distance to the next voxel boundary is tracked per axis, and each step
//! crosses whichever boundary is nearest.
//!
//! ```text
//!        ┌───┬───┬───┬───┐
//!        │   │   │ ● │ ● │ end
//!        ├───┼───┼───┼───┤
//!        │ ● │ ● │ ● │   │
//!  start ├───┼───┼───┼───┤
//!        │ ● │   │   │   │
//!        └───┴───┴───┴───┘
//! ```
//!
//! The visited voxels are 6-connected: every step changes exactly one axis,
//! so the number of voxels is the Manhattan distance between the end
//! voxels plus one.
//!
//! ## Ray geometry
//!
//! Surface rays cover the truncation band around the measured point:
//!
//! ```text
//! origin ──────────── p-τ ──── p ──── p+τ
//!          (carving)   [ surface band ]
//! ```
//!
//! With voxel carving the ray starts at the sensor origin. Clearing rays end
//! one truncation distance short of the point (and never beyond
//! `max_ray_length_m`), since the point itself is not trusted.

use glam::{IVec3, Vec3};

use crate::core::GlobalVoxelIndex;

/// Geometry of the rays cast for each integrated point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayConfig {
    /// Start every ray at the sensor origin.
    pub voxel_carving_enabled: bool,
    /// Clearing rays are cut at this length (meters).
    pub max_ray_length_m: f32,
    /// Half-width of the surface band (meters).
    pub truncation_distance: f32,
}

impl RayConfig {
    /// World-space endpoints of the ray for one point.
    pub fn endpoints(&self, origin: Vec3, point_g: Vec3, clearing: bool) -> (Vec3, Vec3) {
        let unit = (point_g - origin).normalize_or_zero();
        let trunc = self.truncation_distance;

        if clearing {
            let length = ((point_g - origin).length() - trunc)
                .max(0.0)
                .min(self.max_ray_length_m);
            let end = origin + unit * length;
            let start = if self.voxel_carving_enabled {
                origin
            } else {
                end - unit * trunc
            };
            (start, end)
        } else {
            let end = point_g + unit * trunc;
            let start = if self.voxel_carving_enabled {
                origin
            } else {
                point_g - unit * trunc
            };
            (start, end)
        }
    }

    /// Voxels traversed for one point.
    pub fn cast(
        &self,
        origin: Vec3,
        point_g: Vec3,
        clearing: bool,
        voxel_size_inv: f32,
    ) -> VoxelRay {
        let (start, end) = self.endpoints(origin, point_g, clearing);
        VoxelRay::new(start * voxel_size_inv, end * voxel_size_inv)
    }
}

/// Iterator over the voxels between two points in voxel units.
#[derive(Clone, Debug)]
pub struct VoxelRay {
    current: IVec3,
    step_signs: IVec3,
    t_to_next: Vec3,
    t_step: Vec3,
    length_in_steps: u32,
    steps: u32,
}

impl VoxelRay {
    /// Ray from `start_scaled` to `end_scaled`, both in voxel units
    /// (world position times `1 / voxel_size`).
    pub fn new(start_scaled: Vec3, end_scaled: Vec3) -> Self {
        let start_index = start_scaled.floor().as_ivec3();
        let end_index = end_scaled.floor().as_ivec3();
        let diff = (end_index - start_index).abs();
        let length_in_steps = (diff.x + diff.y + diff.z) as u32;

        let ray = end_scaled - start_scaled;
        let step_signs = IVec3::new(sign(ray.x), sign(ray.y), sign(ray.z));
        let shifted = start_scaled - start_index.as_vec3();

        let mut t_to_next = Vec3::splat(f32::INFINITY);
        let mut t_step = Vec3::splat(f32::INFINITY);
        for axis in 0..3 {
            if step_signs[axis] != 0 {
                let corrected_step = step_signs[axis].max(0) as f32;
                t_to_next[axis] = (corrected_step - shifted[axis]) / ray[axis];
                t_step[axis] = step_signs[axis] as f32 / ray[axis];
            }
        }

        Self {
            current: start_index,
            step_signs,
            t_to_next,
            t_step,
            length_in_steps,
            steps: 0,
        }
    }

    /// Voxels still to be visited after the first.
    #[inline]
    pub fn length_in_steps(&self) -> u32 {
        self.length_in_steps
    }
}

#[inline]
fn sign(v: f32) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

impl Iterator for VoxelRay {
    type Item = GlobalVoxelIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.steps > self.length_in_steps {
            return None;
        }
        self.steps += 1;
        let voxel = self.current;

        let t = self.t_to_next;
        let axis = if t.x <= t.y && t.x <= t.z {
            0
        } else if t.y <= t.z {
            1
        } else {
            2
        };
        self.current[axis] += self.step_signs[axis];
        self.t_to_next[axis] += self.t_step[axis];

        Some(voxel)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.length_in_steps + 1).saturating_sub(self.steps) as usize;
        (remaining, Some(remaining))
    }
}
