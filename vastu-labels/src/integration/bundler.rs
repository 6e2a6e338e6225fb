//! Groups a cloud's rays by the voxel they end in.
//!
//! Every point is validated by its ray length, transformed to world frame
//! and filed under its end voxel, in the surface map or the clear map. Each
//! unique voxel becomes one work item. Only one thread ever handles a work
//! item, and it handles all of that item's points.
//!
//! ```text
//! |p| < min_ray_length         → dropped
//! |p| > max_ray_length         → clearing (allow_clear) or dropped
//! otherwise                    → surface (clearing if the cloud is free space)
//! ```

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::IntegratorConfig;
use crate::core::{GlobalVoxelIndex, GridGeometry, Transformation};

/// Which work list a pass integrates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RayPass {
    /// Rays ending on an observed surface.
    Surface,
    /// Rays that only clear free space.
    Clearing,
}

impl RayPass {
    /// Is this the clearing pass?
    #[inline]
    pub fn is_clearing(self) -> bool {
        self == RayPass::Clearing
    }

    /// Phase name used for timing.
    pub fn phase_name(self) -> &'static str {
        match self {
            RayPass::Surface => "integrate",
            RayPass::Clearing => "integrate/clear",
        }
    }
}

/// One unique end voxel and the points whose rays end there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    /// End voxel shared by the points.
    pub voxel: GlobalVoxelIndex,
    /// Point indices into the cloud, ascending.
    pub points: Vec<usize>,
}

/// Ray length limits applied while bundling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayLimits {
    /// Shorter rays are dropped (meters).
    pub min_ray_length_m: f32,
    /// Longer rays clear or are dropped (meters).
    pub max_ray_length_m: f32,
    /// Turn over-long rays into clearing rays.
    pub allow_clear: bool,
}

impl RayLimits {
    /// Limits from the integrator settings.
    pub fn from_config(config: &IntegratorConfig) -> Self {
        Self {
            min_ray_length_m: config.min_ray_length_m,
            max_ray_length_m: config.max_ray_length_m,
            allow_clear: config.allow_clear,
        }
    }

    /// Classify one point. `None` drops it, otherwise `Some(clearing)`.
    pub fn classify(&self, point_c: Vec3, freespace: bool) -> Option<bool> {
        let distance = point_c.length();
        if distance < self.min_ray_length_m {
            None
        } else if distance > self.max_ray_length_m {
            self.allow_clear.then_some(true)
        } else {
            Some(freespace)
        }
    }
}

/// Surface and clearing work lists for one cloud.
#[derive(Clone, Debug, Default)]
pub struct VoxelBundle {
    surface: Vec<WorkItem>,
    clearing: Vec<WorkItem>,
    surface_voxels: FxHashSet<GlobalVoxelIndex>,
    dropped: usize,
}

impl VoxelBundle {
    /// Bundle a cloud's points.
    ///
    /// Work lists are sorted by voxel index so that the partition of items
    /// across threads does not depend on hash order.
    pub fn build(
        transform: &Transformation,
        points_c: &[Vec3],
        freespace: bool,
        limits: &RayLimits,
        geometry: &GridGeometry,
    ) -> Self {
        let mut voxel_map: FxHashMap<GlobalVoxelIndex, Vec<usize>> = FxHashMap::default();
        let mut clear_map: FxHashMap<GlobalVoxelIndex, Vec<usize>> = FxHashMap::default();
        let mut dropped = 0;

        for (i, &point_c) in points_c.iter().enumerate() {
            let Some(clearing) = limits.classify(point_c, freespace) else {
                dropped += 1;
                continue;
            };
            let voxel = geometry.voxel_index(transform.transform_point(point_c));
            let map = if clearing {
                &mut clear_map
            } else {
                &mut voxel_map
            };
            map.entry(voxel).or_default().push(i);
        }

        let surface_voxels = voxel_map.keys().copied().collect();
        Self {
            surface: into_sorted_items(voxel_map),
            clearing: into_sorted_items(clear_map),
            surface_voxels,
            dropped,
        }
    }

    /// Work list for a pass.
    pub fn items(&self, pass: RayPass) -> &[WorkItem] {
        match pass {
            RayPass::Surface => &self.surface,
            RayPass::Clearing => &self.clearing,
        }
    }

    /// Is `voxel` the end voxel of a surface work item?
    #[inline]
    pub fn is_surface_voxel(&self, voxel: GlobalVoxelIndex) -> bool {
        self.surface_voxels.contains(&voxel)
    }

    /// Points rejected by the ray length limits.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// No work in either pass?
    pub fn is_empty(&self) -> bool {
        self.surface.is_empty() && self.clearing.is_empty()
    }
}

fn into_sorted_items(map: FxHashMap<GlobalVoxelIndex, Vec<usize>>) -> Vec<WorkItem> {
    let mut items: Vec<WorkItem> = map
        .into_iter()
        .map(|(voxel, points)| WorkItem { voxel, points })
        .collect();
    items.sort_unstable_by_key(|item| (item.voxel.x, item.voxel.y, item.voxel.z));
    items
}
