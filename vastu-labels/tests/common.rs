//! Test utilities for label fusion.
//!
//! Builders for synthetic planar patches seen from a sensor at the origin.

#![allow(dead_code)]

use glam::Vec3;
use vastu_labels::{Color, FusionConfig, Label, Segment, SegmentMap, Transformation, VoxelState};

/// Voxel size used by every test map (meters).
pub const VOXEL_SIZE: f32 = 0.1;

/// Small-voxel config with deterministic ray geometry.
pub fn test_config(threads: usize) -> FusionConfig {
    let mut config = FusionConfig::default().with_threads(threads);
    config.grid.voxel_size = VOXEL_SIZE;
    config.grid.voxels_per_side = 8;
    config.integrator.voxel_carving_enabled = false;
    config.integrator.use_const_weight = true;
    config
}

/// Config with pairwise merging enabled.
pub fn merging_config(threads: usize) -> FusionConfig {
    let mut config = test_config(threads);
    config.labels.enable_pairwise_confidence_merging = true;
    config.labels.pairwise_confidence_ratio_threshold = 0.05;
    config.labels.pairwise_confidence_threshold = 2;
    config
}

/// Map with the built-in backend.
pub fn test_map(config: FusionConfig) -> SegmentMap {
    SegmentMap::new(config).unwrap()
}

/// Center of voxel `(ix, iy, iz)` in meters.
pub fn voxel_center(ix: i32, iy: i32, iz: i32) -> Vec3 {
    (Vec3::new(ix as f32, iy as f32, iz as f32) + Vec3::splat(0.5)) * VOXEL_SIZE
}

/// One point per voxel center of the rectangle `[x0, x0+nx) × [y0, y0+ny)`
/// at voxel height `iz`.
pub fn patch_points(x0: i32, y0: i32, nx: i32, ny: i32, iz: i32) -> Vec<Vec3> {
    let mut points = Vec::with_capacity((nx * ny) as usize);
    for y in y0..y0 + ny {
        for x in x0..x0 + nx {
            points.push(voxel_center(x, y, iz));
        }
    }
    points
}

/// Unlabeled segment seen from the origin.
pub fn segment(points: Vec<Vec3>) -> Segment {
    segment_from(Transformation::IDENTITY, points)
}

/// Unlabeled segment seen from `transform`.
pub fn segment_from(transform: Transformation, points: Vec<Vec3>) -> Segment {
    let colors = gray(points.len());
    Segment::new(transform, points, colors)
}

/// `n` mid-gray colors.
pub fn gray(n: usize) -> Vec<Color> {
    vec![Color::rgb(128, 128, 128); n]
}

/// Integrate `points` seen from the origin, all carrying `label`, `times` times.
pub fn paint(map: &mut SegmentMap, points: &[Vec3], label: Label, times: usize) {
    let colors = gray(points.len());
    let labels = vec![label; points.len()];
    for _ in 0..times {
        map.integrate_point_cloud(&Transformation::IDENTITY, points, &colors, &labels, false);
    }
}

/// Every observed voxel, sorted by index.
pub fn snapshot(map: &SegmentMap) -> Vec<((i32, i32, i32), VoxelState)> {
    let mut voxels: Vec<_> = map
        .layer()
        .observed_voxels()
        .map(|(v, state)| ((v.x, v.y, v.z), state))
        .collect();
    voxels.sort_by_key(|(v, _)| *v);
    voxels
}

/// Label counts agree with a full scan of the layer.
pub fn assert_counts_match_layer(map: &SegmentMap) {
    let mut scanned: Vec<Label> = map.layer().observed_voxels().map(|(_, s)| s.label).collect();
    scanned.sort_unstable();
    scanned.dedup();
    assert_eq!(map.active_labels(), scanned);

    for label in scanned {
        assert_eq!(
            map.label_counts().get(label) as usize,
            map.layer().count_label(label),
            "count mismatch for {}",
            label
        );
    }
}
