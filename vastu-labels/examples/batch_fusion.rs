//! Fuse segmented views of a synthetic scene into a label map.
//!
//! This example demonstrates:
//! - Loading a YAML configuration (or the defaults)
//! - Integrating segment batches from several sensor poses
//! - Label consistency across viewpoints
//! - Merging two labels once a segment keeps spanning both
//!
//! # Usage
//!
//! ```bash
//! cargo run --example batch_fusion -- configs/labels.yaml
//! ```

use std::path::Path;

use glam::{Quat, Vec3};
use vastu_labels::{Color, FusionConfig, Segment, SegmentMap, Transformation};

/// Points on the plane z = `depth` covering `[x0, x1] × [y0, y1]` (world frame).
fn panel(x0: f32, x1: f32, y0: f32, y1: f32, depth: f32, spacing: f32) -> Vec<Vec3> {
    let mut points = Vec::new();
    let mut x = x0;
    while x <= x1 {
        let mut y = y0;
        while y <= y1 {
            points.push(Vec3::new(x, y, depth));
            y += spacing;
        }
        x += spacing;
    }
    points
}

/// Segment of world points as seen from `pose`.
fn observe(pose: &Transformation, world: &[Vec3], color: Color) -> Segment {
    let to_sensor = pose.inverse();
    let points: Vec<Vec3> = world.iter().map(|&p| to_sensor.transform_point(p)).collect();
    let colors = vec![color; points.len()];
    Segment::new(*pose, points, colors)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = match args.get(1) {
        Some(path) => FusionConfig::load(Path::new(path))?,
        None => FusionConfig::load_default()?,
    };
    config.grid.voxel_size = 0.05;
    config.labels.enable_pairwise_confidence_merging = true;

    let mut map = SegmentMap::new(config)?;

    let left = panel(-0.6, -0.05, -0.3, 0.3, 2.0, 0.03);
    let right = panel(0.05, 0.6, -0.3, 0.3, 2.0, 0.03);
    let red = Color::rgb(200, 40, 40);
    let blue = Color::rgb(40, 40, 200);

    // View 1: both panels segmented separately.
    let origin = Transformation::IDENTITY;
    let mut batch = vec![observe(&origin, &left, red), observe(&origin, &right, blue)];
    let result = map.integrate_segments(&mut batch)?;
    for assignment in &result.assignments {
        log::info!(
            "View 1: segment {} -> {} (fresh: {})",
            assignment.segment,
            assignment.label,
            assignment.fresh
        );
    }

    // Views 2..5: sensor sweeps sideways, segmentation merges both panels.
    let both: Vec<Vec3> = left.iter().chain(right.iter()).copied().collect();
    for step in 1..=4 {
        let pose = Transformation::new(
            Quat::from_rotation_y(-0.05 * step as f32),
            Vec3::new(0.1 * step as f32, 0.0, 0.0),
        );
        let mut batch = vec![observe(&pose, &both, Color::rgb(120, 120, 120))];
        let result = map.integrate_segments(&mut batch)?;
        log::info!(
            "View {}: segment -> {}, {} voxel updates",
            step + 1,
            result.assignments[0].label,
            result.integration.voxel_updates
        );
    }

    for (pair, count) in map.ledger().iter() {
        log::info!("Co-occurrence {}: {}", pair, count);
    }
    for merge in map.merge_labels() {
        log::info!(
            "{} merged into {} ({} voxels)",
            merge.superseded,
            merge.survivor,
            merge.voxels
        );
    }

    println!("Active labels:");
    for label in map.active_labels() {
        println!("  {}: {} voxels", label, map.label_counts().get(label));
    }
    println!("Blocks: {}", map.layer().block_count());
    println!();
    println!("Phase timings:");
    for timing in map.timings() {
        println!("  {}", timing.summary());
    }

    Ok(())
}
