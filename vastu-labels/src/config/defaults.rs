//! Default value functions for serde deserialization.

pub fn voxel_size() -> f32 {
    0.01
}

pub fn voxels_per_side() -> u32 {
    16
}

pub fn integrator_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn enabled() -> bool {
    true
}

pub fn min_ray_length_m() -> f32 {
    0.1
}

pub fn max_ray_length_m() -> f32 {
    5.0
}

pub fn truncation_distance() -> f32 {
    0.1
}

pub fn lock_bank_bits() -> u32 {
    12
}

pub fn pairwise_confidence_ratio_threshold() -> f32 {
    0.05
}

pub fn pairwise_confidence_threshold() -> u32 {
    2
}

pub fn confidence_cap_value() -> u32 {
    10
}
