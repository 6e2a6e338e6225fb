//! Integrator configuration section.

use serde::{Deserialize, Serialize};

use crate::grid::raycaster::RayConfig;

use super::defaults;
use super::error::ConfigError;

/// Ray integration and threading settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegratorConfig {
    /// Worker threads for the parallel voxel pass
    #[serde(default = "defaults::integrator_threads")]
    pub integrator_threads: usize,

    /// Skip voxels that are themselves surface work items of the same cloud
    #[serde(default)]
    pub enable_anti_grazing: bool,

    /// Trace surface rays from the sensor origin instead of the truncation band
    #[serde(default = "defaults::enabled")]
    pub voxel_carving_enabled: bool,

    /// Turn over-long rays into clearing rays instead of dropping them
    #[serde(default = "defaults::enabled")]
    pub allow_clear: bool,

    /// Use weight 1 for every point instead of inverse squared depth
    #[serde(default)]
    pub use_const_weight: bool,

    /// Rays shorter than this are dropped (meters)
    #[serde(default = "defaults::min_ray_length_m")]
    pub min_ray_length_m: f32,

    /// Rays longer than this become clearing rays (meters)
    #[serde(default = "defaults::max_ray_length_m")]
    pub max_ray_length_m: f32,

    /// Half-width of the band traced around a surface point (meters)
    #[serde(default = "defaults::truncation_distance")]
    pub default_truncation_distance: f32,

    /// Lock bank holds 2^bits locks
    #[serde(default = "defaults::lock_bank_bits")]
    pub lock_bank_bits: u32,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            integrator_threads: defaults::integrator_threads(),
            enable_anti_grazing: false,
            voxel_carving_enabled: defaults::enabled(),
            allow_clear: defaults::enabled(),
            use_const_weight: false,
            min_ray_length_m: defaults::min_ray_length_m(),
            max_ray_length_m: defaults::max_ray_length_m(),
            default_truncation_distance: defaults::truncation_distance(),
            lock_bank_bits: defaults::lock_bank_bits(),
        }
    }
}

impl IntegratorConfig {
    /// Ray geometry for the traversal backend.
    pub fn ray_config(&self) -> RayConfig {
        RayConfig {
            voxel_carving_enabled: self.voxel_carving_enabled,
            max_ray_length_m: self.max_ray_length_m,
            truncation_distance: self.default_truncation_distance,
        }
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.integrator_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if !(1..=24).contains(&self.lock_bank_bits) {
            return Err(ConfigError::InvalidLockBankBits(self.lock_bank_bits));
        }
        if self.min_ray_length_m < 0.0 || self.max_ray_length_m < self.min_ray_length_m {
            return Err(ConfigError::InvalidRayLength {
                min: self.min_ray_length_m,
                max: self.max_ray_length_m,
            });
        }
        Ok(())
    }
}
