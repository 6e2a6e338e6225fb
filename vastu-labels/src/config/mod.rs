//! Configuration loading for label fusion.
//!
//! Loads all configuration from a single YAML file with sensible defaults.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vastu_labels::config::FusionConfig;
//!
//! // Load from default path (configs/labels.yaml)
//! let config = FusionConfig::load_default()?;
//!
//! // Or use built-in defaults (no file needed)
//! let config = FusionConfig::default();
//!
//! let map = SegmentMap::new(config)?;
//! ```
//!
//! ## Configuration Sections
//!
//! | Section | Description |
//! |---------|-------------|
//! | [`GridConfig`] | Voxel size and block edge |
//! | [`IntegratorConfig`] | Threads, ray lengths, anti-grazing, lock bank size |
//! | [`LabelConfig`] | Confidence cap and pairwise merging thresholds |
//!
//! ## Example YAML
//!
//! ```yaml
//! grid:
//!   voxel_size: 0.01        # 1cm voxels
//!   voxels_per_side: 16
//!
//! integrator:
//!   integrator_threads: 8
//!   enable_anti_grazing: false
//!   max_ray_length_m: 5.0
//!
//! labels:
//!   enable_pairwise_confidence_merging: true
//!   pairwise_confidence_ratio_threshold: 0.05
//!   pairwise_confidence_threshold: 2
//!   cap_confidence: false
//!   confidence_cap_value: 10
//! ```

mod defaults;
mod error;
mod fusion;
mod grid;
mod integrator;
mod labels;

pub use error::{ConfigError, ConfigLoadError};
pub use fusion::{DEFAULT_CONFIG_PATH, FusionConfig};
pub use grid::GridConfig;
pub use integrator::IntegratorConfig;
pub use labels::LabelConfig;
