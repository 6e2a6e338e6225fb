//! Configuration errors.

/// Configuration rejected by validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Voxel size must be positive and finite.
    #[error("Invalid voxel size: {0}")]
    InvalidVoxelSize(f32),

    /// Block edge out of range.
    #[error("Voxels per side must be within 1..=256, got {0}")]
    InvalidVoxelsPerSide(u32),

    /// At least one integrator thread is required.
    #[error("Integrator threads must be at least 1")]
    ZeroThreads,

    /// Lock bank size out of range.
    #[error("Lock bank bits must be within 1..=24, got {0}")]
    InvalidLockBankBits(u32),

    /// Ray length bounds are inconsistent.
    #[error("Invalid ray length bounds: min {min}, max {max}")]
    InvalidRayLength {
        /// Minimum ray length (m).
        min: f32,
        /// Maximum ray length (m).
        max: f32,
    },

    /// Confidence cap must be positive when capping is enabled.
    #[error("Confidence cap must be at least 1")]
    ZeroConfidenceCap,

    /// Overlap ratio threshold must be a fraction.
    #[error("Pairwise confidence ratio threshold must be within [0, 1], got {0}")]
    InvalidRatioThreshold(f32),

    /// Backend voxel layout disagrees with the label grid.
    #[error("Backend grid (voxel size {backend}) does not match label grid (voxel size {grid})")]
    BackendMismatch {
        /// Voxel size of the label grid.
        grid: f32,
        /// Voxel size reported by the backend.
        backend: f32,
    },

    /// Worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Config load error
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Parsed but invalid
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}
