//! Main FusionConfig and loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigLoadError};
use super::grid::GridConfig;
use super::integrator::IntegratorConfig;
use super::labels::LabelConfig;

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "configs/labels.yaml";

/// Full label fusion configuration loaded from YAML
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct FusionConfig {
    /// Voxel and block layout
    #[serde(default)]
    pub grid: GridConfig,

    /// Ray integration and threading
    #[serde(default)]
    pub integrator: IntegratorConfig,

    /// Confidence and merging
    #[serde(default)]
    pub labels: LabelConfig,
}

impl FusionConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load from default config path (configs/labels.yaml)
    pub fn load_default() -> Result<Self, ConfigLoadError> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FusionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.integrator.validate()?;
        self.labels.validate()?;
        Ok(())
    }

    /// Same configuration with a fixed thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.integrator.integrator_threads = threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FusionConfig::default();
        assert_eq!(config.grid.voxel_size, 0.01);
        assert_eq!(config.grid.voxels_per_side, 16);
        assert_eq!(config.labels.pairwise_confidence_threshold, 2);
        assert!(!config.labels.enable_pairwise_confidence_merging);
        assert!(config.integrator.integrator_threads >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = FusionConfig::default().with_threads(3);
        let yaml = config.to_yaml().unwrap();
        let parsed = FusionConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.integrator.integrator_threads, 3);
        assert_eq!(parsed.grid.voxel_size, config.grid.voxel_size);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
grid:
  voxel_size: 0.05
labels:
  enable_pairwise_confidence_merging: true
  cap_confidence: true
"#;
        let config = FusionConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.grid.voxel_size, 0.05);
        assert_eq!(config.grid.voxels_per_side, 16);
        assert!(config.labels.enable_pairwise_confidence_merging);
        assert_eq!(config.labels.confidence_cap_value, 10);
        assert_eq!(config.integrator.lock_bank_bits, 12);
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let yaml = "integrator:\n  integrator_threads: 0\n";
        match FusionConfig::from_yaml(yaml) {
            Err(ConfigLoadError::Invalid(ConfigError::ZeroThreads)) => {}
            other => panic!("expected ZeroThreads, got {:?}", other),
        }

        let yaml = "labels:\n  pairwise_confidence_ratio_threshold: 1.5\n";
        assert!(matches!(
            FusionConfig::from_yaml(yaml),
            Err(ConfigLoadError::Invalid(ConfigError::InvalidRatioThreshold(_)))
        ));

        assert!(matches!(
            FusionConfig::from_yaml("grid: [1, 2"),
            Err(ConfigLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.yaml");
        std::fs::write(&path, "grid:\n  voxels_per_side: 8\n").unwrap();

        let config = FusionConfig::load(&path).unwrap();
        assert_eq!(config.grid.voxels_per_side, 8);

        assert!(matches!(
            FusionConfig::load(&dir.path().join("missing.yaml")),
            Err(ConfigLoadError::Io(_))
        ));
    }
}
