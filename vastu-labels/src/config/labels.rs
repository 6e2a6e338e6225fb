//! Label fusion configuration section.

use serde::{Deserialize, Serialize};

use crate::core::ConfidencePolicy;

use super::defaults;
use super::error::ConfigError;

/// Confidence capping and pairwise merging settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Track label co-occurrence and allow merging
    #[serde(default)]
    pub enable_pairwise_confidence_merging: bool,

    /// Minimum share of a segment's points a label must cover to be a merge candidate
    #[serde(default = "defaults::pairwise_confidence_ratio_threshold")]
    pub pairwise_confidence_ratio_threshold: f32,

    /// Co-occurrence count a pair must exceed before it is merged
    #[serde(default = "defaults::pairwise_confidence_threshold")]
    pub pairwise_confidence_threshold: u32,

    /// Cap voxel confidence
    #[serde(default)]
    pub cap_confidence: bool,

    /// Confidence cap when capping is enabled
    #[serde(default = "defaults::confidence_cap_value")]
    pub confidence_cap_value: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            enable_pairwise_confidence_merging: false,
            pairwise_confidence_ratio_threshold: defaults::pairwise_confidence_ratio_threshold(),
            pairwise_confidence_threshold: defaults::pairwise_confidence_threshold(),
            cap_confidence: false,
            confidence_cap_value: defaults::confidence_cap_value(),
        }
    }
}

impl LabelConfig {
    /// Confidence policy for voxel writes.
    pub fn confidence_policy(&self) -> ConfidencePolicy {
        if self.cap_confidence {
            ConfidencePolicy::capped(self.confidence_cap_value)
        } else {
            ConfidencePolicy::uncapped()
        }
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cap_confidence && self.confidence_cap_value == 0 {
            return Err(ConfigError::ZeroConfidenceCap);
        }
        let ratio = self.pairwise_confidence_ratio_threshold;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::InvalidRatioThreshold(ratio));
        }
        Ok(())
    }
}
