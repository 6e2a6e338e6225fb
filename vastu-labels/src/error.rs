//! Error types for vastu-labels.

use crate::config::ConfigError;
use crate::core::Label;

/// Result type alias
pub type Result<T> = std::result::Result<T, FusionError>;

/// Label fusion error types
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// No label above `highest` can be minted.
    #[error("Label space exhausted: highest issued label is {highest}")]
    LabelSpaceExhausted {
        /// Highest label issued so far.
        highest: Label,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
