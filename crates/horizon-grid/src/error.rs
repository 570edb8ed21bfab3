//! Error types for the grid engine.
//!
//! Only inputs that can genuinely be rejected produce errors: option files,
//! serialized selection states and serialized filter models. Problems found
//! while building or mutating the row tree are reported as warnings through
//! [`Diagnostics`](horizon_grid_core::Diagnostics) instead.

use std::path::PathBuf;

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors that can occur when loading grid input.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Options file could not be read.
    #[error("Failed to read grid options '{path}': {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Options JSON could not be parsed.
    #[error("Invalid grid options JSON: {0}")]
    ConfigJson(#[source] serde_json::Error),

    /// Options TOML could not be parsed.
    #[error("Invalid grid options TOML: {0}")]
    ConfigToml(#[source] toml::de::Error),

    /// Options could not be serialized to TOML.
    #[error("Failed to serialize grid options to TOML: {0}")]
    ConfigTomlWrite(#[source] toml::ser::Error),

    /// Options file has an extension other than `.json` or `.toml`.
    #[error("Unsupported grid options format for '{path}' (expected .json or .toml)")]
    ConfigFormat { path: PathBuf },

    /// A serialized selection state failed shape validation.
    #[error("Invalid selection state: {reason}")]
    InvalidSelectionState { reason: String },

    /// A serialized filter model could not be parsed.
    #[error("Invalid filter model: {0}")]
    InvalidFilterModel(#[source] serde_json::Error),
}

impl GridError {
    /// Create an I/O error for an options file.
    pub fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }

    /// Create a selection state error.
    pub fn invalid_selection_state(reason: impl Into<String>) -> Self {
        Self::InvalidSelectionState {
            reason: reason.into(),
        }
    }
}
