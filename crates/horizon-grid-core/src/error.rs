//! Error types for Horizon Grid core.

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the core notification and diagnostics layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The connection ID is invalid or has already been disconnected.
    #[error("invalid or disconnected connection ID")]
    InvalidConnection,

    /// A numeric diagnostic code that does not map to a known warning.
    #[error("unknown diagnostic code {0}")]
    UnknownWarningCode(u32),
}
