//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by the engine itself.
///
/// Per-plugin failures are never reported through this type; they are
/// collected as [`PluginFault`](super::PluginFault) records instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller handed over a structurally invalid value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A background task could not be joined.
    #[error("Background task failed: {0}")]
    Task(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for an invalid-input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
