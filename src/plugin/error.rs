//! Plugin system error types.

use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur during plugin registration and execution.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin identifier failed validation.
    #[error("Invalid plugin id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    /// A plugin with the same identifier is already registered.
    #[error("Plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    /// A custom plugin pattern did not compile.
    #[error("Invalid pattern '{pattern}' in plugin '{plugin}': {reason}")]
    InvalidPattern { plugin: String, pattern: String, reason: String },

    /// Plugin execution failed.
    #[error("Plugin '{plugin}' failed: {message}")]
    ExecutionError { plugin: String, message: String },

    /// Plugin timed out.
    #[error("Plugin '{0}' timeout after {1} ms")]
    Timeout(String, u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let err = PluginError::Timeout("slow".to_string(), 250);
        let message = err.to_string();
        assert!(message.contains("timeout"));
        assert!(message.contains("250"));
    }

    #[test]
    fn test_invalid_id_message() {
        let err = PluginError::InvalidId { id: "a b".to_string(), reason: "bad".to_string() };
        assert_eq!(err.to_string(), "Invalid plugin id 'a b': bad");
    }
}
