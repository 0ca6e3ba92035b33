//! Runtime error types for extension code.
//!
//! These errors describe failures that happen *after* resolution, while a
//! tool, plugin or storage backend is being used. Resolution failures live
//! in `capstan-resolver`.

use crate::validation::ValidationError;

/// Boxed error used where an extension wraps an arbitrary cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(#[from] ValidationError),

    #[error("{backend} backend failed to {operation} '{key}': {reason}")]
    OperationFailed {
        backend: &'static str,
        operation: &'static str,
        key: String,
        reason: String,
    },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn operation_failed(
        backend: &'static str,
        operation: &'static str,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        StorageError::OperationFailed {
            backend,
            operation,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Failures raised by tools, plugins and orchestrator services while they run.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("Invalid input for '{extension}': {reason}")]
    InvalidInput { extension: String, reason: String },

    #[error("'{extension}' is not permitted to {action}")]
    Denied { extension: String, action: String },

    #[error("'{extension}' failed: {reason}")]
    Failed { extension: String, reason: String },

    #[error("The owning agent is no longer available")]
    AgentUnavailable,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ExtensionError {
    pub fn invalid_input(extension: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtensionError::InvalidInput {
            extension: extension.into(),
            reason: reason.into(),
        }
    }

    pub fn denied(extension: impl Into<String>, action: impl Into<String>) -> Self {
        ExtensionError::Denied {
            extension: extension.into(),
            action: action.into(),
        }
    }

    pub fn failed(extension: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtensionError::Failed {
            extension: extension.into(),
            reason: reason.into(),
        }
    }
}

pub type ExtensionResult<T> = Result<T, ExtensionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_messages_name_the_backend() {
        let err = StorageError::operation_failed("in-memory", "read", "kv/a", "lock poisoned");
        let msg = err.to_string();
        assert!(msg.contains("in-memory"));
        assert!(msg.contains("kv/a"));
        assert!(msg.contains("lock poisoned"));
    }

    #[test]
    fn extension_error_wraps_storage_errors() {
        let err: ExtensionError = StorageError::InvalidKey(ValidationError::Empty).into();
        assert!(matches!(err, ExtensionError::Storage(_)));
        assert!(err.to_string().contains("empty"));
    }
}
