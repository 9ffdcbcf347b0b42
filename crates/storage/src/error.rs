//! Error types for storage operations.

use thiserror::Error;

use swiftslice_common::PathError;

/// Errors that can occur during storage operations.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Object not found in the store.
    #[error("Object not found: {container}/{path}")]
    NotFound { container: String, path: String },

    /// Network error talking to the object store.
    #[error("Network error: {message}")]
    NetworkError { message: String, retryable: bool },

    /// A chunk failed more times than the configured retry limit.
    /// The whole upload operation rejects with this error.
    #[error("Retry limit exhausted for chunk {number}: {source}")]
    RetryExhausted {
        number: u64,
        #[source]
        source: Box<StorageError>,
    },

    /// Manifest commit failed. Not retried at this layer.
    #[error("Manifest commit failed for {container}/{filename}: {message}")]
    ManifestCommitFailed {
        container: String,
        filename: String,
        message: String,
    },

    /// Local I/O error.
    #[error("I/O error for {path}: {message}")]
    IoError { path: String, message: String },

    /// Operation cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid configuration or malformed name; raised before any
    /// network call.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl StorageError {
    /// Check if this error is worth retrying at the transport level.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::NetworkError { retryable, .. } => *retryable,
            StorageError::NotFound { .. } => false,
            StorageError::RetryExhausted { .. } => false,
            StorageError::ManifestCommitFailed { .. } => false,
            StorageError::IoError { .. } => false,
            StorageError::Cancelled => false,
            StorageError::InvalidConfig { .. } => false,
            StorageError::Other { .. } => false,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

impl From<PathError> for StorageError {
    fn from(err: PathError) -> Self {
        StorageError::InvalidConfig {
            message: err.to_string(),
        }
    }
}
