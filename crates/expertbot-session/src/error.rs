//! # Storage Error Types

use thiserror::Error;

/// Storage error
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else, e.g. an unusable base path
    #[error("Storage error: {message}")]
    Other { message: String },
}

impl StorageError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Storage result
pub type StorageResult<T> = Result<T, StorageError>;
