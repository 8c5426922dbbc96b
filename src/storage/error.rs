//! Storage error types
//!
//! Defines all errors that can occur in the tree store.

use thiserror::Error;

/// Errors that can occur in the tree store
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Data corruption detected (checksum mismatch, invalid magic, etc.)
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Path is empty or contains characters that cannot be used as keys
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Payload cannot be stored at the given path
    #[error("Invalid payload at {0}: value must be an object to hold children")]
    InvalidPayload(String),

    /// WAL format or recovery error
    #[error("WAL error: {0}")]
    WalError(String),

    /// Listener is not registered
    #[error("Listener not found: {0}")]
    ListenerNotFound(String),

    /// Store has been shut down
    #[error("Store is shut down")]
    ShutDown,
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
