use thiserror::Error;

use crate::JobId;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write or commit was attempted without an open session.
    #[error("No storage session is open")]
    NoSession,

    /// An insert targeted an aggregate that is already stored.
    #[error("Aggregate already exists: {0}")]
    AlreadyExists(JobId),

    /// An update targeted an aggregate that is not stored.
    #[error("Aggregate not found: {0}")]
    NotFound(JobId),

    /// The storage backend rejected the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
