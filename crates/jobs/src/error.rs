//! Job pipeline error types.

use common::JobId;
use store::StoreError;
use thiserror::Error;

/// Errors raised by job handlers and read models.
#[derive(Debug, Error)]
pub enum JobError {
    /// A job with this id was already submitted.
    #[error("Job already exists: {0}")]
    AlreadyExists(JobId),

    /// No job with this id exists.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// A stored job lacks a required field.
    #[error("Job {id} is missing field '{field}'")]
    MissingField { id: JobId, field: &'static str },

    /// A handler received a message it is not registered for.
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(&'static str),

    /// The analyzer rejected or could not process the document.
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for job results.
pub type Result<T> = std::result::Result<T, JobError>;
