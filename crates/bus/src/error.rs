//! Dispatch error types.

use store::StoreError;
use thiserror::Error;

/// Errors that can occur while dispatching a chain.
///
/// Every variant is fatal to the chain in flight. Events without a handler are
/// not errors and never surface here.
#[derive(Debug, Error)]
pub enum BusError {
    /// A command reached the bus with no handler registered for its kind.
    #[error("No handler registered for command {0}")]
    UnhandledCommand(&'static str),

    /// The bus was built while some command kinds had no handler.
    #[error("No handler registered for commands: {}", .0.join(", "))]
    MissingCommandHandlers(Vec<&'static str>),

    /// A unit of work was used without a repository attached.
    #[error("Unit of work is not initialized: no repository attached")]
    UnitOfWorkNotInitialized,

    /// A storage operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A handler failed; wraps the raw business or persistence error.
    #[error("Handler {handler} failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl BusError {
    /// Wraps an error raised inside a handler envelope.
    ///
    /// Errors that already carry a handler identity are returned unchanged.
    pub fn in_handler(handler: &'static str, error: BusError) -> Self {
        match error {
            BusError::Handler { .. } => error,
            other => BusError::Handler {
                handler,
                source: other.into(),
            },
        }
    }

    /// Returns the name of the failing handler, if any.
    pub fn handler(&self) -> Option<&'static str> {
        match self {
            BusError::Handler { handler, .. } => Some(*handler),
            _ => None,
        }
    }
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, BusError>;
