//! Shared types used across the dispatch workspace.

mod types;

pub use types::JobId;
