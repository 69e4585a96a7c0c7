//! Storage boundary for the dispatch core.
//!
//! Repositories persist [`AggregateRecord`]s through a session-scoped
//! [`Store`]. The read-only variant ([`ReadOnlyStore`]) only exposes lookups
//! and is what query-side callers should depend on.

pub mod error;
pub mod memory;
pub mod record;
pub mod store;

pub use common::JobId;
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, SessionStats};
pub use record::AggregateRecord;
pub use store::{ReadOnlyStore, Store};
