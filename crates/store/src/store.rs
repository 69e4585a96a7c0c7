use async_trait::async_trait;

use crate::{AggregateRecord, JobId, Result};

/// Read-only access to stored aggregates.
///
/// External repositories that the dispatch core may query but never write
/// implement only this trait.
#[async_trait]
pub trait ReadOnlyStore: Send + Sync {
    /// Looks up an aggregate by its correlation id.
    ///
    /// A non-empty `fields` selection restricts the returned `data` to those
    /// keys. Returns `None` if the aggregate doesn't exist.
    async fn fetch(&self, id: &JobId, fields: &[&str]) -> Result<Option<AggregateRecord>>;
}

/// Session-scoped read/write storage used by repositories.
///
/// Writes are staged inside a session and only become visible to other
/// handles on [`Store::commit`]. Closing a session discards anything that was
/// not committed.
#[async_trait]
pub trait Store: ReadOnlyStore {
    /// Returns a new handle onto the same backing storage with no session open.
    fn fork(&self) -> Box<dyn Store>;

    /// Acquires a storage session.
    async fn open_session(&mut self) -> Result<()>;

    /// Releases the current session, discarding uncommitted writes.
    async fn close_session(&mut self) -> Result<()>;

    /// Stages a new aggregate.
    ///
    /// Fails with `AlreadyExists` if the id is already stored or staged.
    async fn insert(&mut self, record: AggregateRecord) -> Result<()>;

    /// Stages a new version of an existing aggregate.
    ///
    /// Fails with `NotFound` if the id is neither stored nor staged.
    async fn save(&mut self, record: AggregateRecord) -> Result<()>;

    /// Flushes staged writes.
    async fn commit(&mut self) -> Result<()>;

    /// Discards staged writes. The session stays open.
    async fn rollback(&mut self) -> Result<()>;
}
