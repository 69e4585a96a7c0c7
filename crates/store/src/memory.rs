use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{AggregateRecord, JobId, ReadOnlyStore, Result, Store, StoreError};

/// Session lifecycle counters, shared by every handle onto one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Debug, Clone)]
struct StagedWrite {
    record: AggregateRecord,
    is_new: bool,
}

#[derive(Debug, Default)]
struct Session {
    staged: HashMap<JobId, StagedWrite>,
}

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<JobId, AggregateRecord>,
    stats: SessionStats,
    fail_on_commit: bool,
    fail_on_rollback: bool,
}

/// In-memory store for tests and local runs.
///
/// Clones share the committed records and counters but never a session:
/// each clone (or [`Store::fork`]) starts without one, so independent units
/// of work can run against the same data concurrently.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    session: Option<Session>,
}

impl Clone for InMemoryStore {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            session: None,
        }
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session lifecycle counters.
    pub async fn stats(&self) -> SessionStats {
        self.tables.lock().await.stats
    }

    /// Returns the number of committed records.
    pub async fn record_count(&self) -> usize {
        self.tables.lock().await.records.len()
    }

    /// Configures every handle onto this store to reject commits.
    pub async fn set_fail_on_commit(&self, fail: bool) {
        self.tables.lock().await.fail_on_commit = fail;
    }

    /// Configures every handle onto this store to reject rollbacks.
    ///
    /// Staged writes are still dropped when the session closes.
    pub async fn set_fail_on_rollback(&self, fail: bool) {
        self.tables.lock().await.fail_on_rollback = fail;
    }

    /// Returns true if this handle currently holds a session.
    pub fn has_open_session(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the number of writes staged in the current session.
    pub fn pending_writes(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.staged.len())
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        self.session.as_mut().ok_or(StoreError::NoSession)
    }
}

#[async_trait]
impl ReadOnlyStore for InMemoryStore {
    async fn fetch(&self, id: &JobId, fields: &[&str]) -> Result<Option<AggregateRecord>> {
        if let Some(staged) = self.session.as_ref().and_then(|s| s.staged.get(id)) {
            return Ok(Some(staged.record.clone().project(fields)));
        }

        let tables = self.tables.lock().await;
        Ok(tables
            .records
            .get(id)
            .cloned()
            .map(|record| record.project(fields)))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn fork(&self) -> Box<dyn Store> {
        Box::new(self.clone())
    }

    async fn open_session(&mut self) -> Result<()> {
        if self.session.is_some() {
            tracing::warn!("storage session reopened, discarding uncommitted writes");
        }
        self.tables.lock().await.stats.sessions_opened += 1;
        self.session = Some(Session::default());
        Ok(())
    }

    async fn close_session(&mut self) -> Result<()> {
        let session = self.session.take().ok_or(StoreError::NoSession)?;
        if !session.staged.is_empty() {
            tracing::debug!(
                discarded = session.staged.len(),
                "closing session with uncommitted writes"
            );
        }
        self.tables.lock().await.stats.sessions_closed += 1;
        Ok(())
    }

    async fn insert(&mut self, mut record: AggregateRecord) -> Result<()> {
        let tables = Arc::clone(&self.tables);
        let session = self.session_mut()?;
        let id = record.external_job_id.clone();

        if session.staged.contains_key(&id) || tables.lock().await.records.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }

        record.version = 1;
        record.updated_at = Utc::now();
        session.staged.insert(
            id,
            StagedWrite {
                record,
                is_new: true,
            },
        );
        Ok(())
    }

    async fn save(&mut self, mut record: AggregateRecord) -> Result<()> {
        let tables = Arc::clone(&self.tables);
        let session = self.session_mut()?;
        let id = record.external_job_id.clone();

        let (current_version, is_new) = match session.staged.get(&id) {
            Some(staged) => (staged.record.version, staged.is_new),
            None => {
                let tables = tables.lock().await;
                let stored = tables
                    .records
                    .get(&id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                (stored.version, false)
            }
        };

        record.version = current_version + 1;
        record.updated_at = Utc::now();
        session.staged.insert(id, StagedWrite { record, is_new });
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tables = Arc::clone(&self.tables);
        let session = self.session_mut()?;
        let mut tables = tables.lock().await;

        if tables.fail_on_commit {
            return Err(StoreError::Backend("commit rejected".to_string()));
        }

        // Another session may have committed the same id since it was staged.
        if let Some(conflict) = session
            .staged
            .values()
            .find(|w| w.is_new && tables.records.contains_key(&w.record.external_job_id))
        {
            return Err(StoreError::AlreadyExists(
                conflict.record.external_job_id.clone(),
            ));
        }

        for (id, write) in session.staged.drain() {
            tables.records.insert(id, write.record);
        }
        tables.stats.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tables = Arc::clone(&self.tables);
        let session = self.session_mut()?;
        let mut tables = tables.lock().await;
        if tables.fail_on_rollback {
            return Err(StoreError::Backend("rollback rejected".to_string()));
        }
        session.staged.clear();
        tables.stats.rollbacks += 1;
        Ok(())
    }
}
