//! Transactional scope around one repository session.

use common::JobId;
use store::Store;

use crate::aggregate::Aggregate;
use crate::error::{BusError, Result};
use crate::message::Event;
use crate::repository::Repository;

/// Scopes one handler invocation's storage session and collects the events
/// its aggregates recorded.
///
/// Scopes nest: only the outermost [`enter`](Self::enter) opens the session
/// and only the matching outermost [`exit`](Self::exit) closes it. Commit and
/// rollback likewise only reach the store at the outermost level, so
/// [`add`](Self::add), [`get`](Self::get) and [`update`](Self::update) are
/// their own short transactions when used standalone and join the enclosing
/// one inside a handler.
///
/// A unit of work is built fresh for every invocation and never reused.
pub struct UnitOfWork<E> {
    repository: Option<Repository<E>>,
    events: Vec<E>,
    depth: usize,
}

impl<E> Default for UnitOfWork<E> {
    /// A unit of work with no repository attached.
    fn default() -> Self {
        Self {
            repository: None,
            events: Vec::new(),
            depth: 0,
        }
    }
}

impl<E: Event> UnitOfWork<E> {
    pub fn new(repository: Repository<E>) -> Self {
        Self {
            repository: Some(repository),
            events: Vec::new(),
            depth: 0,
        }
    }

    /// Builds a unit of work over a fresh repository for the given store.
    pub fn for_store(store: Box<dyn Store>) -> Self {
        Self::new(Repository::new(store))
    }

    pub fn repository(&self) -> Option<&Repository<E>> {
        self.repository.as_ref()
    }

    /// Returns true while at least one scope is entered.
    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    /// Events harvested so far.
    pub fn events(&self) -> &[E] {
        &self.events
    }

    fn repository_mut(&mut self) -> Result<&mut Repository<E>> {
        self.repository
            .as_mut()
            .ok_or(BusError::UnitOfWorkNotInitialized)
    }

    /// Enters a scope, opening the storage session if this is the outermost one.
    pub async fn enter(&mut self) -> Result<()> {
        let outermost = self.depth == 0;
        let repository = self.repository_mut()?;
        if outermost {
            repository.open_session().await?;
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves a scope.
    ///
    /// At the outermost level an error triggers a rollback, and the session
    /// is closed whether or not the rollback succeeded.
    pub async fn exit(&mut self, error: Option<&BusError>) -> Result<()> {
        if self.depth == 0 {
            tracing::warn!("unit of work exited without a matching enter");
            return Ok(());
        }
        self.depth -= 1;
        if self.depth > 0 {
            return Ok(());
        }

        let repository = self.repository_mut()?;
        let mut rolled_back = Ok(());
        if let Some(error) = error {
            tracing::warn!(error = %error, "rolling back unit of work");
            metrics::counter!("uow_rollbacks_total").increment(1);
            rolled_back = repository.rollback().await;
            if let Err(rollback_error) = &rolled_back {
                tracing::error!(error = %rollback_error, "rollback failed");
            }
        }

        let closed = repository.close_session().await;
        rolled_back.and(closed).map_err(BusError::from)
    }

    /// Flushes staged writes. A no-op inside a nested scope.
    pub async fn commit(&mut self) -> Result<()> {
        if self.depth > 1 {
            return Ok(());
        }
        self.repository_mut()?.commit().await?;
        metrics::counter!("uow_commits_total").increment(1);
        Ok(())
    }

    /// Drains the pending events of every tracked aggregate, in the order the
    /// aggregates were first tracked, and returns everything harvested so far.
    pub fn collect_new_events(&mut self) -> Result<&[E]> {
        let repository = self
            .repository
            .as_mut()
            .ok_or(BusError::UnitOfWorkNotInitialized)?;

        for aggregate in repository.seen_mut() {
            self.events.extend(aggregate.take_events());
        }
        Ok(&self.events)
    }

    /// Persists a new aggregate and harvests its events.
    pub async fn add(&mut self, aggregate: Aggregate<E>) -> Result<()> {
        self.enter().await?;
        let result = self.add_and_commit(aggregate).await;
        self.leave(result).await
    }

    /// Loads an aggregate; nothing is harvested.
    pub async fn get(&mut self, id: &JobId, fields: &[&str]) -> Result<Option<Aggregate<E>>> {
        self.enter().await?;
        let result = self.load_and_commit(id, fields).await;
        self.leave(result).await
    }

    /// Persists a changed aggregate and harvests its events.
    pub async fn update(&mut self, aggregate: Aggregate<E>) -> Result<()> {
        self.enter().await?;
        let result = self.update_and_commit(aggregate).await;
        self.leave(result).await
    }

    async fn add_and_commit(&mut self, aggregate: Aggregate<E>) -> Result<()> {
        self.repository_mut()?.add(aggregate).await?;
        self.commit().await?;
        self.collect_new_events()?;
        Ok(())
    }

    async fn load_and_commit(
        &mut self,
        id: &JobId,
        fields: &[&str],
    ) -> Result<Option<Aggregate<E>>> {
        let aggregate = self.repository_mut()?.get(id, fields).await?;
        self.commit().await?;
        Ok(aggregate)
    }

    async fn update_and_commit(&mut self, aggregate: Aggregate<E>) -> Result<()> {
        self.repository_mut()?.update(aggregate).await?;
        self.commit().await?;
        self.collect_new_events()?;
        Ok(())
    }

    async fn leave<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.exit(None).await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(exit_error) = self.exit(Some(&error)).await {
                    tracing::error!(error = %exit_error, "failed to release unit of work");
                }
                Err(error)
            }
        }
    }
}

impl<E> Drop for UnitOfWork<E> {
    fn drop(&mut self) {
        if self.depth > 0 {
            tracing::warn!(
                depth = self.depth,
                "unit of work dropped while entered, uncommitted writes are discarded"
            );
        }
    }
}
