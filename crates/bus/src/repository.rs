//! Domain repository: store access plus tracking of touched aggregates.

use common::JobId;
use store::{Result, Store};

use crate::aggregate::Aggregate;
use crate::message::Event;

/// Owns one store handle and the aggregates added or updated through it.
///
/// The `seen` set is what a [`UnitOfWork`](crate::UnitOfWork) drains when it
/// harvests events. It keeps insertion order and holds at most one entry per
/// `external_job_id`.
pub struct Repository<E> {
    store: Box<dyn Store>,
    seen: Vec<Aggregate<E>>,
}

impl<E: Event> Repository<E> {
    /// Creates a repository over the given store handle.
    pub fn new(store: Box<dyn Store>) -> Self {
        Self {
            store,
            seen: Vec::new(),
        }
    }

    /// Acquires the store session.
    pub async fn open_session(&mut self) -> Result<()> {
        self.store.open_session().await
    }

    /// Releases the store session.
    pub async fn close_session(&mut self) -> Result<()> {
        self.store.close_session().await
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.store.commit().await
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.store.rollback().await
    }

    /// Stages a new aggregate and starts tracking it.
    pub async fn add(&mut self, aggregate: Aggregate<E>) -> Result<()> {
        self.store.insert(aggregate.to_record()).await?;
        self.track(aggregate);
        Ok(())
    }

    /// Loads an aggregate. Loading does not track it.
    pub async fn get(&self, id: &JobId, fields: &[&str]) -> Result<Option<Aggregate<E>>> {
        Ok(self
            .store
            .fetch(id, fields)
            .await?
            .map(Aggregate::from_record))
    }

    /// Stages a new version of an aggregate and starts tracking it.
    pub async fn update(&mut self, aggregate: Aggregate<E>) -> Result<()> {
        self.store.save(aggregate.to_record()).await?;
        self.track(aggregate);
        Ok(())
    }

    /// Aggregates touched through this repository, in first-seen order.
    pub fn seen(&self) -> &[Aggregate<E>] {
        &self.seen
    }

    pub(crate) fn seen_mut(&mut self) -> &mut [Aggregate<E>] {
        &mut self.seen
    }

    // A re-tracked aggregate keeps its slot; events not yet harvested from
    // the previous entry stay ahead of the new ones.
    fn track(&mut self, mut aggregate: Aggregate<E>) {
        let existing = self
            .seen
            .iter_mut()
            .find(|seen| seen.external_job_id() == aggregate.external_job_id());

        match existing {
            Some(existing) => {
                let later = aggregate.take_events();
                for event in existing.take_events().into_iter().chain(later) {
                    aggregate.record(event);
                }
                *existing = aggregate;
            }
            None => self.seen.push(aggregate),
        }
    }
}
