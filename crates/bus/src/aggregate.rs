//! Aggregates and their pending-event buffer.

use common::JobId;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use store::{AggregateRecord, StoreError};

/// Ordered, append-only buffer of events an aggregate has caused but not yet
/// emitted.
#[derive(Debug, Clone)]
pub struct EventBuffer<E> {
    pending: Vec<E>,
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<E> EventBuffer<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&mut self, event: E) {
        self.pending.push(event);
    }

    /// Takes every pending event in recording order, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn as_slice(&self) -> &[E] {
        &self.pending
    }
}

/// The unit of business state tracked by a repository.
///
/// Business fields live in an opaque JSON object. Mutations record events in
/// the aggregate's [`EventBuffer`]; a unit of work later drains them with
/// [`Aggregate::take_events`] and feeds them back to the bus.
#[derive(Debug, Clone)]
pub struct Aggregate<E> {
    external_job_id: JobId,
    data: Map<String, Value>,
    version: u64,
    events: EventBuffer<E>,
}

impl<E> Aggregate<E> {
    /// Creates an empty aggregate.
    pub fn new(external_job_id: JobId) -> Self {
        Self::with_data(external_job_id, Map::new())
    }

    /// Creates an aggregate with initial business fields.
    pub fn with_data(external_job_id: JobId, data: Map<String, Value>) -> Self {
        Self {
            external_job_id,
            data,
            version: 0,
            events: EventBuffer::new(),
        }
    }

    /// Rebuilds an aggregate from its stored form. The event buffer starts empty.
    pub fn from_record(record: AggregateRecord) -> Self {
        Self {
            external_job_id: record.external_job_id,
            data: record.data,
            version: record.version,
            events: EventBuffer::new(),
        }
    }

    /// Returns the stored form of the aggregate (without pending events).
    pub fn to_record(&self) -> AggregateRecord {
        let mut record = AggregateRecord::new(self.external_job_id.clone(), self.data.clone());
        record.version = self.version;
        record
    }

    pub fn external_job_id(&self) -> &JobId {
        &self.external_job_id
    }

    /// Returns the stored version this aggregate was loaded at; 0 if new.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    /// Returns a raw business field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Reads a business field, deserializing it into `T`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.data.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Sets a business field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Records an event caused by this aggregate.
    pub fn record(&mut self, event: E) {
        self.events.push(event);
    }

    pub fn pending_events(&self) -> &[E] {
        self.events.as_slice()
    }

    /// Drains the pending events.
    ///
    /// Each event is returned exactly once. Takes `&mut self`, so the buffer
    /// cannot be drained while the aggregate is being mutated elsewhere.
    pub fn take_events(&mut self) -> Vec<E> {
        self.events.take()
    }
}
