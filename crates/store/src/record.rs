use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{JobId, Result};

/// Persisted state of one aggregate.
///
/// Only business data is stored. Pending domain events live on the in-memory
/// aggregate and are never written through a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Correlation key of the aggregate.
    pub external_job_id: JobId,

    /// Opaque business fields.
    pub data: Map<String, Value>,

    /// Incremented on every stored write; 0 until the record is first stored.
    pub version: u64,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl AggregateRecord {
    /// Creates an unversioned record.
    pub fn new(external_job_id: JobId, data: Map<String, Value>) -> Self {
        Self {
            external_job_id,
            data,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Reads a business field, deserializing it into `T`.
    ///
    /// Returns `Ok(None)` when the field is absent.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.data.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Keeps only the named fields. An empty selection keeps everything.
    pub fn project(mut self, fields: &[&str]) -> Self {
        if !fields.is_empty() {
            self.data.retain(|key, _| fields.contains(&key.as_str()));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> AggregateRecord {
        let mut data = Map::new();
        data.insert("status".to_string(), json!("created"));
        data.insert("pages".to_string(), json!(3));
        AggregateRecord::new(JobId::new("job-1"), data)
    }

    #[test]
    fn test_new_record_is_unversioned() {
        assert_eq!(record().version, 0);
    }

    #[test]
    fn test_field_reads_typed_values() {
        let record = record();
        assert_eq!(
            record.field::<String>("status").unwrap().as_deref(),
            Some("created")
        );
        assert_eq!(record.field::<u32>("pages").unwrap(), Some(3));
        assert_eq!(record.field::<u32>("missing").unwrap(), None);
        assert!(record.field::<u32>("status").is_err());
    }

    #[test]
    fn test_project_keeps_selected_fields() {
        let projected = record().project(&["pages"]);
        assert_eq!(projected.data.len(), 1);
        assert!(projected.data.contains_key("pages"));

        let untouched = record().project(&[]);
        assert_eq!(untouched.data.len(), 2);
    }
}
