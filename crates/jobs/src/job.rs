//! Job state as stored in the aggregate's data fields.

use std::fmt;

use chrono::{DateTime, Utc};
use common::JobId;
use serde::{Deserialize, Serialize};
use store::AggregateRecord;

use crate::analyzer::Analysis;
use crate::error::{JobError, Result};

pub const STATUS: &str = "status";
pub const DOCUMENT: &str = "document";
pub const SUMMARY: &str = "summary";
pub const ERROR: &str = "error";

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Analyzed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Analyzed => "analyzed",
            JobStatus::Failed => "failed",
        }
    }

    /// Returns true if no further step will run for this job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Analyzed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read model of a stored job.
///
/// The document itself is not included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub external_job_id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl JobView {
    /// Fields a lookup needs to fetch.
    pub const FIELDS: [&'static str; 3] = [STATUS, SUMMARY, ERROR];

    /// Builds the view from a stored record.
    pub fn from_record(record: &AggregateRecord) -> Result<Self> {
        let status = record
            .field::<JobStatus>(STATUS)?
            .ok_or_else(|| JobError::MissingField {
                id: record.external_job_id.clone(),
                field: STATUS,
            })?;

        Ok(Self {
            external_job_id: record.external_job_id.clone(),
            status,
            summary: record.field(SUMMARY)?,
            error: record.field(ERROR)?,
            version: record.version,
            updated_at: record.updated_at,
        })
    }
}
