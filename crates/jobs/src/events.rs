//! Job events.

use bus::{Event, MessageKind};
use chrono::{DateTime, Utc};
use common::JobId;
use serde::{Deserialize, Serialize};

use crate::analyzer::Analysis;

/// Routing tags of [`JobEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobEventKind {
    JobCreated,
    JobAnalyzed,
    JobFailed,
}

impl MessageKind for JobEventKind {
    fn all() -> &'static [Self] {
        &[
            JobEventKind::JobCreated,
            JobEventKind::JobAnalyzed,
            JobEventKind::JobFailed,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            JobEventKind::JobCreated => "JobCreated",
            JobEventKind::JobAnalyzed => "JobAnalyzed",
            JobEventKind::JobFailed => "JobFailed",
        }
    }
}

/// Events recorded on a job aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum JobEvent {
    /// Job was stored and awaits analysis.
    JobCreated(JobCreatedData),

    /// Analysis succeeded.
    JobAnalyzed(JobAnalyzedData),

    /// Analysis failed; the job is stored with the error.
    JobFailed(JobFailedData),
}

impl Event for JobEvent {
    type Kind = JobEventKind;

    fn kind(&self) -> JobEventKind {
        match self {
            JobEvent::JobCreated(_) => JobEventKind::JobCreated,
            JobEvent::JobAnalyzed(_) => JobEventKind::JobAnalyzed,
            JobEvent::JobFailed(_) => JobEventKind::JobFailed,
        }
    }

    fn external_job_id(&self) -> &JobId {
        match self {
            JobEvent::JobCreated(data) => &data.external_job_id,
            JobEvent::JobAnalyzed(data) => &data.external_job_id,
            JobEvent::JobFailed(data) => &data.external_job_id,
        }
    }

    fn error(&self) -> Option<&str> {
        match self {
            JobEvent::JobFailed(data) => Some(&data.error),
            _ => None,
        }
    }
}

impl JobEvent {
    pub fn job_created(external_job_id: JobId) -> Self {
        JobEvent::JobCreated(JobCreatedData {
            external_job_id,
            created_at: Utc::now(),
        })
    }

    pub fn job_analyzed(external_job_id: JobId, summary: Analysis) -> Self {
        JobEvent::JobAnalyzed(JobAnalyzedData {
            external_job_id,
            summary,
        })
    }

    pub fn job_failed(external_job_id: JobId, error: impl Into<String>) -> Self {
        JobEvent::JobFailed(JobFailedData {
            external_job_id,
            error: error.into(),
        })
    }
}

/// Data for JobCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCreatedData {
    pub external_job_id: JobId,

    /// When the job was stored.
    pub created_at: DateTime<Utc>,
}

/// Data for JobAnalyzed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalyzedData {
    pub external_job_id: JobId,

    /// What the analyzer reported.
    pub summary: Analysis,
}

/// Data for JobFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailedData {
    pub external_job_id: JobId,

    /// Why analysis failed.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_failed_events_carry_errors() {
        let failed = JobEvent::job_failed(JobId::new("job-1"), "analyzer offline");
        assert!(failed.is_failure());
        assert_eq!(failed.error(), Some("analyzer offline"));
        assert_eq!(failed.context(), "JobFailed:job-1");

        let created = JobEvent::job_created(JobId::new("job-1"));
        assert!(!created.is_failure());
    }
}
