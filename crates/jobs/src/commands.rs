//! Job commands.

use bus::{Command, MessageKind};
use common::JobId;
use serde::{Deserialize, Serialize};

/// Routing tags of [`JobCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobCommandKind {
    CreateJob,
    AnalyzeJob,
}

impl MessageKind for JobCommandKind {
    fn all() -> &'static [Self] {
        &[JobCommandKind::CreateJob, JobCommandKind::AnalyzeJob]
    }

    fn name(self) -> &'static str {
        match self {
            JobCommandKind::CreateJob => "CreateJob",
            JobCommandKind::AnalyzeJob => "AnalyzeJob",
        }
    }
}

/// Commands accepted by the job pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum JobCommand {
    /// Submit a new document for processing.
    CreateJob(CreateJob),

    /// Run the analyzer over a stored job.
    AnalyzeJob(AnalyzeJob),
}

impl Command for JobCommand {
    type Kind = JobCommandKind;

    fn kind(&self) -> JobCommandKind {
        match self {
            JobCommand::CreateJob(_) => JobCommandKind::CreateJob,
            JobCommand::AnalyzeJob(_) => JobCommandKind::AnalyzeJob,
        }
    }

    fn external_job_id(&self) -> &JobId {
        match self {
            JobCommand::CreateJob(cmd) => &cmd.external_job_id,
            JobCommand::AnalyzeJob(cmd) => &cmd.external_job_id,
        }
    }
}

/// Command to create a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Correlation id of the job, chosen by the caller.
    pub external_job_id: JobId,

    /// The document to analyze.
    pub document: String,
}

impl CreateJob {
    pub fn new(external_job_id: impl Into<JobId>, document: impl Into<String>) -> Self {
        Self {
            external_job_id: external_job_id.into(),
            document: document.into(),
        }
    }
}

impl From<CreateJob> for JobCommand {
    fn from(cmd: CreateJob) -> Self {
        JobCommand::CreateJob(cmd)
    }
}

/// Command to analyze a stored job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeJob {
    pub external_job_id: JobId,
}

impl AnalyzeJob {
    pub fn new(external_job_id: impl Into<JobId>) -> Self {
        Self {
            external_job_id: external_job_id.into(),
        }
    }
}

impl From<AnalyzeJob> for JobCommand {
    fn from(cmd: AnalyzeJob) -> Self {
        JobCommand::AnalyzeJob(cmd)
    }
}
