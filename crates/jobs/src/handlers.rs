//! Handler logic for the job pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use bus::{Aggregate, HandlerContext, HandlerLogic};

use crate::analyzer::Analyzer;
use crate::commands::{AnalyzeJob, JobCommand};
use crate::error::JobError;
use crate::events::JobEvent;
use crate::job::{DOCUMENT, ERROR, JobStatus, STATUS, SUMMARY};
use crate::wiring::JobMessage;

type JobContext<'a> = HandlerContext<'a, JobCommand, JobEvent>;

/// Stores a new job and records `JobCreated`.
pub struct CreateJobHandler;

#[async_trait]
impl HandlerLogic<JobCommand, JobEvent> for CreateJobHandler {
    async fn run(&self, message: &JobMessage, ctx: &mut JobContext<'_>) -> anyhow::Result<()> {
        let Some(JobCommand::CreateJob(cmd)) = message.as_command() else {
            return Err(JobError::UnexpectedMessage(message.name()).into());
        };
        let uow = ctx.unit_of_work()?;

        if uow.get(&cmd.external_job_id, &[STATUS]).await?.is_some() {
            return Err(JobError::AlreadyExists(cmd.external_job_id.clone()).into());
        }

        let mut job = Aggregate::new(cmd.external_job_id.clone());
        job.set(STATUS, JobStatus::Created.as_str());
        job.set(DOCUMENT, cmd.document.as_str());
        job.record(JobEvent::job_created(cmd.external_job_id.clone()));
        uow.add(job).await?;

        metrics::counter!("jobs_created_total").increment(1);
        tracing::info!(external_job_id = %cmd.external_job_id, "job created");
        Ok(())
    }
}

/// Requests analysis once a job exists.
pub struct RequestAnalysisHandler;

#[async_trait]
impl HandlerLogic<JobCommand, JobEvent> for RequestAnalysisHandler {
    async fn run(&self, message: &JobMessage, ctx: &mut JobContext<'_>) -> anyhow::Result<()> {
        let Some(JobEvent::JobCreated(data)) = message.as_event() else {
            return Err(JobError::UnexpectedMessage(message.name()).into());
        };
        ctx.emit_command(AnalyzeJob::new(data.external_job_id.clone()).into());
        Ok(())
    }
}

/// Runs the analyzer and records the outcome.
pub struct AnalyzeJobHandler {
    analyzer: Arc<dyn Analyzer>,
}

impl AnalyzeJobHandler {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl HandlerLogic<JobCommand, JobEvent> for AnalyzeJobHandler {
    async fn run(&self, message: &JobMessage, ctx: &mut JobContext<'_>) -> anyhow::Result<()> {
        let Some(JobCommand::AnalyzeJob(cmd)) = message.as_command() else {
            return Err(JobError::UnexpectedMessage(message.name()).into());
        };
        let id = &cmd.external_job_id;
        let uow = ctx.unit_of_work()?;

        let mut job = uow
            .get(id, &[])
            .await?
            .ok_or_else(|| JobError::NotFound(id.clone()))?;
        let document: String = job.field(DOCUMENT)?.ok_or_else(|| JobError::MissingField {
            id: id.clone(),
            field: DOCUMENT,
        })?;

        match self.analyzer.analyze(id, &document).await {
            Ok(analysis) => {
                job.set(STATUS, JobStatus::Analyzed.as_str());
                job.set(SUMMARY, serde_json::to_value(&analysis)?);
                job.record(JobEvent::job_analyzed(id.clone(), analysis));
                metrics::counter!("jobs_analyzed_total").increment(1);
            }
            Err(error) => {
                tracing::warn!(external_job_id = %id, error = %error, "analysis failed");
                job.set(STATUS, JobStatus::Failed.as_str());
                job.set(ERROR, error.to_string());
                job.record(JobEvent::job_failed(id.clone(), error.to_string()));
                metrics::counter!("jobs_failed_total").increment(1);
            }
        }

        uow.update(job).await?;
        Ok(())
    }
}
