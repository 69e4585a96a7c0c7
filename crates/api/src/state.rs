//! Shared application state and the submission flow both entry points use.

use std::sync::Arc;

use bus::{Command, Message, ReadOnlyStore};
use common::JobId;
use jobs::{JobBus, JobView};
use serde_json::Value;

use crate::config::Config;
use crate::error::ApiError;
use crate::request::{SubmitJobRequest, SubmitJobResponse};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub bus: JobBus,
    pub jobs: Arc<dyn ReadOnlyStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(bus: JobBus, jobs: Arc<dyn ReadOnlyStore>, config: Config) -> Self {
        Self { bus, jobs, config }
    }

    /// Validates a raw submission and runs the chain it starts.
    #[tracing::instrument(skip_all)]
    pub async fn submit(&self, payload: Value) -> Result<SubmitJobResponse, ApiError> {
        let request = match SubmitJobRequest::parse(payload, self.config.max_document_chars) {
            Ok(request) => request,
            Err(err) => {
                metrics::counter!("api_submissions_rejected_total").increment(1);
                return Err(err);
            }
        };

        let command = request.into_command();
        let external_job_id = command.external_job_id().clone();
        tracing::info!(%external_job_id, "job submitted");

        self.bus.handle(Message::Command(command)).await?;
        Ok(SubmitJobResponse { external_job_id })
    }

    /// Looks up the stored state of a job.
    pub async fn job(&self, id: &JobId) -> Result<JobView, ApiError> {
        let record = self
            .jobs
            .fetch(id, &JobView::FIELDS)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Job not found: {id}")))?;
        Ok(JobView::from_record(&record)?)
    }
}
