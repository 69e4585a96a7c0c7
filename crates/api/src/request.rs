//! Job submission schema.

use common::JobId;
use jobs::{CreateJob, JobCommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 100_000;
pub const MAX_EXTERNAL_JOB_ID_LEN: usize = 128;

const FIELDS: [&str; 2] = ["document", "external_job_id"];

/// A validated job submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub external_job_id: Option<String>,
    pub document: String,
}

/// Response to an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub external_job_id: JobId,
}

/// Checks a raw payload against the submission schema.
///
/// Returns every problem found; an empty list means the payload is valid.
pub fn validate(payload: &Value, max_document_chars: usize) -> Vec<String> {
    let Some(fields) = payload.as_object() else {
        return vec!["request body must be a JSON object".to_string()];
    };

    let mut errors: Vec<String> = fields
        .keys()
        .filter(|key| !FIELDS.contains(&key.as_str()))
        .map(|key| format!("unknown field '{key}'"))
        .collect();

    match fields.get("document") {
        None | Some(Value::Null) => errors.push("document is required".to_string()),
        Some(Value::String(document)) => {
            if document.trim().is_empty() {
                errors.push("document must not be empty".to_string());
            } else if document.chars().count() > max_document_chars {
                errors.push(format!(
                    "document must be at most {max_document_chars} characters"
                ));
            }
        }
        Some(_) => errors.push("document must be a string".to_string()),
    }

    match fields.get("external_job_id") {
        None | Some(Value::Null) => {}
        Some(Value::String(id)) => {
            if id.is_empty() || id.len() > MAX_EXTERNAL_JOB_ID_LEN {
                errors.push(format!(
                    "external_job_id must be between 1 and {MAX_EXTERNAL_JOB_ID_LEN} characters"
                ));
            } else if !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                errors.push(
                    "external_job_id may only contain letters, digits, '-' and '_'".to_string(),
                );
            }
        }
        Some(_) => errors.push("external_job_id must be a string".to_string()),
    }

    errors
}

impl SubmitJobRequest {
    /// Validates and decodes a raw payload.
    pub fn parse(payload: Value, max_document_chars: usize) -> Result<Self, ApiError> {
        let errors = validate(&payload, max_document_chars);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        serde_json::from_value(payload).map_err(|e| ApiError::Validation(vec![e.to_string()]))
    }

    /// Builds the command that starts the chain, generating an id if none was given.
    pub fn into_command(self) -> JobCommand {
        let external_job_id = self
            .external_job_id
            .map(JobId::new)
            .unwrap_or_else(JobId::generate);
        CreateJob::new(external_job_id, self.document).into()
    }
}
