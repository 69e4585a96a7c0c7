//! Serverless function entry point.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

/// Result of one function invocation, shaped like an HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: Value,
}

/// Handles one invocation event.
///
/// The event is either the submission itself or a gateway envelope whose
/// `body` field holds the submission as a JSON string.
#[tracing::instrument(skip_all)]
pub async fn invoke(state: &AppState, event: Value) -> InvocationResponse {
    let result = match unwrap_envelope(event) {
        Ok(payload) => state.submit(payload).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(accepted) => InvocationResponse {
            status_code: 200,
            body: json!({ "external_job_id": accepted.external_job_id }),
        },
        Err(err) => {
            if err.status().is_server_error() {
                tracing::error!(error = %err, "invocation failed");
            }
            InvocationResponse {
                status_code: err.status().as_u16(),
                body: err.body(),
            }
        }
    }
}

fn unwrap_envelope(event: Value) -> Result<Value, ApiError> {
    match event.get("body") {
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|e| ApiError::Validation(vec![format!("body is not valid JSON: {e}")])),
        _ => Ok(event),
    }
}
