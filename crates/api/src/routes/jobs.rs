//! Job submission and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::JobId;
use jobs::JobView;
use serde_json::Value;

use crate::error::ApiError;
use crate::request::SubmitJobResponse;
use crate::state::AppState;

/// POST /jobs: submit a document for processing.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SubmitJobResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(vec![e.body_text()]))?;
    let response = state.submit(payload).await?;
    Ok(Json(response))
}

/// GET /jobs/{id}: read a job's current state.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    let view = state.job(&JobId::new(id)).await?;
    Ok(Json(view))
}
