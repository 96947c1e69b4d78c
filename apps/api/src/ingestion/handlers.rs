use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::ingestion::models::JobPosting;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractJobRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// POST /extract-job
pub async fn handle_extract_job(
    State(state): State<AppState>,
    payload: Result<Json<ExtractJobRequest>, JsonRejection>,
) -> Result<Json<JobPosting>, AppError> {
    let Json(req) = payload.map_err(|rejection| {
        debug!("Rejected extract-job body: {rejection}");
        AppError::Validation("Request body must be JSON of the form {\"url\": \"...\"}".to_string())
    })?;

    let url = req
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("URL is required".to_string()))?;

    let posting = state.pipeline.extract(url).await?;
    Ok(Json(posting))
}
