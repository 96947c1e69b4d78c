use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::ingestion::fetcher::FetchError;

const MANUAL_PASTE_SUGGESTION: &str =
    "Copy the job description from the posting and paste it in manually.";

/// Whether 500 responses echo internal error details. Set once at startup.
static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

pub fn set_expose_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Not found")]
    NotFound,

    #[error("Unextractable content")]
    Unextractable,

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::RedirectRejected(reason) => AppError::Validation(reason),
            FetchError::AuthenticationRequired => AppError::AuthenticationRequired,
            FetchError::NotFound => AppError::NotFound,
            other => AppError::Fetch(other.to_string()),
        }
    }
}

impl AppError {
    /// Status and JSON body. `details` only appears on 500s, and only when `expose_details`.
    fn parts(&self, expose_details: bool) -> (StatusCode, Value) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::AuthenticationRequired => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "This job posting requires authentication to view.",
                    "suggestion": MANUAL_PASTE_SUGGESTION,
                }),
            ),
            AppError::NotFound => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Job posting not found. It may have been removed or the link is incorrect.",
                    "suggestion": "Check the link, or paste the job description in manually.",
                }),
            ),
            AppError::Unextractable => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Could not extract job content from this page.",
                    "suggestion": MANUAL_PASTE_SUGGESTION,
                }),
            ),
            AppError::Fetch(detail) => {
                tracing::error!("Fetch error: {detail}");
                server_error("Failed to fetch the job posting.", detail, expose_details)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                server_error("An internal server error occurred.", &e.to_string(), expose_details)
            }
        }
    }
}

fn server_error(message: &str, detail: &str, expose_details: bool) -> (StatusCode, Value) {
    let body = if expose_details {
        json!({ "error": message, "details": detail })
    } else {
        json!({ "error": message })
    };
    (StatusCode::INTERNAL_SERVER_ERROR, body)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts(EXPOSE_DETAILS.load(Ordering::Relaxed));
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_400_without_suggestion() {
        let (status, body) = AppError::Validation("URL is required".into()).parts(false);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "URL is required");
        assert!(body.get("suggestion").is_none());
    }

    #[test]
    fn test_auth_required_suggests_manual_paste() {
        let (status, body) = AppError::from(FetchError::AuthenticationRequired).parts(false);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("authentication"));
        assert!(body["suggestion"].as_str().unwrap().contains("paste"));
    }

    #[test]
    fn test_fetch_taxonomy() {
        assert!(matches!(
            AppError::from(FetchError::RedirectRejected("nope".into())),
            AppError::Validation(reason) if reason == "nope"
        ));
        assert!(matches!(AppError::from(FetchError::NotFound), AppError::NotFound));
        assert!(matches!(AppError::from(FetchError::Timeout), AppError::Fetch(_)));
        assert!(matches!(
            AppError::from(FetchError::TooManyRedirects(5)),
            AppError::Fetch(_)
        ));
    }

    #[test]
    fn test_details_only_when_exposed() {
        let err = AppError::Fetch("connection reset".into());
        let (status, hidden) = err.parts(false);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(hidden.get("details").is_none());

        let (_, shown) = err.parts(true);
        assert_eq!(shown["details"], "connection reset");
    }
}
