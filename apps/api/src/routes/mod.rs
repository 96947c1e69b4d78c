pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ingestion::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/extract-job", post(handlers::handle_extract_job))
        .with_state(state)
}
