//! Job handlers.

use crate::api::AppState;
use crate::error::ApiError;
use crate::types::{ChatRef, JobId, JobInfo, MessageRef};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /jobs - Jobs that have not delivered their terminal notification yet
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobInfo>> {
    Json(state.orchestrator.active_jobs().await)
}

/// GET /jobs/:chat/:message - One active job, keyed by its triggering message
pub async fn get_job(
    State(state): State<AppState>,
    Path((chat, message)): Path<(i64, i64)>,
) -> Response {
    let id = JobId::new(ChatRef(chat), MessageRef(message));
    match state.orchestrator.job_info(id).await {
        Some(info) => (StatusCode::OK, Json(info)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("job {id}"))),
        )
            .into_response(),
    }
}
