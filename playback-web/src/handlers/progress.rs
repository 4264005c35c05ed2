//! Watch-progress endpoints

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use playback_core::WatchProgress;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::server::AppState;

/// Body of `POST /api/progress/update`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateRequest {
    /// Viewer reporting progress
    pub user_id: String,
    /// Video being watched
    pub video_id: String,
    /// Seconds watched so far
    pub watched_seconds: u64,
    /// Total duration in seconds, at least 1
    pub total_seconds: u64,
}

/// `POST /api/progress/update`
///
/// # Errors
///
/// - `ApiError::Progress` - Invalid ids or zero total
/// - `ApiError::Body` - Body is not the expected JSON
pub async fn update_progress(
    State(state): State<AppState>,
    payload: Result<Json<ProgressUpdateRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload?;
    state
        .progress
        .update(
            &request.user_id,
            &request.video_id,
            request.watched_seconds,
            request.total_seconds,
        )
        .await?;
    Ok(StatusCode::OK)
}

/// `GET /api/progress/{user_id}/{video_id}`
///
/// # Errors
///
/// - `ApiError::Progress` - Nothing recorded for this pair
pub async fn get_progress(
    State(state): State<AppState>,
    Path((user_id, video_id)): Path<(String, String)>,
) -> ApiResult<Json<WatchProgress>> {
    Ok(Json(state.progress.get(&user_id, &video_id).await?))
}
