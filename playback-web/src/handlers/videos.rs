//! Video listing endpoint

use axum::Json;
use axum::extract::State;
use playback_core::VideoEntry;

use crate::error::ApiResult;
use crate::server::AppState;

/// `GET /api/videos`
///
/// # Errors
///
/// - `ApiError::Stream` - Storage directory could not be read
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<Vec<VideoEntry>>> {
    Ok(Json(state.streamer.list_videos().await?))
}
