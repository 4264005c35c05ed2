//! Playback session endpoints

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use playback_core::PlaybackSession;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::server::AppState;

/// Body of `POST /api/playback/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPlaybackRequest {
    /// Viewer starting playback
    pub user_id: String,
    /// Video being played
    pub video_id: String,
}

/// `POST /api/playback/start`
///
/// # Errors
///
/// - `ApiError::Session` - Invalid user or video id
/// - `ApiError::Body` - Body is not the expected JSON
pub async fn start_session(
    State(state): State<AppState>,
    payload: Result<Json<StartPlaybackRequest>, JsonRejection>,
) -> ApiResult<Json<PlaybackSession>> {
    let Json(request) = payload?;
    let session = state
        .sessions
        .start(&request.user_id, &request.video_id)
        .await?;
    Ok(Json(session))
}

/// `POST /api/playback/heartbeat/{session_id}`
///
/// # Errors
///
/// - `ApiError::Session` - Unknown session
pub async fn heartbeat_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.sessions.heartbeat(&session_id).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/playback/stop/{session_id}`
///
/// # Errors
///
/// - `ApiError::Session` - Unknown session
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.sessions.stop(&session_id).await?;
    Ok(StatusCode::OK)
}

/// `GET /api/playback/{session_id}`
///
/// # Errors
///
/// - `ApiError::Session` - Unknown session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<PlaybackSession>> {
    Ok(Json(state.sessions.get(&session_id).await?))
}
