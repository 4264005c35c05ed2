//! HTTP request handlers organized by functionality

pub mod playback;
pub mod progress;
pub mod range;
pub mod stream;
pub mod videos;

use axum::Json;

// Re-export handler functions
pub use playback::{
    StartPlaybackRequest, get_session, heartbeat_session, start_session, stop_session,
};
pub use progress::{ProgressUpdateRequest, get_progress, update_progress};
pub use range::{build_stream_response, raw_range_header};
pub use stream::stream_video;
pub use videos::list_videos;

/// `GET /api/health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
