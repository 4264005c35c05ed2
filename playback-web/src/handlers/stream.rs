//! Video streaming endpoint

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use tracing::{info, warn};

use super::range::{build_stream_response, raw_range_header};
use crate::error::ApiResult;
use crate::server::AppState;

/// `GET /api/stream/{video_id}` with an optional `Range` header.
///
/// # Errors
///
/// Any [`playback_core::StreamError`] raised before the response is
/// committed, mapped to its status by [`crate::ApiError`].
pub async fn stream_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let range_header = raw_range_header(&headers);

    let descriptor = match state.streamer.prepare_raw(&video_id, range_header).await {
        Ok(descriptor) => descriptor,
        Err(e) => {
            if e.is_client_error() {
                warn!(
                    video_id = %video_id,
                    range = ?range_header.map(String::from_utf8_lossy),
                    "Rejected stream request: {}",
                    e
                );
            }
            return Err(e.into());
        }
    };

    info!(
        video_id = %video_id,
        partial = descriptor.is_partial(),
        content_length = descriptor.content_length(),
        "Streaming video"
    );

    Ok(build_stream_response(descriptor, state.content_type))
}
