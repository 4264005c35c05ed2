//! Axum server wiring for the playback API
//!
//! Builds shared application state from configuration, mounts the
//! streaming, session and progress routes, and runs the listener until
//! Ctrl+C.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use playback_core::{PlaybackConfig, ProgressTracker, RangeStreamer, SessionTracker};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::handlers::{
    get_progress, get_session, health, heartbeat_session, list_videos, start_session,
    stop_session, stream_video, update_progress,
};

/// State shared by all handlers.
///
/// The streamer is read-only; the trackers guard their own storage.
#[derive(Clone)]
pub struct AppState {
    /// Range-aware file streamer
    pub streamer: Arc<RangeStreamer>,
    /// Playback session tracker
    pub sessions: SessionTracker,
    /// Watch-progress tracker
    pub progress: ProgressTracker,
    /// Media type sent with every stream
    pub content_type: &'static str,
}

impl AppState {
    /// State with in-memory trackers around `streamer`.
    pub fn new(streamer: RangeStreamer) -> Self {
        Self {
            streamer: Arc::new(streamer),
            sessions: SessionTracker::in_memory(),
            progress: ProgressTracker::in_memory(),
            content_type: playback_core::streaming::VIDEO_CONTENT_TYPE,
        }
    }

    /// Builds state from configuration.
    ///
    /// # Errors
    ///
    /// - `StreamError::Io` - Storage root cannot be made absolute
    pub fn from_config(config: &PlaybackConfig) -> Result<Self, playback_core::StreamError> {
        let streamer = RangeStreamer::from_config(&config.storage)?;
        Ok(Self {
            content_type: config.storage.content_type,
            ..Self::new(streamer)
        })
    }
}

/// Mount every API route on a router bound to `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Streaming
        .route("/api/videos", get(list_videos))
        .route("/api/stream/{video_id}", get(stream_video))
        // Playback sessions
        .route("/api/playback/start", post(start_session))
        .route("/api/playback/heartbeat/{session_id}", post(heartbeat_session))
        .route("/api/playback/stop/{session_id}", post(stop_session))
        .route("/api/playback/{session_id}", get(get_session))
        // Watch progress
        .route("/api/progress/update", post(update_progress))
        .route("/api/progress/{user_id}/{video_id}", get(get_progress))
        .route("/api/health", get(health))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

/// Serve `state` on an already bound listener until `shutdown` resolves.
///
/// # Errors
///
/// - `std::io::Error` - Accept loop failed
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Bind to the configured address and serve until Ctrl+C.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - Storage root or listener setup failed
pub async fn run_server(config: PlaybackConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(&config)?;
    let bind_address = config.server.bind_address();

    info!(
        "Serving videos from {}",
        state.streamer.storage_root().path().display()
    );
    if !state.streamer.storage_root().path().is_dir() {
        tracing::warn!("Storage directory does not exist yet; every stream will be 404");
    }

    let listener = TcpListener::bind(&bind_address).await?;
    info!("Playback server running on http://{}", listener.local_addr()?);

    serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use playback_core::streaming::test_fixtures::{VideoLibraryFixture, patterned_bytes};
    use tower::ServiceExt;

    use super::*;

    fn app(fixture: &VideoLibraryFixture) -> Router {
        build_router(AppState::new(fixture.streamer()))
    }

    #[tokio::test]
    async fn test_stream_route_serves_range() {
        let fixture = VideoLibraryFixture::new();
        let data = patterned_bytes(1000);
        fixture.write_video("movie123", &data);

        let response = app(&fixture)
            .oneshot(
                Request::get("/api/stream/movie123")
                    .header(header::RANGE, "bytes=100-199")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        assert_eq!(body, &data[100..200]);
    }

    #[tokio::test]
    async fn test_encoded_traversal_in_path_is_rejected() {
        let fixture = VideoLibraryFixture::new();

        let response = app(&fixture)
            .oneshot(
                Request::get("/api/stream/..%2F..%2Fetc%2Fpasswd")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("INVALID_IDENTIFIER"));
        assert!(!text.contains(fixture.root().to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_health() {
        let fixture = VideoLibraryFixture::new();
        let response = app(&fixture)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
