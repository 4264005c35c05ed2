//! Shared helpers for the integration suite

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use playback_core::streaming::test_fixtures::{VideoLibraryFixture, patterned_bytes};
use playback_web::{AppState, build_router};
use tower::ServiceExt;

/// Size of the reference video used by most scenarios.
pub const MOVIE_LEN: usize = 1000;

/// Library holding `movie123.mp4` with [`MOVIE_LEN`] patterned bytes.
pub fn movie_library() -> (VideoLibraryFixture, Vec<u8>) {
    let fixture = VideoLibraryFixture::new();
    let data = patterned_bytes(MOVIE_LEN);
    fixture.write_video("movie123", &data);
    (fixture, data)
}

pub fn router(fixture: &VideoLibraryFixture) -> Router {
    build_router(AppState::new(fixture.streamer()))
}

/// Issues one request against a fresh router.
pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

/// `GET` with an optional `Range` header.
pub fn get(uri: &str, range: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    builder.body(Body::empty()).unwrap()
}

/// `POST` with a JSON body.
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header_str<'a>(response: &'a Response<Body>, name: header::HeaderName) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}
