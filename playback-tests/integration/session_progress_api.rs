//! Session and watch-progress endpoints through the router

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use playback_core::streaming::test_fixtures::VideoLibraryFixture;
use playback_web::{AppState, build_router};
use serde_json::json;

use crate::common::{body_json, get, post_empty, post_json, send};

/// Router whose trackers persist across requests.
fn shared_app() -> (VideoLibraryFixture, Router) {
    let fixture = VideoLibraryFixture::new();
    let app = build_router(AppState::new(fixture.streamer()));
    (fixture, app)
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (_fixture, app) = shared_app();

    let response = send(
        app.clone(),
        post_json(
            "/api/playback/start",
            json!({ "userId": "alice", "videoId": "movie123" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let started = body_json(response).await;
    assert_eq!(started["active"], true);
    assert_eq!(started["videoId"], "movie123");
    let session_id = started["sessionId"].as_str().unwrap().to_string();

    let response = send(
        app.clone(),
        post_empty(&format!("/api/playback/heartbeat/{session_id}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        app.clone(),
        post_empty(&format!("/api/playback/stop/{session_id}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(app, get(&format!("/api/playback/{session_id}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stopped = body_json(response).await;
    assert_eq!(stopped["active"], false);
    assert_eq!(stopped["startedAt"], started["startedAt"]);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (_fixture, app) = shared_app();

    for request in [
        post_empty("/api/playback/heartbeat/does-not-exist"),
        post_empty("/api/playback/stop/does-not-exist"),
        get("/api/playback/does-not-exist", None),
    ] {
        let response = send(app.clone(), request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "SESSION_NOT_FOUND");
    }
}

#[tokio::test]
async fn test_session_rejects_bad_identifiers() {
    let (_fixture, app) = shared_app();

    let response = send(
        app,
        post_json(
            "/api/playback/start",
            json!({ "userId": "alice", "videoId": "../secret" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_progress_upsert_and_completion() {
    let (_fixture, app) = shared_app();

    let response = send(
        app.clone(),
        post_json(
            "/api/progress/update",
            json!({
                "userId": "alice",
                "videoId": "movie123",
                "watchedSeconds": 30,
                "totalSeconds": 120
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(app.clone(), get("/api/progress/alice/movie123", None)).await;
    let progress = body_json(response).await;
    assert_eq!(progress["watchedSeconds"], 30);
    assert_eq!(progress["completed"], false);

    send(
        app.clone(),
        post_json(
            "/api/progress/update",
            json!({
                "userId": "alice",
                "videoId": "movie123",
                "watchedSeconds": 120,
                "totalSeconds": 120
            }),
        ),
    )
    .await;

    let response = send(app, get("/api/progress/alice/movie123", None)).await;
    let progress = body_json(response).await;
    assert_eq!(progress["watchedSeconds"], 120);
    assert_eq!(progress["completed"], true);
}

#[tokio::test]
async fn test_progress_validation_and_missing_record() {
    let (_fixture, app) = shared_app();

    let response = send(
        app.clone(),
        post_json(
            "/api/progress/update",
            json!({
                "userId": "alice",
                "videoId": "movie123",
                "watchedSeconds": 0,
                "totalSeconds": 0
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(app, get("/api/progress/bob/movie123", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "PROGRESS_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let (_fixture, app) = shared_app();

    let requests = [
        post_json(
            "/api/progress/update",
            json!({
                "userId": "alice",
                "videoId": "movie123",
                "watchedSeconds": -5,
                "totalSeconds": 120
            }),
        ),
        post_json("/api/playback/start", json!({ "userId": "alice" })),
        Request::post("/api/playback/start")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    ];

    for request in requests {
        let response = send(app.clone(), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "INVALID_INPUT");
        assert!(body["message"].is_string());
    }
}
