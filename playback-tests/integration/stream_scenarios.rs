//! End-to-end stream requests through the router
//!
//! Each test issues a real HTTP request against `movie123.mp4` (1000 bytes)
//! and checks status, framing headers and the exact bytes on the wire.

use std::path::Path;

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode, header};
use playback_core::StreamError;
use playback_core::streaming::test_fixtures::VideoLibraryFixture;
use proptest::prelude::*;

use crate::common::{
    MOVIE_LEN, body_bytes, body_json, get, header_str, movie_library, router, send,
};

#[tokio::test]
async fn test_full_file_without_range_header() {
    let (fixture, data) = movie_library();

    let response = send(router(&fixture), get("/api/stream/movie123", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("video/mp4"));
    assert_eq!(header_str(&response, header::ACCEPT_RANGES), Some("bytes"));
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("1000"));
    assert!(response.headers().get(header::CONTENT_RANGE).is_none());
    assert_eq!(body_bytes(response).await, data);
}

#[tokio::test]
async fn test_bounded_range() {
    let (fixture, data) = movie_library();

    let response = send(
        router(&fixture),
        get("/api/stream/movie123", Some("bytes=100-199")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes 100-199/1000")
    );
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("100"));
    assert_eq!(body_bytes(response).await, &data[100..200]);
}

#[tokio::test]
async fn test_open_ended_range() {
    let (fixture, data) = movie_library();

    let response = send(
        router(&fixture),
        get("/api/stream/movie123", Some("bytes=900-")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes 900-999/1000")
    );
    assert_eq!(body_bytes(response).await, &data[900..]);
}

#[tokio::test]
async fn test_start_after_end_is_unsatisfiable() {
    let (fixture, _) = movie_library();

    let response = send(
        router(&fixture),
        get("/api/stream/movie123", Some("bytes=500-100")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header_str(&response, header::CONTENT_RANGE), Some("bytes */1000"));
    let body = body_json(response).await;
    assert_eq!(body["error"], "INVALID_RANGE");
    assert!(body["message"].as_str().unwrap().contains("start"));
}

#[tokio::test]
async fn test_end_past_eof_is_unsatisfiable() {
    let (fixture, _) = movie_library();

    let response = send(
        router(&fixture),
        get("/api/stream/movie123", Some("bytes=0-1000")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header_str(&response, header::CONTENT_RANGE), Some("bytes */1000"));
}

#[tokio::test]
async fn test_last_byte_is_satisfiable() {
    let (fixture, data) = movie_library();

    let response = send(
        router(&fixture),
        get("/api/stream/movie123", Some("bytes=999-999")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, vec![data[999]]);
}

#[tokio::test]
async fn test_start_without_separator_reads_to_eof() {
    let (fixture, data) = movie_library();

    let response = send(
        router(&fixture),
        get("/api/stream/movie123", Some("bytes=100")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes 100-999/1000")
    );
    assert_eq!(body_bytes(response).await, &data[100..]);
}

fn get_with_raw_range(uri: &str, range: &[u8]) -> Request<Body> {
    Request::get(uri)
        .header(header::RANGE, HeaderValue::from_bytes(range).unwrap())
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_undecodable_range_does_not_mask_lookup_errors() {
    let (fixture, _) = movie_library();
    let garbage: &[u8] = b"bytes=\xff-";

    let response = send(
        router(&fixture),
        get_with_raw_range("/api/stream/ghost", garbage),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        router(&fixture),
        get_with_raw_range("/api/stream/bad.id", garbage),
    )
    .await;
    assert_eq!(body_json(response).await["error"], "INVALID_IDENTIFIER");

    let response = send(
        router(&fixture),
        get_with_raw_range("/api/stream/movie123", garbage),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "MALFORMED_RANGE");
}

#[tokio::test]
async fn test_malformed_ranges_are_bad_requests() {
    let (fixture, _) = movie_library();

    for header_value in [
        "bytes=abc-100",
        "bytes=-100",
        "items=0-10",
        "bytes=0-10,20-30",
        "bytes=+5-10",
    ] {
        let response = send(
            router(&fixture),
            get("/api/stream/movie123", Some(header_value)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{header_value}");
        let body = body_json(response).await;
        assert_eq!(body["error"], "MALFORMED_RANGE", "{header_value}");
    }
}

#[tokio::test]
async fn test_traversal_identifier_is_rejected_before_path_math() {
    let (fixture, _) = movie_library();

    let response = send(
        router(&fixture),
        get("/api/stream/..%2F..%2Fetc%2Fpasswd", None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "INVALID_IDENTIFIER");
}

#[test]
fn test_escaping_path_is_path_traversal() {
    let fixture = VideoLibraryFixture::new();
    let streamer = fixture.streamer();
    let error = streamer
        .storage_root()
        .confine(Path::new("../outside.mp4"))
        .unwrap_err();

    assert!(matches!(error, StreamError::PathTraversal));
}

#[tokio::test]
async fn test_missing_video_is_not_found() {
    let (fixture, _) = movie_library();

    let response = send(router(&fixture), get("/api/stream/ghost", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_empty_video_is_not_found() {
    let fixture = VideoLibraryFixture::new();
    fixture.write_video("blank", &[]);

    let response = send(router(&fixture), get("/api/stream/blank", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_directory_named_like_video_is_not_found() {
    let fixture = VideoLibraryFixture::new();
    std::fs::create_dir(fixture.root().join("folder.mp4")).unwrap();

    let response = send(router(&fixture), get("/api/stream/folder", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_error_bodies_never_contain_storage_path() {
    let (fixture, _) = movie_library();
    let root = fixture.root().to_string_lossy().into_owned();

    for (uri, range) in [
        ("/api/stream/ghost", None),
        ("/api/stream/movie123", Some("bytes=0-5000")),
        ("/api/stream/bad.name", None),
        ("/api/stream/movie123", Some("bytes=x-")),
    ] {
        let response = send(router(&fixture), get(uri, range)).await;
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(!body.contains(&root), "{uri} leaked the storage path: {body}");
        assert!(!body.contains(".mp4"), "{uri} leaked a file name: {body}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_any_satisfiable_range_returns_exact_slice(
        start in 0usize..MOVIE_LEN,
        span in 0usize..MOVIE_LEN,
    ) {
        let end = (start + span).min(MOVIE_LEN - 1);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let body = runtime.block_on(async {
            let (fixture, data) = movie_library();
            let range = format!("bytes={start}-{end}");
            let request = get("/api/stream/movie123", Some(&range));
            let response = send(router(&fixture), request).await;
            assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
            (body_bytes(response).await, data)
        });

        prop_assert_eq!(&body.0[..], &body.1[start..=end]);
    }
}

#[tokio::test]
async fn test_video_listing_matches_streamable_files() {
    let (fixture, _) = movie_library();
    fixture.write_video("blank", &[]);
    let root = fixture.root().to_string_lossy().into_owned();

    let response = send(router(&fixture), get("/api/videos", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(!text.contains(&root));
    let videos: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        videos,
        serde_json::json!([
            { "id": "movie123", "sizeBytes": MOVIE_LEN, "mimeType": "video/mp4" }
        ])
    );
}
