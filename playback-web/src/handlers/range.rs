//! HTTP framing for range-aware video responses
//!
//! Turns a validated [`StreamDescriptor`] into a `200 OK` or
//! `206 Partial Content` response with a streaming body.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use playback_core::StreamDescriptor;

/// Raw `Range` header bytes, if present.
///
/// Left undecoded: the streamer validates the identifier and finds the file
/// before it looks at the range.
pub fn raw_range_header(headers: &HeaderMap) -> Option<&[u8]> {
    headers.get(header::RANGE).map(HeaderValue::as_bytes)
}

/// Build the streaming response for a prepared descriptor.
///
/// Status and headers are fixed here; any later read failure can only cut
/// the body short.
pub fn build_stream_response(descriptor: StreamDescriptor, content_type: &str) -> Response {
    let content_range = descriptor.content_range();
    let content_length = descriptor.content_length();

    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, content_length.to_string());

    response = match content_range {
        Some(range) => response
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, range),
        None => response.status(StatusCode::OK),
    };

    response
        .body(Body::from_stream(descriptor.into_stream()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
