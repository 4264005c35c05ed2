//! HTTP mapping of domain errors.
//!
//! Every error becomes a JSON body `{ "error": CODE, "message": text }`.
//! Messages never carry filesystem paths; I/O details stay in the logs.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use playback_core::{ProgressError, SessionError, StreamError};
use serde::Serialize;
use tracing::error;

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Streaming request rejected or failed before the response was committed
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Session operation failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Progress operation failed
    #[error(transparent)]
    Progress(#[from] ProgressError),

    /// Request body was not the expected JSON
    #[error("invalid request body: {0}")]
    Body(#[from] JsonRejection),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub error: &'static str,
    /// Human-readable description
    pub message: String,
}

impl ApiError {
    /// Status code, error code and client-safe message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Stream(e) => match e {
                StreamError::InvalidIdentifier(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_IDENTIFIER", e.to_string())
                }
                StreamError::PathTraversal => (
                    StatusCode::BAD_REQUEST,
                    "PATH_TRAVERSAL",
                    "invalid video identifier".to_string(),
                ),
                StreamError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                StreamError::EmptyFile => (StatusCode::NOT_FOUND, "EMPTY_FILE", e.to_string()),
                StreamError::MalformedRange { .. } => {
                    (StatusCode::BAD_REQUEST, "MALFORMED_RANGE", e.to_string())
                }
                StreamError::InvalidRange { .. } => (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    "INVALID_RANGE",
                    e.to_string(),
                ),
                StreamError::Io(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STREAMING_ERROR",
                    "error streaming video".to_string(),
                ),
            },
            ApiError::Session(e) => match e {
                SessionError::InvalidIdentifier { .. } => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", e.to_string())
                }
                SessionError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", e.to_string())
                }
            },
            ApiError::Progress(e) => match e {
                ProgressError::InvalidIdentifier { .. } | ProgressError::InvalidTotal => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", e.to_string())
                }
                ProgressError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "PROGRESS_NOT_FOUND", e.to_string())
                }
            },
            ApiError::Body(rejection) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                rejection.body_text(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Stream(StreamError::Io(e)) = &self {
            error!("Streaming I/O error: {}", e);
        }

        let (status, code, message) = self.parts();
        let mut response = (
            status,
            Json(ErrorBody {
                error: code,
                message,
            }),
        )
            .into_response();

        if let ApiError::Stream(StreamError::InvalidRange { length, .. }) = &self {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{length}")) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}

/// Convenience type alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use playback_core::streaming::{IdentifierError, RangeViolation};

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::from(StreamError::InvalidIdentifier(IdentifierError::PathToken)),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(StreamError::PathTraversal),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::from(StreamError::NotFound), StatusCode::NOT_FOUND),
            (ApiError::from(StreamError::EmptyFile), StatusCode::NOT_FOUND),
            (
                ApiError::from(StreamError::MalformedRange { reason: "x" }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(StreamError::Io(std::io::Error::other("disk"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(SessionError::NotFound {
                    session_id: "s".into(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(ProgressError::InvalidTotal),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.parts().0, expected, "{error:?}");
        }
    }

    #[test]
    fn test_invalid_range_sets_unsatisfied_content_range() {
        let response = ApiError::from(StreamError::InvalidRange {
            violation: RangeViolation::EndPastEof,
            start: 0,
            end: 1000,
            length: 1000,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes */1000"
        );
    }

    #[test]
    fn test_io_message_is_generic() {
        let error = ApiError::from(StreamError::Io(std::io::Error::other(
            "/srv/videos/movie123.mp4: input/output error",
        )));
        let (_, code, message) = error.parts();
        assert_eq!(code, "STREAMING_ERROR");
        assert!(!message.contains("/srv"));
    }
}
