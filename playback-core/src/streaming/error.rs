//! Error taxonomy for the streaming path.

use thiserror::Error;

use super::identifier::IdentifierError;

/// Errors that can occur while resolving, validating, or streaming a video.
///
/// Every variant except `Io` is detected before a response is committed.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Identifier is empty, outside `[A-Za-z0-9_-]`, or carries path tokens.
    #[error("invalid video identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// Normalized candidate path is not strictly inside the storage root.
    #[error("resolved path escapes the storage root")]
    PathTraversal,

    /// File is absent or not a regular file.
    #[error("video not found")]
    NotFound,

    /// File exists but has no bytes, so no offset is satisfiable.
    #[error("video file is empty")]
    EmptyFile,

    /// Range header could not be parsed.
    #[error("malformed range header: {reason}")]
    MalformedRange {
        /// Which part of the header was rejected.
        reason: &'static str,
    },

    /// Range header parsed but cannot be served from this file.
    #[error("range not satisfiable: {violation} (bytes {start}-{end} of {length})")]
    InvalidRange {
        /// The bound that was violated.
        violation: RangeViolation,
        /// Requested first byte.
        start: u64,
        /// Requested last byte.
        end: u64,
        /// Actual file length.
        length: u64,
    },

    /// Open, seek, or read failed after validation passed.
    #[error("I/O error while streaming: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// True when the request itself is at fault rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StreamError::Io(_))
    }
}

/// Which semantic check a parsed range failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeViolation {
    /// `start > end`
    StartAfterEnd,
    /// `end >= length`
    EndPastEof,
}

impl std::fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeViolation::StartAfterEnd => write!(f, "start is after end"),
            RangeViolation::EndPastEof => write!(f, "end is past the end of the file"),
        }
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
