//! Playback Core - Range-aware video streaming
//!
//! This crate provides the building blocks of the playback service: safe
//! resolution of untrusted video identifiers onto the storage directory,
//! HTTP byte-range parsing, bounded file streaming, and the in-memory
//! session and watch-progress trackers that sit beside the streamer.

pub mod config;
pub mod progress;
pub mod session;
pub mod streaming;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::PlaybackConfig;
pub use progress::{ProgressError, ProgressTracker, WatchProgress};
pub use session::{PlaybackSession, SessionChange, SessionError, SessionStore, SessionTracker};
pub use streaming::{ByteRange, RangeStreamer, StreamDescriptor, StreamError, VideoEntry};

/// Core errors that can bubble up from any playback subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Streaming error: {0}")]
    Stream(#[from] StreamError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Server error: {reason}")]
    Server { reason: String },
}

impl PlaybackError {
    /// Returns a user-friendly error message suitable for display.
    ///
    /// Never includes filesystem paths.
    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::Stream(e) => match e {
                StreamError::InvalidIdentifier(reason) => format!("Invalid video id: {reason}"),
                StreamError::PathTraversal => "Invalid video id".to_string(),
                StreamError::NotFound | StreamError::EmptyFile => "Video not found".to_string(),
                StreamError::MalformedRange { reason } => format!("Malformed range: {reason}"),
                StreamError::InvalidRange { violation, .. } => {
                    format!("Range not satisfiable: {violation}")
                }
                StreamError::Io(_) => "Error streaming video".to_string(),
            },
            PlaybackError::Session(e) => e.to_string(),
            PlaybackError::Progress(e) => e.to_string(),
            PlaybackError::Configuration { reason } => format!("Configuration error: {reason}"),
            PlaybackError::Server { reason } => format!("Server error: {reason}"),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        match self {
            PlaybackError::Stream(e) => e.is_client_error(),
            PlaybackError::Session(_) | PlaybackError::Progress(_) => true,
            PlaybackError::Configuration { .. } | PlaybackError::Server { .. } => false,
        }
    }
}

impl PlaybackError {
    /// Wraps a web server failure.
    pub fn from_server_error(error: impl std::fmt::Display) -> Self {
        PlaybackError::Server {
            reason: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
