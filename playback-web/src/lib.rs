//! Playback Web - JSON API and streaming server

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
//!
//! Serves stored videos with byte-range support and exposes the session and
//! watch-progress endpoints that players call alongside streaming.

pub mod error;
pub mod handlers;
pub mod server;

// Re-export main types
pub use error::ApiError;
pub use server::{AppState, build_router, run_server, serve};
