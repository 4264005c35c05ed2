//! Integration tests for the playback service
//!
//! Drive the full router, and a real listener, against a temporary video
//! library on disk.

#[path = "integration/common.rs"]
mod common;

#[path = "integration/stream_scenarios.rs"]
mod stream_scenarios;

#[path = "integration/live_server.rs"]
mod live_server;

#[path = "integration/session_progress_api.rs"]
mod session_progress_api;
