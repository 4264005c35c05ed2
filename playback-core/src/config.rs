//! Centralized configuration for the playback service.
//!
//! All tunable parameters are defined here; environment variables may
//! override the defaults at startup.

use std::path::PathBuf;

use crate::streaming::{DEFAULT_CHUNK_SIZE, VIDEO_CONTENT_TYPE};

/// Environment variable naming the video storage directory.
pub const STORAGE_PATH_ENV: &str = "VIDEO_STORAGE_PATH";
/// Environment variable overriding the streaming chunk size in bytes.
pub const CHUNK_SIZE_ENV: &str = "PLAYBACK_CHUNK_SIZE";
/// Environment variable overriding the bind host.
pub const HOST_ENV: &str = "PLAYBACK_HOST";
/// Environment variable overriding the bind port.
pub const PORT_ENV: &str = "PLAYBACK_PORT";

/// Central configuration for all playback components.
#[derive(Debug, Clone, Default)]
pub struct PlaybackConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

/// Video storage and disk I/O configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding `<video-id>.mp4` files. Relative paths resolve
    /// against the working directory at startup.
    pub video_root: PathBuf,
    /// Read buffer size for each streamed chunk
    pub chunk_size: usize,
    /// Media type sent with every stream response
    pub content_type: &'static str,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            video_root: PathBuf::from("videos"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            content_type: VIDEO_CONTENT_TYPE,
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` pair the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PlaybackConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(STORAGE_PATH_ENV) {
            if !path.trim().is_empty() {
                config.storage.video_root = PathBuf::from(path);
            }
        }

        if let Some(chunk_size) = lookup(CHUNK_SIZE_ENV) {
            if let Ok(bytes) = chunk_size.parse::<usize>() {
                if bytes > 0 {
                    config.storage.chunk_size = bytes;
                }
            }
        }

        if let Some(host) = lookup(HOST_ENV) {
            if !host.trim().is_empty() {
                config.server.host = host;
            }
        }

        if let Some(port) = lookup(PORT_ENV) {
            if let Ok(port) = port.parse::<u16>() {
                config.server.port = port;
            }
        }

        config
    }
}
