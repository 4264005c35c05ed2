//! CLI command implementations

use std::path::PathBuf;

use clap::Subcommand;
use playback_core::config::PlaybackConfig;
use playback_core::streaming::RangeStreamer;
use playback_core::{PlaybackError, Result};
use tracing::{debug, info};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming server
    Server {
        /// Host to bind to (overrides PLAYBACK_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides PLAYBACK_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Video storage directory (overrides VIDEO_STORAGE_PATH)
        #[arg(short, long)]
        storage: Option<PathBuf>,
    },
    /// Show how a stream request would be answered, without sending bytes
    Probe {
        /// Video identifier as it would appear in /api/stream/{id}
        video_id: String,
        /// Range header value, e.g. "bytes=0-1023"
        #[arg(short, long)]
        range: Option<String>,
        /// Video storage directory (overrides VIDEO_STORAGE_PATH)
        #[arg(short, long)]
        storage: Option<PathBuf>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Server {
            host,
            port,
            storage,
        } => start_server(host, port, storage).await,
        Commands::Probe {
            video_id,
            range,
            storage,
        } => {
            let report = probe(&video_id, range.as_deref(), storage).await?;
            print!("{report}");
            Ok(())
        }
    }
}

/// Environment configuration with command-line overrides applied.
fn load_config(
    host: Option<String>,
    port: Option<u16>,
    storage: Option<PathBuf>,
) -> PlaybackConfig {
    let mut config = PlaybackConfig::from_env();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(storage) = storage {
        config.storage.video_root = storage;
    }
    config
}

/// Start the web server
///
/// # Errors
/// - `PlaybackError::Server` - Failed to bind or serve
pub async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    storage: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(host, port, storage);

    info!(
        storage = %config.storage.video_root.display(),
        chunk_size = config.storage.chunk_size,
        "Starting playback server"
    );
    println!(
        "Stream: http://{}/api/stream/{{video-id}}",
        config.server.bind_address()
    );
    println!("Press Ctrl+C to stop the server");

    playback_web::run_server(config)
        .await
        .map_err(PlaybackError::from_server_error)
}

/// Response framing a stream request would receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: u16,
    pub content_length: u64,
    pub total_length: u64,
    pub content_range: Option<String>,
}

impl std::fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Accept-Ranges: bytes")?;
        writeln!(f, "Content-Length: {}", self.content_length)?;
        if let Some(range) = &self.content_range {
            writeln!(f, "Content-Range: {range}")?;
        }
        writeln!(f, "File size: {} bytes", self.total_length)
    }
}

/// Resolve and validate a stream request against the storage directory.
///
/// The file is opened and closed again; no bytes are read.
///
/// # Errors
/// - `PlaybackError::Configuration` - Storage root is unusable
/// - `PlaybackError::Stream` - The request would be rejected
pub async fn probe(
    video_id: &str,
    range: Option<&str>,
    storage: Option<PathBuf>,
) -> Result<ProbeReport> {
    let config = load_config(None, None, storage);
    let streamer =
        RangeStreamer::from_config(&config.storage).map_err(|e| PlaybackError::Configuration {
            reason: format!("invalid storage directory: {e}"),
        })?;

    let descriptor = streamer.prepare(video_id, range).await?;
    debug!(video_id, partial = descriptor.is_partial(), "Probe resolved");

    Ok(ProbeReport {
        status: if descriptor.is_partial() { 206 } else { 200 },
        content_length: descriptor.content_length(),
        total_length: descriptor.total_length(),
        content_range: descriptor.content_range(),
    })
}
