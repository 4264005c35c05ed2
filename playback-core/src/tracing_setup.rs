//! Tracing setup for the playback service
//!
//! Console logs follow the level the operator picks. A second layer writes a
//! full trace of the playback crates to disk for the last run; its filter is
//! set with `PLAYBACK_FILE_LOG` using `EnvFilter` directive syntax.

use std::fs::{File, create_dir_all};
use std::io;
use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the per-run debug log inside the logs directory.
pub const LAST_RUN_LOG: &str = "playback-last-run.log";

/// Environment variable replacing the file layer's filter directives.
pub const FILE_FILTER_ENV: &str = "PLAYBACK_FILE_LOG";

/// Full trace for the playback crates, dependencies at info.
pub const DEFAULT_FILE_DIRECTIVES: &str =
    "info,playback=trace,playback_core=trace,playback_web=trace";

/// Destinations and verbosity for both log layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Console verbosity; `RUST_LOG` takes precedence when set
    pub console_level: Level,
    /// Directory receiving [`LAST_RUN_LOG`]
    pub logs_dir: PathBuf,
    /// `EnvFilter` directives for the file layer
    pub file_directives: String,
}

impl LogSettings {
    pub fn new(console_level: Level) -> Self {
        Self {
            console_level,
            logs_dir: PathBuf::from("logs"),
            file_directives: DEFAULT_FILE_DIRECTIVES.to_string(),
        }
    }

    /// Settings with `PLAYBACK_FILE_LOG` applied when set and non-empty.
    pub fn from_env(console_level: Level) -> Self {
        let mut settings = Self::new(console_level);
        if let Ok(directives) = std::env::var(FILE_FILTER_ENV) {
            if !directives.trim().is_empty() {
                settings.file_directives = directives;
            }
        }
        settings
    }

    pub fn with_logs_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = logs_dir.into();
        self
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.logs_dir.join(LAST_RUN_LOG)
    }

    fn console_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.console_level.to_string()))
    }

    /// # Errors
    ///
    /// - `io::ErrorKind::InvalidInput` - Directives do not parse
    fn file_filter(&self) -> io::Result<EnvFilter> {
        EnvFilter::try_new(&self.file_directives).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid {FILE_FILTER_ENV} directives: {e}"),
            )
        })
    }
}

/// Install the console layer and the last-run file layer.
///
/// The log file is truncated on every run.
///
/// # Errors
///
/// - `std::io::Error` - Logs directory or file cannot be created, or the file
///   directives are invalid
pub fn init_tracing(settings: &LogSettings) -> io::Result<()> {
    let file_filter = settings.file_filter()?;
    create_dir_all(&settings.logs_dir)?;
    let log_file_path = settings.log_file_path();
    let log_file = File::create(&log_file_path)?;

    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(settings.console_filter());

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        console = %settings.console_level,
        file = %log_file_path.display(),
        "Logging initialized"
    );

    Ok(())
}

/// CLI log levels for user control
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Informational, warning, and error messages
    Info,
    /// Debug, informational, warning, and error messages
    Debug,
    /// All messages including per-chunk tracing
    Trace,
}

impl CliLogLevel {
    /// Converts the CLI log level to a tracing `Level`.
    ///
    /// # Examples
    /// ```
    /// use playback_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Info.as_tracing_level(), tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliLogLevel::Error => write!(f, "error"),
            CliLogLevel::Warn => write!(f, "warn"),
            CliLogLevel::Info => write!(f, "info"),
            CliLogLevel::Debug => write!(f, "debug"),
            CliLogLevel::Trace => write!(f, "trace"),
        }
    }
}
