//! # Logging Utilities
//!
//! Structured logging on top of `tracing-subscriber`.
//!
//! - Pretty (human-readable) or JSON output
//! - Console output on stderr, so stdout stays free for command results
//! - Optional copy of every event in a log file, written off-thread
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `RUST_LOG=erst_core=debug`)
//! - `ERST_LOG_FORMAT`: `pretty` (default) or `json`
//! - `ERST_LOG_FILE`: optional path of a log file
//!
//! ## Example
//!
//! ```rust,no_run
//! use erst_utils::{init_logging, LogLevel, LoggingConfig};
//!
//! # fn main() -> Result<(), erst_utils::LoggingError> {
//! let config = LoggingConfig::from_env()?.with_level(LogLevel::Debug);
//! let _guard = init_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "ERST_LOG_FORMAT";
const FILE_VAR: &str = "ERST_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable, one event per line
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "text" => Ok(LogFormat::Pretty),
            "json" | "prod" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel
{
    Error,
    /// Default: only skipped units and real failures are reported
    #[default]
    Warn,
    Info,
    Debug,
    /// Every decoding decision
    Trace,
}

impl LogLevel
{
    pub fn as_str(self) -> &'static str
    {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Everything [`init_logging`] needs; nothing is read from the environment
/// after this value is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig
{
    /// Level used when `filter` is not set
    pub level: LogLevel,
    pub format: LogFormat,
    /// Full `EnvFilter` directive string, e.g. `erst_core=debug,warn`.
    /// Takes precedence over `level`.
    pub filter: Option<String>,
    /// Also write events to this file
    pub file: Option<PathBuf>,
}

impl LoggingConfig
{
    /// Read `RUST_LOG`, `ERST_LOG_FORMAT` and `ERST_LOG_FILE`.
    ///
    /// ## Errors
    ///
    /// [`LoggingError::InvalidFormat`] if `ERST_LOG_FORMAT` is set to an
    /// unknown format.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        let format = match env::var(FORMAT_VAR) {
            Ok(value) => value.parse().map_err(LoggingError::InvalidFormat)?,
            Err(_) => LogFormat::default(),
        };
        Ok(Self {
            level: LogLevel::default(),
            format,
            filter: env::var(EnvFilter::DEFAULT_ENV).ok().filter(|value| !value.trim().is_empty()),
            file: env::var_os(FILE_VAR).map(PathBuf::from),
        })
    }

    /// Use `level` for everything, dropping any filter directive.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = level;
        self.filter = None;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    /// The directive string handed to `EnvFilter`.
    pub fn directive(&self) -> &str
    {
        self.filter.as_deref().unwrap_or(self.level.as_str())
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError>
    {
        EnvFilter::try_new(self.directive()).map_err(|err| LoggingError::InvalidLevel(format!("{}: {err}", self.directive())))
    }
}

/// Keeps the background file writer alive; drop it last.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber described by `config`.
///
/// ## Errors
///
/// - [`LoggingError::InvalidLevel`] if the filter directive does not parse
/// - [`LoggingError::FileError`] / [`LoggingError::InitializationFailed`] if
///   the log file cannot be opened
/// - [`LoggingError::InitializationFailed`] if a subscriber is already set
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError>
{
    let filter = config.env_filter()?;

    let mut layers: Vec<BoxedLayer> = vec![layer(config.format, io::stderr, true)];
    let mut guard = None;
    if let Some(path) = &config.file {
        let appender = file_appender(path)?;
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(layer(config.format, writer, false));
        guard = Some(worker);
    }

    Registry::default()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    tracing::debug!(
        directive = config.directive(),
        format = ?config.format,
        started = %Utc::now().to_rfc3339(),
        "logging initialized"
    );
    Ok(LoggingGuard { _file: guard })
}

fn layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        LogFormat::Pretty => base.with_ansi(ansi).boxed(),
        LogFormat::Json => base.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

/// Appender writing to exactly `path`; the caller picks the file name.
fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError>
{
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LoggingError::InitializationFailed(format!("not a log file path: {}", path.display())))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid level or filter directive
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
