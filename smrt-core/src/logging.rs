//! Logging setup for SMRT services.
//!
//! Builds a `tracing-subscriber` registry with an [`EnvFilter`] and one
//! `fmt` layer writing through a non-blocking `tracing-appender` writer.
//! The default is plain text on STDOUT at debug level.
//!
//! # Examples
//!
//! ```no_run
//! use smrt_core::logging::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     // SMRT_LOG, SMRT_LOG_LEVEL and SMRT_LOG_FORMAT override the defaults
//!     let _guard = LogConfig::from_env().init().expect("logging");
//!
//!     info!("service started");
//! }
//! ```
//!
//! ```no_run
//! use smrt_core::logging::*;
//!
//! let _guard = LogConfig::new()
//!     .level(LogLevel::Info)
//!     .format(LogFormat::Json)
//!     .output(LogOutput::File("smrt.log".into()))
//!     .init();
//! ```

use crate::{Error, Result};
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan, writer::MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use tracing::{debug, error, info, trace, warn};

/// Environment variable naming a file to log to in addition to STDOUT.
pub const LOG_FILE_ENV: &str = "SMRT_LOG";
/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "SMRT_LOG_LEVEL";
/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "SMRT_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a level name, ignoring case. `warning` is accepted for `warn`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// `time LEVEL target: message`
    Plain,
    /// Multi-line, for local development
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "plain" | "text" => Some(LogFormat::Plain),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Output destination for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Append to a single file
    File(String),
    /// STDOUT plus a copy appended to a file
    StdoutAndFile(String),
}

/// Flushes buffered log lines when dropped. Keep it alive for the life of
/// the process.
#[derive(Debug)]
#[must_use]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub thread_ids: bool,
    pub targets: bool,
    pub file_line: bool,
    pub spans: bool,
    pub colors: bool,
    /// Custom filter directive; overrides `level` when set
    pub env_filter: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `SMRT_LOG`, `SMRT_LOG_LEVEL` and
    /// `SMRT_LOG_FORMAT`. Unrecognized values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(LOG_FILE_ENV).filter(|p| !p.trim().is_empty()) {
            config.output = LogOutput::StdoutAndFile(path);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).as_deref().and_then(LogLevel::parse) {
            config.level = level;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).as_deref().and_then(LogFormat::parse) {
            config.format = format;
        }

        config
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_thread_ids(mut self, enable: bool) -> Self {
        self.thread_ids = enable;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_file_line(mut self, enable: bool) -> Self {
        self.file_line = enable;
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.spans = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Set a filter directive such as `"smrt_core=debug,hyper=info"`.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Install the global subscriber.
    ///
    /// Fails if the log file cannot be opened or a global subscriber is
    /// already installed.
    pub fn init(self) -> Result<LogGuard> {
        let env_filter = match &self.env_filter {
            Some(directive) => EnvFilter::try_new(directive)
                .map_err(|e| Error::Internal(format!("invalid log filter '{}': {}", directive, e)))?,
            None => EnvFilter::new(self.level.as_str()),
        };

        let mut guards = Vec::with_capacity(2);
        match &self.output {
            LogOutput::Stdout => {
                let (writer, guard) = tracing_appender::non_blocking(io::stdout());
                guards.push(guard);
                self.init_with_writer(writer, env_filter)?;
            }
            LogOutput::Stderr => {
                let (writer, guard) = tracing_appender::non_blocking(io::stderr());
                guards.push(guard);
                self.init_with_writer(writer, env_filter)?;
            }
            LogOutput::File(path) => {
                let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
                guards.push(guard);
                self.init_with_writer(writer, env_filter)?;
            }
            LogOutput::StdoutAndFile(path) => {
                let file = open_log_file(path)?;
                let (stdout, stdout_guard) = tracing_appender::non_blocking(io::stdout());
                let (file, file_guard) = tracing_appender::non_blocking(file);
                guards.push(stdout_guard);
                guards.push(file_guard);
                self.init_with_writer(stdout.and(file), env_filter)?;
            }
        }

        Ok(LogGuard { _guards: guards })
    }

    fn init_with_writer<W>(&self, writer: W, env_filter: EnvFilter) -> Result<()>
    where
        W: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Send + Sync + 'static,
    {
        let fmt_span = if self.spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(env_filter);

        let installed = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_current_span(self.spans)
                        .with_span_list(self.spans)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_file(self.file_line)
                        .with_line_number(self.file_line)
                        .with_span_events(fmt_span),
                )
                .try_init(),
            LogFormat::Plain => registry
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_file(self.file_line)
                        .with_line_number(self.file_line)
                        .with_ansi(self.colors)
                        .with_span_events(fmt_span),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_file(self.file_line)
                        .with_line_number(self.file_line)
                        .with_ansi(self.colors)
                        .with_span_events(fmt_span),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_ansi(self.colors)
                        .with_span_events(fmt_span),
                )
                .try_init(),
        };

        installed.map_err(|e| Error::Internal(format!("failed to install subscriber: {}", e)))
    }
}

fn open_log_file(path: &str) -> Result<std::fs::File> {
    Ok(std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?)
}

impl Default for LogConfig {
    /// Plain text to STDOUT at debug level
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Plain,
            output: LogOutput::Stdout,
            thread_ids: false,
            targets: true,
            file_line: false,
            spans: false,
            colors: false,
            env_filter: None,
        }
    }
}
