//! Log output for the bridge
//!
//! Library code only emits `tracing` events and spans. A binary calls
//! [`init_tracing`] once to print them. Span fields never carry secret
//! material, so every sink configured here is safe to keep.

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Crates whose events follow the configured level
const OWN_CRATES: &[&str] = &["sealed_core", "sealed_cli"];

static INSTALLED: OnceLock<TracingConfig> = OnceLock::new();

/// Failures while installing the log subscriber
#[derive(Debug, Error)]
pub enum TracingError {
    /// The filter directive did not parse
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// `init_tracing` already ran in this process
    #[error("Logging is already set up")]
    AlreadyInitialized,

    /// The log file could not be created
    #[error("Cannot open log file {}: {source}", path.display())]
    LogFile {
        /// Requested log file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Another global subscriber is installed
    #[error("Failed to install the log subscriber: {0}")]
    Install(String),
}

/// Result type for tracing setup
pub type TracingResult<T> = Result<T, TracingError>;

/// Verbosity for the bridge's own events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Errors and warnings
    #[default]
    Warn,
    /// Adds operation outcomes
    Info,
    /// Adds every CLI invocation
    Debug,
    /// Everything
    Trace,
}

impl TracingLevel {
    /// Maps a `-v` count onto a level, starting at `Warn`
    #[must_use]
    pub const fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Name used in filter directives
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Where log lines are written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard error, keeping stdout free for command output
    #[default]
    Stderr,
    /// Standard output
    Stdout,
    /// A file, truncated when logging starts
    File(PathBuf),
}

/// Subscriber settings
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Level applied to the bridge's crates
    pub level: TracingLevel,
    /// Sink
    pub output: TracingOutput,
    /// Full `EnvFilter` directive; replaces `level` when set
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Default settings: warnings to stderr
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the sink
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Uses a custom filter directive; blank input is ignored
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.trim().is_empty() {
            self.filter = Some(filter);
        }
        self
    }

    /// The `EnvFilter` directive these settings produce
    #[must_use]
    pub fn directive(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => OWN_CRATES
                .iter()
                .map(|name| format!("{name}={}", self.level.as_str()))
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    fn writer(&self) -> TracingResult<(BoxMakeWriter, bool)> {
        Ok(match &self.output {
            TracingOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
            TracingOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
            TracingOutput::File(path) => {
                let file = File::create(path).map_err(|source| TracingError::LogFile {
                    path: path.clone(),
                    source,
                })?;
                (BoxMakeWriter::new(Mutex::new(file)), false)
            }
        })
    }
}

/// Installs the global subscriber
///
/// # Errors
/// Returns `TracingError::AlreadyInitialized` when called a second time,
/// and the other variants for a bad filter, an unwritable log file or a
/// subscriber installed by someone else.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if INSTALLED.get().is_some() {
        return Err(TracingError::AlreadyInitialized);
    }

    let filter =
        EnvFilter::try_new(config.directive()).map_err(|e| TracingError::Filter(e.to_string()))?;
    let (writer, ansi) = config.writer()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| TracingError::Install(e.to_string()))?;

    INSTALLED
        .set(config.clone())
        .map_err(|_| TracingError::AlreadyInitialized)?;
    tracing::debug!(directive = %config.directive(), "Logging started");
    Ok(())
}

/// Settings of the installed subscriber, if [`init_tracing`] succeeded
#[must_use]
pub fn installed_config() -> Option<&'static TracingConfig> {
    INSTALLED.get()
}
