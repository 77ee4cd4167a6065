//! # Structured Logging
//!
//! Installs a `tracing` subscriber for binaries driving the optimizer:
//!
//! - Output formats: JSON, Pretty, Compact
//! - Level filtering, overridable through `RUST_LOG` or an explicit filter
//! - Output on stderr, leaving stdout free for results, and optionally
//!   appended to a log file
//!
//! ## Example
//!
//! ```rust,no_run
//! use seccap_core::observe::{init_logging, LogConfig, LogFormat, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Json,
//!     ..Default::default()
//! };
//!
//! init_logging(&config).expect("log file");
//!
//! tracing::info!(n_tx = 4, "starting sweep");
//! ```

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace,
    /// Debug level, includes inner iteration records
    Debug,
    /// Info level, one record per outer iteration
    #[default]
    Info,
    Warn,
    /// Error level (least verbose)
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable)
    Json,
    /// Pretty format (human-readable, multi-line)
    #[default]
    Pretty,
    /// Compact format (one line per event)
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{other}' (expected json, pretty or compact)")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include timestamps
    pub timestamps: bool,
    /// Include source location (file:line)
    pub source_location: bool,
    pub thread_ids: bool,
    /// Directive filter (e.g. "seccap_core=debug,seccap_sim=info"), takes
    /// precedence over `RUST_LOG` and `level`
    pub filter: Option<String>,
    /// Also append records to this file (no ANSI colours)
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            timestamps: true,
            source_location: false,
            thread_ids: false,
            filter: None,
            file: None,
        }
    }
}

impl LogConfig {
    /// Create a development configuration (debug records, source locations).
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            source_location: true,
            ..Default::default()
        }
    }

    /// Create a quiet configuration (errors only).
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            timestamps: false,
            ..Default::default()
        }
    }

    /// Level from a repeated `-v` count: warn, info, debug, trace.
    pub fn for_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };
        Self {
            level,
            thread_ids: verbosity >= 3,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }
}

/// Filter from the explicit directive, then `RUST_LOG`, then the level.
fn build_filter(config: &LogConfig) -> EnvFilter {
    let fallback = || EnvFilter::new(config.level.to_string());
    match &config.filter {
        Some(custom) => EnvFilter::try_new(custom).unwrap_or_else(|_| fallback()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
    }
}

type BaseLayer =
    fmt::Layer<Registry, fmt::format::DefaultFields, fmt::format::Format, fn() -> io::Stderr>;
type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn base_layer(config: &LogConfig) -> BaseLayer {
    fmt::layer()
        .with_writer(io::stderr as fn() -> io::Stderr)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_thread_ids(config.thread_ids)
}

fn format_layer(config: &LogConfig) -> BoxedLayer {
    let base = base_layer(config);
    match (config.format, config.timestamps) {
        (LogFormat::Json, true) => base.json().boxed(),
        (LogFormat::Json, false) => base.json().without_time().boxed(),
        (LogFormat::Pretty, true) => base.pretty().boxed(),
        (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => base.compact().boxed(),
        (LogFormat::Compact, false) => base.compact().without_time().boxed(),
    }
}

/// Layer appending to `path`. JSON stays JSON; the other formats are
/// written compact, one record per line.
fn file_layer(config: &LogConfig, path: &Path) -> io::Result<BoxedLayer> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_thread_ids(config.thread_ids);
    Ok(match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty | LogFormat::Compact => layer.compact().boxed(),
    })
}

/// Console layer plus the file layer, if configured.
fn output_layers(config: &LogConfig) -> io::Result<BoxedLayer> {
    let console = format_layer(config);
    Ok(match &config.file {
        Some(path) => console.and_then(file_layer(config, path)?).boxed(),
        None => console,
    })
}

/// Initialize the global logging subscriber.
///
/// This should be called once at application startup. Returns `Ok(false)` if
/// a global subscriber was already installed, in which case nothing changes,
/// and an error if the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<bool> {
    let layers = output_layers(config)?;
    Ok(tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(config))
        .try_init()
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(format!("{}", LogLevel::Debug), "debug");
        assert_eq!(format!("{}", LogLevel::Info), "info");
        assert_eq!(format!("{}", LogLevel::Error), "error");
        assert!(LogLevel::Trace < LogLevel::Warn);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("xml"));
    }

    #[test]
    fn test_config_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.level, LogLevel::Debug);
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.source_location);

        let quiet = LogConfig::quiet();
        assert_eq!(quiet.level, LogLevel::Error);
        assert!(!quiet.timestamps);

        assert_eq!(LogConfig::for_verbosity(0).level, LogLevel::Warn);
        assert_eq!(LogConfig::for_verbosity(2).level, LogLevel::Debug);
        assert_eq!(LogConfig::for_verbosity(9).level, LogLevel::Trace);
        assert_eq!(
            LogConfig::for_verbosity(1).with_format(LogFormat::Json).format,
            LogFormat::Json
        );
    }

    #[test]
    fn test_explicit_filter_wins() {
        let config = LogConfig {
            filter: Some("seccap_core=trace".to_string()),
            ..LogConfig::quiet()
        };
        assert_eq!(build_filter(&config).to_string(), "seccap_core=trace");
    }

    #[test]
    fn test_second_init_is_ignored() {
        let config = LogConfig::quiet();
        let first = init_logging(&config).unwrap();
        let second = init_logging(&config).unwrap();
        assert!(!(first && second));
    }

    #[test]
    fn test_file_output() {
        let path = std::env::temp_dir().join(format!("seccap-log-{}.log", std::process::id()));
        std::fs::remove_file(&path).ok();
        let config = LogConfig::quiet().with_file(&path);

        let subscriber = tracing_subscriber::registry().with(output_layers(&config).unwrap());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(iteration = 3, "outer step");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(written.contains("outer step"));
        assert!(written.contains("iteration=3"));
        assert!(!written.contains('\u{1b}'));
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let config = LogConfig::quiet().with_file("/nonexistent/seccap/run.log");
        assert!(output_layers(&config).is_err());
        assert!(init_logging(&config).is_err());
    }
}
