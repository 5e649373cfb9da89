//! Diagnostic logging to stderr or a file.
//!
//! Log lines never go to stdout, which is reserved for command output.
//! Settings come from CLI flags first, then `GYM_LOG`, `GYM_LOG_FORMAT` and
//! `GYM_LOG_FILE`. `RUST_LOG` overrides the computed filter entirely.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::util::env::non_empty_var;

pub const LOG_LEVEL_ENV: &str = "GYM_LOG";
pub const LOG_FORMAT_ENV: &str = "GYM_LOG_FORMAT";
pub const LOG_FILE_ENV: &str = "GYM_LOG_FILE";

/// Crate name as it appears in tracing targets.
const TARGET: &str = "studygym";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Json,
    Compact,
}

impl LogFormat {
    /// Parse case-insensitively.
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" | "pretty" => Some(Self::Human),
            "json" | "jsonl" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Verbosity requested on the command line or in `GYM_LOG`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" | "verbose" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "off" | "none" | "quiet" => Some(Self::Off),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }

    /// `None` for [`LogLevel::Off`].
    #[must_use]
    pub const fn as_tracing_level(self) -> Option<Level> {
        match self {
            Self::Trace => Some(Level::TRACE),
            Self::Debug => Some(Level::DEBUG),
            Self::Info => Some(Level::INFO),
            Self::Warn => Some(Level::WARN),
            Self::Error => Some(Level::ERROR),
            Self::Off => None,
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// Merge CLI values over the environment.
    ///
    /// `verbose` raises the default level to debug but never lowers an
    /// explicit choice.
    #[must_use]
    pub fn resolve(
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
        cli_file: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        let explicit = cli_level.or_else(level_from_env);
        let level = match explicit {
            Some(level) => level,
            None if verbose => LogLevel::Debug,
            None => LogLevel::default(),
        };
        Self {
            level,
            format: cli_format.or_else(format_from_env).unwrap_or_default(),
            file: cli_file.or_else(file_from_env),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{TARGET}={}", self.level.as_filter())))
    }
}

#[must_use]
pub fn level_from_env() -> Option<LogLevel> {
    non_empty_var(LOG_LEVEL_ENV).and_then(|v| LogLevel::from_arg(&v))
}

#[must_use]
pub fn format_from_env() -> Option<LogFormat> {
    non_empty_var(LOG_FORMAT_ENV).and_then(|v| LogFormat::from_arg(&v))
}

#[must_use]
pub fn file_from_env() -> Option<PathBuf> {
    non_empty_var(LOG_FILE_ENV).map(PathBuf::from)
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

fn writer(file: Option<File>) -> BoxMakeWriter {
    match file {
        Some(file) => BoxMakeWriter::new(file),
        None => BoxMakeWriter::new(std::io::stderr),
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// An unopenable log file falls back to stderr.
pub fn init(settings: &LogSettings) {
    let file = settings.file.as_deref().and_then(open_log_file);
    let to_file = file.is_some();
    let filter = settings.filter();
    let writer = writer(file);

    match settings.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(writer)
                .with_span_events(FmtSpan::CLOSE)
                .try_init()
                .ok();
        }
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .with_writer(writer)
                .with_ansi(!to_file)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(!to_file)
                .with_target(false)
                .without_time()
                .try_init()
                .ok();
        }
    }
}
