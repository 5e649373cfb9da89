//! Error types for studygym.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Provider**: A single AI backend failed, or the whole cascade did
//! - **Response**: A provider answered but the payload was unusable
//! - **Configuration**: Config file parsing, validation, or missing values
//! - **Storage**: Progress database access
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `GYM-P001`) for programmatic handling.
//!
//! ## Fix Suggestions
//!
//! Each error type can provide actionable fix suggestions via the
//! [`GymError::fix_suggestions()`] method.

pub mod suggestions;

use thiserror::Error;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Provider call failures (HTTP errors, unknown models, timeouts).
    Provider,
    /// A provider answered but the content could not be used.
    Response,
    /// Configuration issues (parse errors, invalid values, missing keys).
    Configuration,
    /// Progress database issues.
    Storage,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Provider => "Provider error",
            Self::Response => "Response error",
            Self::Configuration => "Configuration error",
            Self::Storage => "Storage error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Provider => "P",
            Self::Response => "R",
            Self::Configuration => "C",
            Self::Storage => "S",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the `gym` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Every configured AI provider failed
    ProvidersExhausted = 2,
    /// Parse/config errors
    ParseError = 3,
    /// Timeout or cancellation
    Interrupted = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for studygym operations.
///
/// Each variant has:
/// - A stable error code (e.g., `GYM-P001`)
/// - A category for classification
/// - A transient flag telling the cascade whether the failure is worth
///   surfacing to the user
#[derive(Error, Debug)]
pub enum GymError {
    // ==========================================================================
    // Provider errors (Category: Provider)
    // ==========================================================================
    /// Network or HTTP error from a single provider.
    #[error("provider {provider} ({model}) call failed: {message}")]
    ProviderCallFailed {
        provider: String,
        model: String,
        status_code: Option<u16>,
        message: String,
    },

    /// The configured model does not exist on the provider.
    #[error("model {model} is not available on {provider}: {message}")]
    ModelUnavailable {
        provider: String,
        model: String,
        message: String,
    },

    /// A provider exceeded its configured timeout.
    #[error("provider {provider} ({model}) timed out after {timeout_ms}ms")]
    ProviderTimeout {
        provider: String,
        model: String,
        timeout_ms: u64,
    },

    /// Every provider in the cascade failed.
    #[error("all {attempted} AI provider(s) failed")]
    AllProvidersFailed {
        attempted: usize,
        failures: Vec<String>,
    },

    /// The cascade was empty after filtering.
    #[error("no AI providers are configured")]
    NoProvidersConfigured,

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    // ==========================================================================
    // Response errors (Category: Response)
    // ==========================================================================
    /// JSON-mode response was not valid JSON after fence stripping.
    #[error("failed to parse AI response as JSON: {message}")]
    ResponseParseFailed { message: String, snippet: String },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Required API key variable is not set.
    #[error("environment variable not set: {name}")]
    EnvVarMissing { name: String },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown provider name.
    #[error("invalid provider: {0}")]
    InvalidProvider(String),

    // ==========================================================================
    // Storage errors (Category: Storage)
    // ==========================================================================
    /// Explicit lookup of a skill that has never been practised.
    #[error("no progress recorded for skill: {0}")]
    SkillNotFound(String),

    /// Progress database failure.
    #[error("progress database error: {0}")]
    Database(String),

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GymError {
    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::AllProvidersFailed { .. } | Self::NoProvidersConfigured => {
                ExitCode::ProvidersExhausted
            }

            Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_)
            | Self::InvalidProvider(_)
            | Self::EnvVarMissing { .. }
            | Self::ResponseParseFailed { .. } => ExitCode::ParseError,

            Self::ProviderTimeout { .. } | Self::Cancelled => ExitCode::Interrupted,

            Self::ProviderCallFailed { .. }
            | Self::ModelUnavailable { .. }
            | Self::SkillNotFound(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderCallFailed { .. }
            | Self::ModelUnavailable { .. }
            | Self::ProviderTimeout { .. }
            | Self::AllProvidersFailed { .. }
            | Self::NoProvidersConfigured
            | Self::Cancelled => ErrorCategory::Provider,

            Self::ResponseParseFailed { .. } => ErrorCategory::Response,

            Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::EnvVarMissing { .. }
            | Self::Config(_)
            | Self::InvalidProvider(_) => ErrorCategory::Configuration,

            Self::SkillNotFound(_) | Self::Database(_) => ErrorCategory::Storage,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `GYM-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ProviderCallFailed { .. } => "GYM-P001",
            Self::ModelUnavailable { .. } => "GYM-P002",
            Self::ProviderTimeout { .. } => "GYM-P003",
            Self::AllProvidersFailed { .. } => "GYM-P010",
            Self::NoProvidersConfigured => "GYM-P011",
            Self::Cancelled => "GYM-P020",

            Self::ResponseParseFailed { .. } => "GYM-R001",

            Self::ConfigParse { .. } => "GYM-C001",
            Self::ConfigInvalid { .. } => "GYM-C002",
            Self::EnvVarMissing { .. } => "GYM-C003",
            Self::Config(_) => "GYM-C004",
            Self::InvalidProvider(_) => "GYM-C010",

            Self::SkillNotFound(_) => "GYM-S001",
            Self::Database(_) => "GYM-S002",

            Self::Io(_) => "GYM-X001",
            Self::Json(_) => "GYM-X002",
            Self::Other(_) => "GYM-X099",
        }
    }

    /// Whether this failure is transient.
    ///
    /// Transient failures fall through the cascade silently; permanent ones
    /// also fall through but leave a health warning behind.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProviderCallFailed { .. } | Self::ProviderTimeout { .. }
        )
    }

    /// Returns the provider id if this error is provider-specific.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderCallFailed { provider, .. }
            | Self::ModelUnavailable { provider, .. }
            | Self::ProviderTimeout { provider, .. } => Some(provider),
            Self::InvalidProvider(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the model name if this error is model-specific.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::ProviderCallFailed { model, .. }
            | Self::ModelUnavailable { model, .. }
            | Self::ProviderTimeout { model, .. } => Some(model),
            _ => None,
        }
    }

    /// Returns actionable fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::ProviderCallFailed {
                provider,
                status_code,
                message,
                ..
            } => suggestions::provider_call_failed_suggestions(provider, *status_code, message),
            Self::ModelUnavailable {
                provider, model, ..
            } => suggestions::model_unavailable_suggestions(provider, model),
            Self::ProviderTimeout {
                provider,
                timeout_ms,
                ..
            } => suggestions::timeout_suggestions(provider, *timeout_ms),
            Self::AllProvidersFailed { .. } | Self::NoProvidersConfigured => {
                suggestions::no_backup_provider_suggestions()
            }
            Self::Cancelled => Vec::new(),
            Self::ResponseParseFailed { .. } => vec![FixSuggestion::new(
                vec!["gym providers".to_string()],
                "The model answered with malformed or truncated JSON. \
                 Try again, or move a stronger model to the front of the routing table.",
            )],
            Self::ConfigParse { path, message } => {
                suggestions::config_parse_suggestions(path, message)
            }
            Self::ConfigInvalid { key, value, message } => {
                suggestions::config_invalid_suggestions(key, value, message)
            }
            Self::EnvVarMissing { name } => suggestions::env_var_missing_suggestions(name),
            Self::Config(msg) => vec![FixSuggestion::new(
                vec!["gym providers".to_string()],
                format!("Configuration error: {msg}"),
            )],
            Self::InvalidProvider(name) => suggestions::invalid_provider_suggestions(name),
            Self::SkillNotFound(skill) => vec![FixSuggestion::new(
                vec!["gym status".to_string()],
                format!("Skill '{skill}' has no recorded attempts yet."),
            )],
            Self::Database(msg) => vec![FixSuggestion::new(
                vec!["# Check permissions on the data directory".to_string()],
                format!("Progress database error: {msg}"),
            )],
            Self::Io(err) => vec![FixSuggestion::new(
                vec!["# Check file permissions and disk space".to_string()],
                format!("I/O error: {err}."),
            )],
            Self::Json(err) => vec![FixSuggestion::new(
                Vec::new(),
                format!("JSON error: {err}. The data may be corrupted."),
            )],
            Self::Other(err) => vec![FixSuggestion::new(
                Vec::new(),
                format!("Unexpected error: {err}. Please report this issue."),
            )],
        }
    }
}

impl From<rusqlite::Error> for GymError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for studygym operations.
pub type Result<T> = std::result::Result<T, GymError>;

// =============================================================================
// Tests
// =============================================================================
