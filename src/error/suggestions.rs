//! Fix suggestion database for studygym errors.
//!
//! Provides actionable fix suggestions mapped to specific error types,
//! including commands, context explanations, and prevention tips.

// =============================================================================
// Fix Suggestion Types
// =============================================================================

/// A fix suggestion for an error.
#[derive(Debug, Clone)]
pub struct FixSuggestion {
    /// Commands to try, in order of preference. Copy-paste ready.
    pub commands: Vec<String>,

    /// Why this error occurred.
    pub context: String,

    /// How to keep it from happening again.
    pub prevention: Option<String>,

    /// Link to documentation for more information.
    pub doc_url: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
            doc_url: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }

    /// Builder: adds documentation URL.
    #[must_use]
    pub fn with_doc_url(mut self, url: impl Into<String>) -> Self {
        self.doc_url = Some(url.into());
        self
    }
}

/// Returns the API-key documentation page for a built-in provider.
#[must_use]
pub fn api_key_doc_for_provider(provider: &str) -> Option<String> {
    match provider.to_lowercase().as_str() {
        "gemini" => Some("https://aistudio.google.com/app/apikey".to_string()),
        "anthropic" => Some("https://console.anthropic.com/settings/keys".to_string()),
        "openai" => Some("https://platform.openai.com/api-keys".to_string()),
        "ollama" => Some("https://ollama.com/download".to_string()),
        _ => None,
    }
}

// =============================================================================
// Suggestion Generators
// =============================================================================

/// Suggestions for a single failed provider call.
#[must_use]
pub fn provider_call_failed_suggestions(
    provider: &str,
    status_code: Option<u16>,
    message: &str,
) -> Vec<FixSuggestion> {
    let hint = match status_code {
        Some(401 | 403) => "The API key was rejected. Check that it is current.",
        Some(429) => "The provider is rate limiting requests. Wait a minute and retry.",
        Some(code) if code >= 500 => "The provider is having trouble on its side.",
        _ => "The request did not complete.",
    };
    let mut suggestion = FixSuggestion::new(
        vec!["gym providers".to_string()],
        format!("{provider} failed: {message}. {hint}"),
    );
    if let Some(url) = api_key_doc_for_provider(provider) {
        suggestion = suggestion.with_doc_url(url);
    }
    vec![suggestion]
}

/// Suggestions when the configured model no longer exists.
#[must_use]
pub fn model_unavailable_suggestions(provider: &str, model: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                "$EDITOR ~/.config/studygym/config.toml".to_string(),
                "gym providers".to_string(),
            ],
            format!(
                "{provider} does not know the model '{model}'. It may have been renamed \
                 or retired. Update the [[ai.routing]] entry for {provider}."
            ),
        )
        .with_prevention("Pin models that the provider lists as stable."),
    ]
}

/// Suggestions for a provider that exceeded its timeout.
#[must_use]
pub fn timeout_suggestions(provider: &str, timeout_ms: u64) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![format!("GYM_TIMEOUT_MS={} gym generate <skill>", timeout_ms * 2)],
            format!("{provider} did not respond within {timeout_ms}ms."),
        )
        .with_prevention(
            "Raise `timeout_ms` for this provider in the routing table, or move it \
             further down the cascade.",
        ),
    ]
}

/// Suggestions when nothing in the cascade could answer.
#[must_use]
pub fn no_backup_provider_suggestions() -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                "export GEMINI_API_KEY=...".to_string(),
                "ollama serve".to_string(),
                "gym providers".to_string(),
            ],
            "No AI provider answered. Practice continues, but answers will not be \
             graded automatically.",
        )
        .with_prevention(
            "Configure a backup provider (a second API key or a local Ollama model) \
             so one outage does not stop grading.",
        ),
    ]
}

/// Suggestions for TOML syntax errors.
#[must_use]
pub fn config_parse_suggestions(path: &str, message: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![format!("$EDITOR {path}")],
            format!("The config file has a syntax error. The TOML parser reported: {message}"),
        )
        .with_prevention("Use a TOML-aware editor with syntax highlighting."),
    ]
}

/// Suggestions for a config value that parsed but is not allowed.
#[must_use]
pub fn config_invalid_suggestions(key: &str, value: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["gym providers".to_string()],
        format!("Invalid config value for '{key}': '{value}'. {message}"),
    )]
}

/// Suggestions for a missing environment variable.
#[must_use]
pub fn env_var_missing_suggestions(name: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("export {name}=<value>")],
        format!("The environment variable {name} is required but not set."),
    )]
}

/// Suggestions for an unknown provider name.
#[must_use]
pub fn invalid_provider_suggestions(name: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["gym providers".to_string()],
        format!(
            "'{name}' is not a known provider. Use one of: gemini, anthropic, openai, \
             ollama, or declare it under [[ai.custom_providers]]."
        ),
    )]
}

// =============================================================================
// Tests
// =============================================================================
