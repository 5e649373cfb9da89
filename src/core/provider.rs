//! AI provider descriptors and cascade construction.
//!
//! The routing table lists the built-in providers with their priorities.
//! Custom OpenAI-compatible providers are inserted between built-in bands.
//! [`AiConfig::build_cascade`] merges both, drops disabled entries, and sorts
//! by ascending priority.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GymError, Result};

// =============================================================================
// Provider Kind
// =============================================================================

/// Closed set of provider call conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    /// User-configured OpenAI-compatible endpoint.
    Custom,
    /// Local Ollama runtime.
    Ollama,
}

impl ProviderKind {
    /// Built-in kinds in default routing order.
    pub const BUILTIN: &'static [Self] = &[Self::Gemini, Self::Anthropic, Self::OpenAi, Self::Ollama];

    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Custom => "custom",
            Self::Ollama => "ollama",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::Anthropic => "Anthropic",
            Self::OpenAi => "OpenAI",
            Self::Custom => "Custom",
            Self::Ollama => "Ollama",
        }
    }

    /// Parse a built-in provider name.
    ///
    /// # Errors
    /// Returns [`GymError::InvalidProvider`] for unknown names and for
    /// `custom`, which is only declared through `[[ai.custom_providers]]`.
    pub fn from_cli_name(name: &str) -> Result<Self> {
        let lower = name.to_lowercase();
        Self::BUILTIN
            .iter()
            .find(|k| k.cli_name() == lower)
            .copied()
            .ok_or_else(|| GymError::InvalidProvider(name.to_string()))
    }

    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Ollama)
    }

    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::OpenAi | Self::Custom => "gpt-4o-mini",
            Self::Ollama => "llama3.2",
        }
    }

    #[must_use]
    pub const fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("https://generativelanguage.googleapis.com/v1beta"),
            Self::Anthropic => Some("https://api.anthropic.com/v1"),
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::Ollama => Some("http://localhost:11434"),
            Self::Custom => None,
        }
    }

    /// Environment variable holding the API key, if the kind needs one.
    #[must_use]
    pub const fn default_api_key_env(self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Custom | Self::Ollama => None,
        }
    }

    /// Priority in the default routing table.
    #[must_use]
    pub const fn default_priority(self) -> f64 {
        match self {
            Self::Gemini => 1.0,
            Self::Anthropic => 2.0,
            Self::OpenAi => 3.0,
            Self::Ollama => 4.0,
            Self::Custom => 3.5,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

// =============================================================================
// Provider Descriptor
// =============================================================================

/// One entry of a built cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub provider_id: String,
    pub kind: ProviderKind,
    pub model: String,
    pub priority: f64,
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl ProviderDescriptor {
    /// Descriptor for a built-in kind with its defaults.
    #[must_use]
    pub fn builtin(kind: ProviderKind) -> Self {
        Self {
            provider_id: kind.cli_name().to_string(),
            kind,
            model: kind.default_model().to_string(),
            priority: kind.default_priority(),
            enabled: true,
            timeout_ms: None,
            base_url: None,
            api_key_env: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self.kind, ProviderKind::Custom)
    }

    /// Base URL, falling back to the kind's default.
    #[must_use]
    pub fn resolved_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .or_else(|| self.kind.default_base_url())
    }

    /// API key variable, falling back to the kind's default.
    #[must_use]
    pub fn resolved_api_key_env(&self) -> Option<&str> {
        self.api_key_env
            .as_deref()
            .or_else(|| self.kind.default_api_key_env())
    }
}

// =============================================================================
// Configuration Entries
// =============================================================================

/// A `[[ai.routing]]` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl RoutingEntry {
    #[must_use]
    pub const fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: None,
            priority: None,
            enabled: true,
            timeout_ms: None,
            base_url: None,
            api_key_env: None,
        }
    }

    fn to_descriptor(&self) -> ProviderDescriptor {
        let mut d = ProviderDescriptor::builtin(self.provider);
        if let Some(model) = &self.model {
            d.model.clone_from(model);
        }
        if let Some(priority) = self.priority {
            d.priority = priority;
        }
        d.enabled = self.enabled;
        d.timeout_ms = self.timeout_ms;
        d.base_url.clone_from(&self.base_url);
        d.api_key_env.clone_from(&self.api_key_env);
        d
    }
}

/// A `[[ai.custom_providers]]` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProviderEntry {
    pub id: String,
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl CustomProviderEntry {
    #[must_use]
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            model: model.into(),
            api_key_env: None,
            priority: None,
            enabled: true,
            timeout_ms: None,
        }
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn to_descriptor(&self, default_priority: f64) -> ProviderDescriptor {
        ProviderDescriptor {
            provider_id: format!("custom:{}", self.id),
            kind: ProviderKind::Custom,
            model: self.model.clone(),
            priority: self.priority.unwrap_or(default_priority),
            enabled: self.enabled,
            timeout_ms: self.timeout_ms,
            base_url: Some(self.base_url.clone()),
            api_key_env: self.api_key_env.clone(),
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Default token budget for plain completions.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Default token budget for JSON-mode completions.
pub const DEFAULT_JSON_MAX_TOKENS: u32 = 16384;

/// The `[ai]` section: routing table, custom providers, and budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub max_tokens: u32,
    pub json_max_tokens: u32,
    /// Timeout applied to providers that do not set their own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub routing: Vec<RoutingEntry>,
    pub custom_providers: Vec<CustomProviderEntry>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            json_max_tokens: DEFAULT_JSON_MAX_TOKENS,
            timeout_ms: None,
            routing: ProviderKind::BUILTIN
                .iter()
                .map(|&k| RoutingEntry::new(k))
                .collect(),
            custom_providers: Vec::new(),
        }
    }
}

impl AiConfig {
    /// Resolved built-in descriptors, including disabled ones.
    ///
    /// # Errors
    /// Returns an error if a routing row names the `custom` kind.
    pub fn builtin_descriptors(&self) -> Result<Vec<ProviderDescriptor>> {
        self.routing
            .iter()
            .map(|entry| {
                if entry.provider == ProviderKind::Custom {
                    return Err(GymError::ConfigInvalid {
                        key: "ai.routing.provider".to_string(),
                        value: "custom".to_string(),
                        message: "declare custom providers under [[ai.custom_providers]]"
                            .to_string(),
                    });
                }
                let mut d = entry.to_descriptor();
                if d.timeout_ms.is_none() {
                    d.timeout_ms = self.timeout_ms;
                }
                Ok(d)
            })
            .collect()
    }

    /// Resolved custom descriptors, including disabled ones.
    ///
    /// # Errors
    /// Returns an error if the routing table is invalid.
    pub fn custom_descriptors(&self) -> Result<Vec<ProviderDescriptor>> {
        let builtins = self.builtin_descriptors()?;
        let default_priority = default_custom_priority(&builtins);
        Ok(self
            .custom_providers
            .iter()
            .map(|entry| {
                let mut d = entry.to_descriptor(default_priority);
                if d.timeout_ms.is_none() {
                    d.timeout_ms = self.timeout_ms;
                }
                d
            })
            .collect())
    }

    /// Build the ordered cascade from this config.
    ///
    /// # Errors
    /// Returns an error if the routing table or custom providers are invalid.
    pub fn build_cascade(&self) -> Result<Vec<ProviderDescriptor>> {
        build_cascade(&self.builtin_descriptors()?, &self.custom_descriptors()?)
    }
}

// =============================================================================
// Cascade Construction
// =============================================================================

/// Priority for a custom provider that does not set one.
///
/// The midpoint of the band gap just before the local runtime, or of the
/// last gap when there is no local runtime. Built-ins count whether or not
/// they are enabled.
#[must_use]
pub fn default_custom_priority(builtins: &[ProviderDescriptor]) -> f64 {
    let bands = builtin_bands(builtins);
    let upper = builtins
        .iter()
        .find(|d| d.kind.is_local())
        .and_then(|local| bands.iter().position(|&p| p == local.priority))
        .filter(|&i| i > 0)
        .unwrap_or_else(|| bands.len().saturating_sub(1));
    if upper == 0 {
        return ProviderKind::Custom.default_priority();
    }
    (bands[upper - 1] + bands[upper]) / 2.0
}

/// Distinct finite built-in priorities, ascending.
fn builtin_bands(builtins: &[ProviderDescriptor]) -> Vec<f64> {
    let mut bands: Vec<f64> = builtins
        .iter()
        .map(|d| d.priority)
        .filter(|p| p.is_finite())
        .collect();
    bands.sort_by(f64::total_cmp);
    bands.dedup();
    bands
}

/// Merge built-in and custom providers into one ordered cascade.
///
/// Disabled entries are removed entirely. The result is sorted by ascending
/// priority; equal built-in priorities keep their table order.
///
/// # Errors
/// Returns [`GymError::ConfigInvalid`] when a priority is not finite, a
/// custom priority is not strictly inside the built-in range or equals a
/// built-in band, or two entries share an id.
pub fn build_cascade(
    builtins: &[ProviderDescriptor],
    custom: &[ProviderDescriptor],
) -> Result<Vec<ProviderDescriptor>> {
    let mut seen = HashSet::new();
    for d in builtins.iter().chain(custom) {
        if !d.priority.is_finite() {
            return Err(GymError::ConfigInvalid {
                key: format!("{}.priority", d.provider_id),
                value: d.priority.to_string(),
                message: "priority must be a finite number".to_string(),
            });
        }
        if !seen.insert(d.provider_id.as_str()) {
            return Err(GymError::ConfigInvalid {
                key: "provider_id".to_string(),
                value: d.provider_id.clone(),
                message: "provider ids must be unique".to_string(),
            });
        }
    }

    let bands = builtin_bands(builtins);
    let inside = |p: f64| match (bands.first(), bands.last()) {
        (Some(&lo), Some(&hi)) => p > lo && p < hi && !bands.contains(&p),
        _ => false,
    };
    for c in custom {
        if !inside(c.priority) {
            return Err(GymError::ConfigInvalid {
                key: format!("{}.priority", c.provider_id),
                value: c.priority.to_string(),
                message: "custom providers must sit strictly between built-in priorities"
                    .to_string(),
            });
        }
    }

    let mut cascade: Vec<ProviderDescriptor> = builtins
        .iter()
        .chain(custom)
        .filter(|d| d.enabled)
        .cloned()
        .collect();
    cascade.sort_by(|a, b| a.priority.total_cmp(&b.priority));
    Ok(cascade)
}
