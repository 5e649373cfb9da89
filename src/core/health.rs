//! Provider health status.
//!
//! [`ProviderHealth`] holds the last warning recorded for each provider during
//! one run. It is never persisted: every process starts with empty state. The
//! cascade writes to it and clears a provider's warning when that provider
//! answers again. It is a cheap clonable handle, so one instance can be shared
//! by every cascade created during a run.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key under which whole-cascade failures are recorded.
pub const CASCADE_HEALTH_KEY: &str = "cascade";

/// What kind of problem a warning describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The configured model does not exist on the provider.
    ModelUnavailable,
    /// No provider in the cascade answered.
    AllProvidersFailed,
}

/// A dismissible notice about one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthWarning {
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub message: String,
    pub kind: WarningKind,
    pub recorded_at: DateTime<Utc>,
}

impl HealthWarning {
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        model: Option<String>,
        message: impl Into<String>,
        kind: WarningKind,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            model,
            message: message.into(),
            kind,
            recorded_at: Utc::now(),
        }
    }
}

/// Shared, clearable provider health state.
#[derive(Debug, Clone, Default)]
pub struct ProviderHealth {
    warnings: Arc<RwLock<BTreeMap<String, HealthWarning>>>,
}

impl ProviderHealth {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, provider_id: &str) -> Option<HealthWarning> {
        self.warnings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider_id)
            .cloned()
    }

    /// Record a warning, replacing any previous one for the same provider.
    pub fn set(&self, warning: HealthWarning) {
        self.warnings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(warning.provider_id.clone(), warning);
    }

    /// Dismiss one provider's warning. Returns whether one was present.
    pub fn clear(&self, provider_id: &str) -> bool {
        self.warnings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(provider_id)
            .is_some()
    }

    /// Dismiss every warning. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut guard = self.warnings.write().unwrap_or_else(PoisonError::into_inner);
        let n = guard.len();
        guard.clear();
        n
    }

    /// All warnings ordered by provider id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HealthWarning> {
        self.warnings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
