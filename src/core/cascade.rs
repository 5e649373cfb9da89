//! Provider cascade executor.
//!
//! Tries each provider of the cascade in ascending priority order, one at a
//! time, and returns the first successful completion. Failures fall through
//! to the next provider; the same provider is never retried within one call.
//!
//! Side effects on [`ProviderHealth`]:
//! - a model-not-found failure records a warning for that provider;
//! - a total failure records a warning under [`CASCADE_HEALTH_KEY`];
//! - a success clears the provider's warning and the cascade warning.
//!
//! Cancellation stops iteration before the next provider and aborts the
//! in-flight call. Health writes made before cancellation stay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::health::{CASCADE_HEALTH_KEY, HealthWarning, ProviderHealth, WarningKind};
use crate::core::json_mode::parse_json_response;
use crate::core::provider::{AiConfig, ProviderDescriptor};
use crate::error::{GymError, Result};
use crate::providers::{ClientFactory, CompletionClient};

// =============================================================================
// Request / Response
// =============================================================================

/// One cascade invocation.
#[derive(Debug, Clone, Default)]
pub struct CascadeRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Overrides the configured token budget.
    pub max_tokens: Option<u32>,
    /// Explicit provider list used instead of the configured routing.
    pub cascade: Option<Vec<ProviderDescriptor>>,
}

impl CascadeRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn with_cascade(mut self, cascade: Vec<ProviderDescriptor>) -> Self {
        self.cascade = Some(cascade);
        self
    }
}

/// Record of one provider call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeAttempt {
    pub provider_id: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A successful completion and the attempts that led to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResponse {
    pub text: String,
    pub provider_id: String,
    pub model: String,
    pub attempts: Vec<CascadeAttempt>,
}

/// A parsed JSON-mode completion.
#[derive(Debug, Clone)]
pub struct JsonResponse<T> {
    pub value: T,
    pub provider_id: String,
    pub model: String,
}

// =============================================================================
// Classification
// =============================================================================

/// Map a raw provider error onto the cascade taxonomy.
///
/// HTTP 404 and "not found" messages become [`GymError::ModelUnavailable`];
/// timeouts stay timeouts; everything else is a [`GymError::ProviderCallFailed`].
#[must_use]
pub fn classify_failure(error: GymError, descriptor: &ProviderDescriptor) -> GymError {
    match error {
        GymError::ProviderCallFailed {
            status_code,
            message,
            ..
        } if status_code == Some(404) || message.to_lowercase().contains("not found") => {
            GymError::ModelUnavailable {
                provider: descriptor.provider_id.clone(),
                model: descriptor.model.clone(),
                message,
            }
        }
        e @ (GymError::ProviderCallFailed { .. }
        | GymError::ModelUnavailable { .. }
        | GymError::ProviderTimeout { .. }
        | GymError::Cancelled) => e,
        other => {
            let message = other.to_string();
            if message.to_lowercase().contains("not found") {
                GymError::ModelUnavailable {
                    provider: descriptor.provider_id.clone(),
                    model: descriptor.model.clone(),
                    message,
                }
            } else {
                GymError::ProviderCallFailed {
                    provider: descriptor.provider_id.clone(),
                    model: descriptor.model.clone(),
                    status_code: None,
                    message,
                }
            }
        }
    }
}

// =============================================================================
// Cascade
// =============================================================================

/// Ordered-fallback executor over the configured providers.
#[derive(Clone)]
pub struct Cascade {
    config: AiConfig,
    health: ProviderHealth,
    factory: Arc<dyn ClientFactory>,
}

impl Cascade {
    #[must_use]
    pub fn new(config: AiConfig, health: ProviderHealth, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            config,
            health,
            factory,
        }
    }

    #[must_use]
    pub const fn health(&self) -> &ProviderHealth {
        &self.health
    }

    #[must_use]
    pub const fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Providers that a request would try, in order.
    ///
    /// # Errors
    /// Returns an error if the configured routing is invalid.
    pub fn providers(&self, request: &CascadeRequest) -> Result<Vec<ProviderDescriptor>> {
        match &request.cascade {
            Some(explicit) => {
                let mut list: Vec<_> = explicit.iter().filter(|d| d.enabled).cloned().collect();
                list.sort_by(|a, b| a.priority.total_cmp(&b.priority));
                Ok(list)
            }
            None => self.config.build_cascade(),
        }
    }

    /// Run the cascade and return the first successful completion.
    ///
    /// # Errors
    /// - [`GymError::NoProvidersConfigured`] if no provider could be called.
    /// - [`GymError::AllProvidersFailed`] if every called provider failed.
    /// - [`GymError::Cancelled`] if `cancel` fired first.
    pub async fn generate(
        &self,
        request: &CascadeRequest,
        cancel: &CancellationToken,
    ) -> Result<CascadeResponse> {
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);
        self.run(request, max_tokens, cancel).await
    }

    /// Run the cascade in JSON mode and parse the answer into `T`.
    ///
    /// # Errors
    /// Everything [`Cascade::generate`] returns, plus
    /// [`GymError::ResponseParseFailed`] when the answer is not valid JSON.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        request: &CascadeRequest,
        cancel: &CancellationToken,
    ) -> Result<JsonResponse<T>> {
        let max_tokens = request.max_tokens.unwrap_or(self.config.json_max_tokens);
        let response = self.run(request, max_tokens, cancel).await?;
        let value = parse_json_response(&response.text).inspect_err(|e| {
            warn!(
                provider = %response.provider_id,
                model = %response.model,
                error = %e,
                "Provider answered with malformed JSON"
            );
        })?;
        Ok(JsonResponse {
            value,
            provider_id: response.provider_id,
            model: response.model,
        })
    }

    async fn run(
        &self,
        request: &CascadeRequest,
        max_tokens: u32,
        cancel: &CancellationToken,
    ) -> Result<CascadeResponse> {
        let providers = self.providers(request)?;
        let mut attempts = Vec::new();
        let mut failures = Vec::new();

        for descriptor in &providers {
            if cancel.is_cancelled() {
                info!(provider = %descriptor.provider_id, "Cascade cancelled");
                return Err(GymError::Cancelled);
            }

            let client = match self.factory.create(descriptor) {
                Ok(client) => client,
                Err(GymError::EnvVarMissing { name }) => {
                    debug!(
                        provider = %descriptor.provider_id,
                        env = %name,
                        "No credentials, skipping provider"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(provider = %descriptor.provider_id, error = %e, "Provider client unavailable");
                    failures.push(format!("{}: {e}", descriptor.provider_id));
                    continue;
                }
            };

            info!(
                provider = %descriptor.provider_id,
                model = %descriptor.model,
                priority = descriptor.priority,
                "Trying provider"
            );

            let started_at = Utc::now();
            let start = Instant::now();
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(provider = %descriptor.provider_id, "Cascade cancelled mid-call");
                    return Err(GymError::Cancelled);
                }
                r = call_with_timeout(client.as_ref(), descriptor, request, max_tokens) => r,
            };
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(text) => {
                    attempts.push(CascadeAttempt {
                        provider_id: descriptor.provider_id.clone(),
                        model: descriptor.model.clone(),
                        started_at,
                        duration_ms,
                        success: true,
                        error: None,
                    });
                    info!(
                        provider = %descriptor.provider_id,
                        model = %descriptor.model,
                        duration_ms,
                        "Provider succeeded"
                    );
                    self.health.clear(&descriptor.provider_id);
                    self.health.clear(CASCADE_HEALTH_KEY);
                    return Ok(CascadeResponse {
                        text,
                        provider_id: descriptor.provider_id.clone(),
                        model: descriptor.model.clone(),
                        attempts,
                    });
                }
                Err(e) => {
                    let e = classify_failure(e, descriptor);
                    warn!(
                        provider = %descriptor.provider_id,
                        model = %descriptor.model,
                        duration_ms,
                        code = e.error_code(),
                        error = %e,
                        "Provider failed"
                    );
                    if let GymError::ModelUnavailable { message, .. } = &e {
                        self.health.set(HealthWarning::new(
                            descriptor.provider_id.clone(),
                            Some(descriptor.model.clone()),
                            format!(
                                "Model '{}' is not available on {}: {message}",
                                descriptor.model, descriptor.provider_id
                            ),
                            WarningKind::ModelUnavailable,
                        ));
                    }
                    attempts.push(CascadeAttempt {
                        provider_id: descriptor.provider_id.clone(),
                        model: descriptor.model.clone(),
                        started_at,
                        duration_ms,
                        success: false,
                        error: Some(e.to_string()),
                    });
                    failures.push(format!("{} ({}): {e}", descriptor.provider_id, descriptor.model));
                }
            }
        }

        // One entry per provider that was tried, so an empty list means every
        // provider was skipped.
        let error = if failures.is_empty() {
            GymError::NoProvidersConfigured
        } else {
            GymError::AllProvidersFailed {
                attempted: failures.len(),
                failures,
            }
        };
        warn!(error = %error, "Cascade exhausted");
        self.health.set(HealthWarning::new(
            CASCADE_HEALTH_KEY,
            None,
            exhausted_message(&error),
            WarningKind::AllProvidersFailed,
        ));
        Err(error)
    }
}

async fn call_with_timeout(
    client: &dyn CompletionClient,
    descriptor: &ProviderDescriptor,
    request: &CascadeRequest,
    max_tokens: u32,
) -> Result<String> {
    let call = client.complete(&request.prompt, request.system_prompt.as_deref(), max_tokens);
    match descriptor.timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), call)
            .await
            .unwrap_or_else(|_| {
                Err(GymError::ProviderTimeout {
                    provider: descriptor.provider_id.clone(),
                    model: descriptor.model.clone(),
                    timeout_ms: ms,
                })
            }),
        None => call.await,
    }
}

fn exhausted_message(error: &GymError) -> String {
    match error {
        GymError::AllProvidersFailed { failures, .. } => {
            format!(
                "AI grading is unavailable: {}. Configure a backup provider.",
                failures.join("; ")
            )
        }
        _ => "AI grading is unavailable: no provider has credentials. \
              Set an API key or start Ollama."
            .to_string(),
    }
}
