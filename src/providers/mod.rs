//! AI provider clients.
//!
//! Each backend speaks its own wire format; all of them expose the same
//! [`CompletionClient::complete`] capability to the cascade.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::core::http::default_client;
use crate::core::provider::{ProviderDescriptor, ProviderKind};
use crate::error::{GymError, Result};
use crate::util::env::non_empty_var;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Uniform text-completion capability.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete `prompt` and return the model's text.
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
    ) -> Result<String>;
}

/// Builds a client for a cascade entry.
pub trait ClientFactory: Send + Sync {
    /// # Errors
    /// Returns [`GymError::EnvVarMissing`] when the provider's API key is not
    /// set. The cascade skips such providers.
    fn create(&self, descriptor: &ProviderDescriptor) -> Result<Arc<dyn CompletionClient>>;
}

/// Factory producing real HTTP clients, reading API keys from the environment.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: Client,
}

impl HttpClientFactory {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: default_client()?,
        })
    }

    #[must_use]
    pub const fn with_client(http: Client) -> Self {
        Self { http }
    }
}

fn api_key(descriptor: &ProviderDescriptor) -> Result<Option<String>> {
    match descriptor.resolved_api_key_env() {
        Some(name) => non_empty_var(name)
            .map(Some)
            .ok_or_else(|| GymError::EnvVarMissing {
                name: name.to_string(),
            }),
        None => Ok(None),
    }
}

fn base_url(descriptor: &ProviderDescriptor) -> Result<String> {
    descriptor
        .resolved_base_url()
        .map(|u| u.trim_end_matches('/').to_string())
        .ok_or_else(|| GymError::ConfigInvalid {
            key: format!("{}.base_url", descriptor.provider_id),
            value: String::new(),
            message: "a base URL is required".to_string(),
        })
}

fn required(key: Option<String>, descriptor: &ProviderDescriptor) -> Result<String> {
    key.ok_or_else(|| GymError::EnvVarMissing {
        name: format!("{}_API_KEY", descriptor.provider_id.to_uppercase()),
    })
}

impl ClientFactory for HttpClientFactory {
    fn create(&self, descriptor: &ProviderDescriptor) -> Result<Arc<dyn CompletionClient>> {
        let key = api_key(descriptor)?;
        let base = base_url(descriptor)?;
        let id = descriptor.provider_id.clone();
        let model = descriptor.model.clone();
        let http = self.http.clone();

        let client: Arc<dyn CompletionClient> = match descriptor.kind {
            ProviderKind::Gemini => Arc::new(GeminiClient::new(
                http,
                base,
                model,
                required(key, descriptor)?,
                id,
            )),
            ProviderKind::Anthropic => Arc::new(AnthropicClient::new(
                http,
                base,
                model,
                required(key, descriptor)?,
                id,
            )),
            ProviderKind::OpenAi | ProviderKind::Custom => {
                Arc::new(OpenAiClient::new(http, base, model, key, id))
            }
            ProviderKind::Ollama => Arc::new(OllamaClient::new(http, base, model, id)),
        };
        Ok(client)
    }
}

/// Fail with an "empty response" error when a provider returned no text.
pub(crate) fn non_empty_text(text: String, provider: &str, model: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(GymError::ProviderCallFailed {
            provider: provider.to_string(),
            model: model.to_string(),
            status_code: None,
            message: "provider returned an empty response".to_string(),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::CustomProviderEntry;

    #[test]
    fn ollama_needs_no_key() {
        let factory = HttpClientFactory::new().unwrap();
        let d = ProviderDescriptor::builtin(ProviderKind::Ollama);
        assert!(factory.create(&d).is_ok());
    }

    #[test]
    fn missing_key_reports_variable_name() {
        let factory = HttpClientFactory::new().unwrap();
        let mut d = ProviderDescriptor::builtin(ProviderKind::Gemini);
        d.api_key_env = Some("STUDYGYM_TEST_UNSET_KEY_0".to_string());
        match factory.create(&d) {
            Err(GymError::EnvVarMissing { name }) => assert_eq!(name, "STUDYGYM_TEST_UNSET_KEY_0"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected missing key"),
        }
    }

    #[test]
    fn custom_without_key_env_is_keyless() {
        let factory = HttpClientFactory::new().unwrap();
        let config = crate::core::provider::AiConfig {
            custom_providers: vec![CustomProviderEntry::new("lm", "http://127.0.0.1:1/v1/", "m")],
            ..Default::default()
        };
        let custom = config.custom_descriptors().unwrap();
        assert!(factory.create(&custom[0]).is_ok());
    }

    #[test]
    fn empty_text_is_call_failure() {
        let err = non_empty_text("  ".to_string(), "openai", "gpt").unwrap_err();
        assert!(err.is_transient());
        assert!(non_empty_text("ok".to_string(), "openai", "gpt").is_ok());
    }
}
