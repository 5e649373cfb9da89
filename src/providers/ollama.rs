//! Local Ollama runtime client (`/api/generate`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionClient, non_empty_text};
use crate::core::http::send_json;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    provider_id: String,
}

impl OllamaClient {
    #[must_use]
    pub const fn new(http: Client, base_url: String, model: String, provider_id: String) -> Self {
        Self {
            http,
            base_url,
            model,
            provider_id,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct Options {
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false,
            options: Options {
                num_predict: max_tokens,
            },
        };

        let request = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body);
        let response: GenerateResponse = send_json(request, &self.provider_id, &self.model).await?;
        non_empty_text(response.response, &self.provider_id, &self.model)
    }
}
