//! Anthropic Messages API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionClient, non_empty_text};
use crate::core::http::send_json;
use crate::error::Result;

/// API version header sent with every request.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client authenticated with `x-api-key`.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    provider_id: String,
}

impl AnthropicClient {
    #[must_use]
    pub const fn new(
        http: Client,
        base_url: String,
        model: String,
        api_key: String,
        provider_id: String,
    ) -> Self {
        Self {
            http,
            base_url,
            model,
            api_key,
            provider_id,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens,
            system: system_prompt,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let response: MessagesResponse = send_json(request, &self.provider_id, &self.model).await?;

        let text = response
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<String>();
        non_empty_text(text, &self.provider_id, &self.model)
    }
}
