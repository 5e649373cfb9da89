//! Google Gemini client (`generateContent`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionClient, non_empty_text};
use crate::core::http::send_json;
use crate::error::Result;

/// Gemini REST client authenticated with `x-goog-api-key`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    provider_id: String,
}

impl GeminiClient {
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
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![PartOut { text: prompt }],
            }],
            system_instruction: system_prompt.map(|s| Content {
                role: None,
                parts: vec![PartOut { text: s }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        let request = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response: GenerateResponse = send_json(request, &self.provider_id, &self.model).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        non_empty_text(text, &self.provider_id, &self.model)
    }
}
