//! HTTP client utilities.
//!
//! Provides the shared HTTP client and the JSON POST helper every provider
//! client goes through.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GymError, Result};

/// Upper bound for a single completion request.
///
/// Per-provider `timeout_ms` values are enforced separately by the cascade.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const ERROR_BODY_CHARS: usize = 300;

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("studygym/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GymError::Other(anyhow::anyhow!("build HTTP client: {e}")))
}

/// Create the default HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn default_client() -> Result<Client> {
    build_client(DEFAULT_TIMEOUT)
}

/// Send a prepared request and decode a JSON response.
///
/// Transport errors and non-2xx statuses become
/// [`GymError::ProviderCallFailed`] tagged with `provider` and `model`, with
/// the provider's own error message when the body carries one.
///
/// # Errors
///
/// Returns error on network failure, non-success status, or a body that
/// does not decode into `T`.
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &str,
    model: &str,
) -> Result<T> {
    let call_failed = |status_code: Option<u16>, message: String| GymError::ProviderCallFailed {
        provider: provider.to_string(),
        model: model.to_string(),
        status_code,
        message,
    };

    let response = request.send().await.map_err(|e| {
        let message = if e.is_timeout() {
            "request timed out".to_string()
        } else if e.is_connect() {
            format!("connection failed: {e}")
        } else {
            e.to_string()
        };
        call_failed(None, message)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(call_failed(
            Some(status.as_u16()),
            format!("HTTP {status}: {}", error_message(&body)),
        ));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| call_failed(Some(status.as_u16()), format!("invalid response body: {e}")))
}

/// Pull a readable message out of a provider error body.
///
/// Understands the `{"error": {"message": ...}}` and `{"error": "..."}`
/// shapes; anything else is returned truncated.
#[must_use]
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let error = value.get("error");
        if let Some(msg) = error.and_then(|e| e.get("message")).and_then(Value::as_str) {
            return msg.to_string();
        }
        if let Some(msg) = error.and_then(Value::as_str) {
            return msg.to_string();
        }
    }
    body.chars().take(ERROR_BODY_CHARS).collect()
}
