//! JSON extraction from model output.
//!
//! Models often wrap JSON in Markdown fences or surround it with prose. The
//! last fenced block wins; without fences, the outermost `{...}` or `[...]`
//! span is tried after the raw text.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{GymError, Result};

/// A fenced block with an optional language tag; group 1 is the body.
static FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

const SNIPPET_CHARS: usize = 120;

/// Content of the last fenced code block, if any.
#[must_use]
pub fn last_fenced_block(text: &str) -> Option<&str> {
    FENCE_REGEX
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .last()
        .map(|m| m.as_str().trim())
}

/// The outermost `{...}` or `[...]` span.
#[must_use]
pub fn outermost_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    (start < end).then(|| &text[start..=end])
}

/// Strip Markdown decoration and return the best JSON candidate.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    last_fenced_block(text).unwrap_or_else(|| text.trim())
}

/// Parse a model response as JSON into `T`.
///
/// # Errors
/// Returns [`GymError::ResponseParseFailed`] if no candidate parses.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let stripped = strip_code_fences(text);
    let mut first_error = None;

    let candidates = [Some(stripped), outermost_json_span(stripped)];
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(GymError::ResponseParseFailed {
        message: first_error.map_or_else(|| "empty response".to_string(), |e| e.to_string()),
        snippet: text.chars().take(SNIPPET_CHARS).collect(),
    })
}
