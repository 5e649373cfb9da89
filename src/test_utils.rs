//! Test utilities for studygym.
//!
//! Provides data factories, a scripted provider factory, recording progress
//! sinks, and an isolated temp directory helper.
//!
//! # Usage
//!
//! ```rust,ignore
//! use studygym::test_utils::*;
//!
//! let factory = MockFactory::new()
//!     .with_reply("gemini", MockReply::fail(Some(500), "boom"))
//!     .with_reply("anthropic", MockReply::text("{\"correct\":true}"));
//! let calls = factory.call_log();
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::core::models::{AttemptRecord, AttemptResult, SkillProgress};
use crate::core::provider::{ProviderDescriptor, ProviderKind};
use crate::error::{GymError, Result};
use crate::providers::{ClientFactory, CompletionClient};
use crate::storage::progress::ProgressSink;

// =============================================================================
// Test Data Factories
// =============================================================================

/// A fixed reference time (2023-11-14T22:13:20Z) for deterministic tests.
pub const TEST_NOW_MS: i64 = 1_700_000_000_000;

/// Create a progress record.
#[must_use]
pub fn make_test_progress(skill_key: &str, box_level: u8, next_review_at: i64) -> SkillProgress {
    SkillProgress::new(skill_key, box_level, next_review_at, AttemptResult::Correct)
}

/// Create an attempt record.
#[must_use]
pub fn make_test_attempt(skill_key: &str, timestamp_ms: i64, correct: bool) -> AttemptRecord {
    let score = if correct { 100.0 } else { 0.0 };
    AttemptRecord::new(skill_key, timestamp_ms, correct, score, 12_000)
}

/// Create an enabled OpenAI-convention descriptor with a custom id.
#[must_use]
pub fn make_test_descriptor(provider_id: &str, priority: f64) -> ProviderDescriptor {
    let mut d = ProviderDescriptor::builtin(ProviderKind::OpenAi).with_priority(priority);
    d.provider_id = provider_id.to_string();
    d.model = format!("{provider_id}-model");
    d
}

/// Sample config TOML covering every section.
#[must_use]
pub fn make_test_config_toml() -> String {
    r#"[ai]
max_tokens = 1024
json_max_tokens = 8192

[[ai.routing]]
provider = "gemini"
model = "gemini-2.0-flash"
priority = 1

[[ai.routing]]
provider = "anthropic"
priority = 2

[[ai.routing]]
provider = "openai"
priority = 3
enabled = false

[[ai.custom_providers]]
id = "lmstudio"
base_url = "http://localhost:1234/v1"
model = "qwen2.5"
priority = 2.5

[scheduler]
failure_policy = "step-back"
session_size = 5
"#
    .to_string()
}

// =============================================================================
// Shared Logs
// =============================================================================

/// Append-only log shared between a mock and the test body.
#[derive(Debug, Clone)]
pub struct SharedLog<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> SharedLog<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, value: T) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T: Clone> Default for SharedLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Mock Providers
// =============================================================================

/// Scripted behaviour of a mock provider.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with a provider call error.
    Fail {
        status_code: Option<u16>,
        message: String,
    },
    /// Never complete.
    Hang,
}

impl MockReply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn fail(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self::Fail {
            status_code,
            message: message.into(),
        }
    }
}

struct MockClient {
    provider_id: String,
    model: String,
    reply: MockReply,
    calls: SharedLog<String>,
    budgets: SharedLog<u32>,
    prompts: SharedLog<String>,
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        self.calls.push(self.provider_id.clone());
        self.budgets.push(max_tokens);
        self.prompts.push(prompt.to_string());
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Fail {
                status_code,
                message,
            } => Err(GymError::ProviderCallFailed {
                provider: self.provider_id.clone(),
                model: self.model.clone(),
                status_code: *status_code,
                message: message.clone(),
            }),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

/// [`ClientFactory`] that hands out scripted clients keyed by provider id.
///
/// Providers without a script fail with a 500.
#[derive(Default)]
pub struct MockFactory {
    replies: HashMap<String, MockReply>,
    missing_credentials: HashSet<String>,
    calls: SharedLog<String>,
    budgets: SharedLog<u32>,
    prompts: SharedLog<String>,
}

impl MockFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reply(mut self, provider_id: &str, reply: MockReply) -> Self {
        self.replies.insert(provider_id.to_string(), reply);
        self
    }

    /// Treat the provider as having no API key.
    #[must_use]
    pub fn without_credentials(mut self, provider_id: &str) -> Self {
        self.missing_credentials.insert(provider_id.to_string());
        self
    }

    /// Provider ids in call order.
    #[must_use]
    pub fn call_log(&self) -> SharedLog<String> {
        self.calls.clone()
    }

    /// `max_tokens` of every call, in order.
    #[must_use]
    pub fn budget_log(&self) -> SharedLog<u32> {
        self.budgets.clone()
    }

    /// Prompt of every call, in order.
    #[must_use]
    pub fn prompt_log(&self) -> SharedLog<String> {
        self.prompts.clone()
    }
}

impl ClientFactory for MockFactory {
    fn create(&self, descriptor: &ProviderDescriptor) -> Result<Arc<dyn CompletionClient>> {
        if self.missing_credentials.contains(&descriptor.provider_id) {
            return Err(GymError::EnvVarMissing {
                name: format!("{}_API_KEY", descriptor.provider_id.to_uppercase()),
            });
        }
        let reply = self
            .replies
            .get(&descriptor.provider_id)
            .cloned()
            .unwrap_or_else(|| MockReply::fail(Some(500), "unscripted provider"));
        Ok(Arc::new(MockClient {
            provider_id: descriptor.provider_id.clone(),
            model: descriptor.model.clone(),
            reply,
            calls: self.calls.clone(),
            budgets: self.budgets.clone(),
            prompts: self.prompts.clone(),
        }))
    }
}

// =============================================================================
// Progress Sinks
// =============================================================================

/// [`ProgressSink`] that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub progress: SharedLog<SkillProgress>,
    pub attempts: SharedLog<AttemptRecord>,
    pub deleted: SharedLog<String>,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn persist_progress(&self, progress: &SkillProgress) -> Result<()> {
        self.progress.push(progress.clone());
        Ok(())
    }

    async fn persist_attempt(&self, record: &AttemptRecord) -> Result<()> {
        self.attempts.push(record.clone());
        Ok(())
    }

    async fn delete_progress(&self, skill_key: &str) -> Result<()> {
        self.deleted.push(skill_key.to_string());
        Ok(())
    }
}

/// [`ProgressSink`] whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

#[async_trait]
impl ProgressSink for FailingSink {
    async fn persist_progress(&self, _progress: &SkillProgress) -> Result<()> {
        Err(GymError::Database("disk is full".to_string()))
    }

    async fn persist_attempt(&self, _record: &AttemptRecord) -> Result<()> {
        Err(GymError::Database("disk is full".to_string()))
    }

    async fn delete_progress(&self, _skill_key: &str) -> Result<()> {
        Err(GymError::Database("disk is full".to_string()))
    }
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// Isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file, including parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.inner.path().join(name))
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
