//! Provider response bodies, config files and an isolated home for the CLI.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::{Value, json};
use tempfile::TempDir;

/// API key variables the CLI would otherwise inherit from the developer's shell.
const PROVIDER_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "ANTHROPIC_API_KEY", "OPENAI_API_KEY"];

// =============================================================================
// Provider response bodies
// =============================================================================

#[must_use]
pub fn gemini_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[must_use]
pub fn anthropic_body(text: &str) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn"
    })
}

#[must_use]
pub fn openai_body(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    })
}

#[must_use]
pub fn ollama_body(text: &str) -> Value {
    json!({ "model": "llama3.2", "response": text, "done": true })
}

/// A grader verdict wrapped in a markdown fence, as models tend to send it.
#[must_use]
pub fn fenced_verdict(correct: bool, score: u8, feedback: &str) -> String {
    format!(
        "Here is my assessment:\n```json\n{}\n```",
        json!({ "correct": correct, "score": score, "feedback": feedback })
    )
}

// =============================================================================
// Config files
// =============================================================================

/// Config routing only to Gemini at `base_url`, keyed by `key_env`.
#[must_use]
pub fn gemini_only_config(base_url: &str, key_env: &str) -> String {
    format!(
        r#"[ai]
timeout_ms = 5000

[[ai.routing]]
provider = "gemini"
model = "gemini-test"
base_url = "{base_url}"
api_key_env = "{key_env}"

[[ai.routing]]
provider = "anthropic"
enabled = false

[[ai.routing]]
provider = "openai"
enabled = false

[[ai.routing]]
provider = "ollama"
enabled = false
"#
    )
}

/// Config with every provider disabled.
pub const NO_PROVIDERS_CONFIG: &str = r#"[[ai.routing]]
provider = "gemini"
enabled = false

[[ai.routing]]
provider = "ollama"
enabled = false
"#;

// =============================================================================
// Sandboxed CLI home
// =============================================================================

/// Temporary home with its own config and database.
pub struct GymHome {
    dir: TempDir,
}

impl GymHome {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.path().join("data/gym-progress.sqlite")
    }

    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_path(), content).expect("write config");
    }

    /// `gym` with every path inside this home, no inherited API keys,
    /// colors and logs off.
    #[must_use]
    #[allow(deprecated)]
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("gym").expect("gym binary");
        cmd.env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("XDG_CACHE_HOME", self.path().join("cache"))
            .env("XDG_DATA_HOME", self.path().join("share"))
            .env("GYM_CONFIG", self.config_path())
            .env("GYM_DATABASE", self.database_path())
            .env("GYM_LOG", "off")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("GYM_FAILURE_POLICY")
            .env_remove("GYM_TIMEOUT_MS");
        for var in PROVIDER_KEY_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Run `gym --json <args>` and parse stdout.
    #[must_use]
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run gym");
        assert!(
            output.status.success(),
            "gym {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is JSON")
    }
}

impl Default for GymHome {
    fn default() -> Self {
        Self::new()
    }
}
