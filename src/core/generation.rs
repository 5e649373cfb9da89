//! Practice question generation.
//!
//! Asks the cascade for one question pitched at the skill's current level.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::cascade::{Cascade, CascadeRequest};
use crate::core::interval::MAX_BOX_LEVEL;
use crate::core::scheduler::Scheduler;
use crate::error::{GymError, Result};

const GENERATOR_SYSTEM_PROMPT: &str = "You write short practice questions for students. \
Reply with JSON only: {\"question\": string, \"answer\": string, \"hint\": string, \
\"explanation\": string}.";

/// Question body as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A generated question with its provenance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub skill_key: String,
    pub difficulty: u8,
    #[serde(flatten)]
    pub question: PracticeQuestion,
    pub provider_id: String,
    pub model: String,
}

fn difficulty_label(level: u8) -> &'static str {
    match level {
        0 | 1 => "introductory",
        2 => "easy",
        3 => "intermediate",
        4 => "hard",
        _ => "exam-level",
    }
}

fn prompt(skill_key: &str, difficulty: u8) -> String {
    format!(
        "Skill: {skill_key}\nDifficulty: {difficulty}/{MAX_BOX_LEVEL} ({})\n\
         Write one new practice question for this skill at this difficulty.",
        difficulty_label(difficulty)
    )
}

/// Generates practice questions through the cascade.
#[derive(Clone)]
pub struct QuestionGenerator {
    cascade: Cascade,
    scheduler: Scheduler,
}

impl QuestionGenerator {
    #[must_use]
    pub const fn new(cascade: Cascade, scheduler: Scheduler) -> Self {
        Self { cascade, scheduler }
    }

    /// Generate a question for `skill_key`.
    ///
    /// `mix-` keys are pitched at the average of every tracked level.
    ///
    /// # Errors
    /// Returns cascade errors as is, and [`GymError::ResponseParseFailed`]
    /// when the model returns an empty question.
    pub async fn generate(
        &self,
        skill_key: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedQuestion> {
        let difficulty = self.scheduler.difficulty(skill_key);
        let request = CascadeRequest::new(prompt(skill_key, difficulty))
            .with_system_prompt(GENERATOR_SYSTEM_PROMPT);

        let response = self
            .cascade
            .generate_json::<PracticeQuestion>(&request, cancel)
            .await?;

        if response.value.question.trim().is_empty() {
            return Err(GymError::ResponseParseFailed {
                message: "generated question is empty".to_string(),
                snippet: String::new(),
            });
        }

        info!(
            skill = %skill_key,
            difficulty,
            provider = %response.provider_id,
            "Generated practice question"
        );
        Ok(GeneratedQuestion {
            skill_key: skill_key.to_string(),
            difficulty,
            question: response.value,
            provider_id: response.provider_id,
            model: response.model,
        })
    }
}
