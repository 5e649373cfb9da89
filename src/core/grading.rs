//! Grading pipeline.
//!
//! Scores a free-form answer through the provider cascade and writes the
//! result back to progress. When no provider can grade, the outcome is
//! [`GradeOutcome::Ungraded`] with a notice for the user. Practice goes on
//! and the caller may self-grade through [`GradingPipeline::record_result`].
//!
//! Recording is two-step: the in-memory store is updated synchronously, then
//! the optional [`ProgressSink`] persists the change. Persistence failures
//! are logged and leave memory as is.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::cascade::{Cascade, CascadeRequest};
use crate::core::models::{AttemptRecord, AttemptResult, ErrorKind, SkillProgress};
use crate::core::scheduler::Scheduler;
use crate::error::{ErrorCategory, GymError, Result};
use crate::storage::progress::ProgressSink;

const GRADER_SYSTEM_PROMPT: &str = "You are a strict but fair tutor grading a student's answer. \
Reply with JSON only, no prose: {\"correct\": boolean, \"score\": number from 0 to 100, \
\"feedback\": short string addressed to the student}.";

/// An answer to grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub skill_key: String,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl GradeRequest {
    #[must_use]
    pub fn new(
        skill_key: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            skill_key: skill_key.into(),
            question: question.into(),
            answer: answer.into(),
            reference_answer: None,
            duration_ms: 0,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_answer = Some(reference.into());
        self
    }

    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    fn prompt(&self) -> String {
        let mut prompt = format!(
            "Skill: {}\nQuestion: {}\nStudent answer: {}\n",
            self.skill_key, self.question, self.answer
        );
        if let Some(reference) = &self.reference_answer {
            prompt.push_str(&format!("Reference answer: {reference}\n"));
        }
        prompt.push_str("Grade the student answer.");
        prompt
    }
}

/// The grader's verdict as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeVerdict {
    pub correct: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub feedback: String,
}

impl GradeVerdict {
    /// Score clamped to `0..=100`, defaulting to 100 or 0 by correctness.
    #[must_use]
    pub fn normalized_score(&self) -> f64 {
        self.score
            .filter(|s| s.is_finite())
            .map_or(if self.correct { 100.0 } else { 0.0 }, |s| s.clamp(0.0, 100.0))
    }
}

/// Result of asking the cascade to grade.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GradeOutcome {
    Graded {
        verdict: GradeVerdict,
        provider_id: String,
        model: String,
    },
    /// No provider could grade. `notice` is meant for a dismissible banner.
    Ungraded { notice: String, error_code: String },
}

impl GradeOutcome {
    #[must_use]
    pub const fn is_graded(&self) -> bool {
        matches!(self, Self::Graded { .. })
    }
}

/// A self-graded or AI-graded attempt to record.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptInput {
    pub skill_key: String,
    pub correct: bool,
    pub score: f64,
    pub duration_ms: u64,
    pub timestamp_ms: i64,
    pub error_kind: Option<ErrorKind>,
}

impl AttemptInput {
    #[must_use]
    pub fn new(skill_key: impl Into<String>, correct: bool, timestamp_ms: i64) -> Self {
        Self {
            skill_key: skill_key.into(),
            correct,
            score: if correct { 100.0 } else { 0.0 },
            duration_ms: 0,
            timestamp_ms,
            error_kind: None,
        }
    }

    #[must_use]
    pub const fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub const fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }
}

/// Outcome of [`GradingPipeline::submit`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub outcome: GradeOutcome,
    /// Updated progress, present only when the answer was graded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<SkillProgress>,
}

/// Whether a cascade error should degrade to an ungraded outcome.
fn degrades_to_ungraded(error: &GymError) -> bool {
    !matches!(error, GymError::Cancelled)
        && matches!(
            error.category(),
            ErrorCategory::Provider | ErrorCategory::Response
        )
}

/// Grades answers and records results.
#[derive(Clone)]
pub struct GradingPipeline {
    scheduler: Scheduler,
    cascade: Cascade,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl GradingPipeline {
    #[must_use]
    pub const fn new(scheduler: Scheduler, cascade: Cascade) -> Self {
        Self {
            scheduler,
            cascade,
            sink: None,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub const fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    /// Ask the cascade to grade an answer.
    ///
    /// # Errors
    /// Returns [`GymError::Cancelled`] on cancellation and configuration
    /// errors as is. Provider and response failures become
    /// [`GradeOutcome::Ungraded`].
    pub async fn grade(
        &self,
        request: &GradeRequest,
        cancel: &CancellationToken,
    ) -> Result<GradeOutcome> {
        let cascade_request =
            CascadeRequest::new(request.prompt()).with_system_prompt(GRADER_SYSTEM_PROMPT);

        match self
            .cascade
            .generate_json::<GradeVerdict>(&cascade_request, cancel)
            .await
        {
            Ok(response) => {
                info!(
                    skill = %request.skill_key,
                    provider = %response.provider_id,
                    correct = response.value.correct,
                    "Answer graded"
                );
                Ok(GradeOutcome::Graded {
                    verdict: response.value,
                    provider_id: response.provider_id,
                    model: response.model,
                })
            }
            Err(e) if degrades_to_ungraded(&e) => {
                warn!(
                    skill = %request.skill_key,
                    code = e.error_code(),
                    error = %e,
                    "AI grading unavailable"
                );
                Ok(GradeOutcome::Ungraded {
                    notice: e.to_string(),
                    error_code: e.error_code().to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Apply an attempt to progress and persist it.
    ///
    /// The in-memory store is updated before this future first yields.
    pub async fn record_result(&self, input: AttemptInput) -> SkillProgress {
        let result = AttemptResult::from_correct(input.correct);
        let progress = self
            .scheduler
            .record_attempt(&input.skill_key, result, input.timestamp_ms);

        let mut record = AttemptRecord::new(
            input.skill_key.clone(),
            input.timestamp_ms,
            input.correct,
            input.score,
            input.duration_ms,
        );
        if let Some(kind) = input.error_kind {
            record = record.with_error_kind(kind);
        }
        self.scheduler.store().append_attempt(record.clone());

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.persist_progress(&progress).await {
                warn!(skill = %progress.skill_key, error = %e, "Failed to persist progress");
            }
            if let Err(e) = sink.persist_attempt(&record).await {
                warn!(skill = %record.skill_key, error = %e, "Failed to persist attempt");
            }
        }
        progress
    }

    /// Grade an answer and, if graded, record it.
    ///
    /// # Errors
    /// See [`GradingPipeline::grade`].
    pub async fn submit(
        &self,
        request: &GradeRequest,
        now_ms: i64,
        cancel: &CancellationToken,
    ) -> Result<Submission> {
        let outcome = self.grade(request, cancel).await?;
        let progress = match &outcome {
            GradeOutcome::Graded { verdict, .. } => Some(
                self.record_result(
                    AttemptInput::new(request.skill_key.clone(), verdict.correct, now_ms)
                        .with_score(verdict.normalized_score())
                        .with_duration_ms(request.duration_ms),
                )
                .await,
            ),
            GradeOutcome::Ungraded { .. } => None,
        };
        Ok(Submission { outcome, progress })
    }

    /// Remove a skill's progress.
    ///
    /// # Errors
    /// Returns [`GymError::SkillNotFound`] if the skill has no record.
    pub async fn reset_skill(&self, skill_key: &str) -> Result<SkillProgress> {
        let removed = self
            .scheduler
            .store()
            .reset_skill(skill_key)
            .ok_or_else(|| GymError::SkillNotFound(skill_key.to_string()))?;
        if let Some(sink) = &self.sink
            && let Err(e) = sink.delete_progress(skill_key).await
        {
            warn!(skill = %skill_key, error = %e, "Failed to persist reset");
        }
        info!(skill = %skill_key, "Progress reset");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::health::ProviderHealth;
    use crate::core::interval::DAY_MS;
    use crate::core::leitner::FailurePolicy;
    use crate::core::provider::AiConfig;
    use crate::storage::progress::{MemoryProgressStore, ProgressStore};
    use crate::test_utils::{
        FailingSink, MockFactory, MockReply, RecordingSink, TEST_NOW_MS, make_test_progress,
    };

    /// Pipeline over the default routing table (gemini, anthropic, openai, ollama).
    fn pipeline(factory: MockFactory, store: Arc<MemoryProgressStore>) -> GradingPipeline {
        let cascade = Cascade::new(AiConfig::default(), ProviderHealth::new(), Arc::new(factory));
        GradingPipeline::new(Scheduler::new(store, FailurePolicy::Reset), cascade)
    }

    fn request() -> GradeRequest {
        GradeRequest::new("fractions", "1/2 + 1/4?", "3/4").with_duration_ms(9_000)
    }

    #[tokio::test]
    async fn record_result_updates_memory_first() {
        let store = Arc::new(MemoryProgressStore::new());
        store.upsert_progress(make_test_progress("fractions", 3, 0));
        let sink = RecordingSink::default();
        let p = pipeline(MockFactory::new(), store.clone()).with_sink(Arc::new(sink.clone()));

        let progress = p
            .record_result(AttemptInput::new("fractions", true, TEST_NOW_MS))
            .await;

        assert_eq!(progress.box_level, 4);
        assert_eq!(progress.next_review_at, TEST_NOW_MS + 14 * DAY_MS);
        assert_eq!(store.get_progress("fractions").unwrap().box_level, 4);
        assert_eq!(store.attempts().len(), 1);
        assert_eq!(sink.progress.snapshot().len(), 1);
        assert!((sink.attempts.snapshot()[0].score - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn persist_failure_does_not_roll_back() {
        let store = Arc::new(MemoryProgressStore::new());
        let p = pipeline(MockFactory::new(), store.clone()).with_sink(Arc::new(FailingSink));

        let progress = p
            .record_result(AttemptInput::new("decimals", false, TEST_NOW_MS))
            .await;

        assert_eq!(progress.box_level, 1);
        assert_eq!(store.get_progress("decimals").unwrap(), progress);
        assert_eq!(store.attempts()[0].error_kind, Some(ErrorKind::WrongAnswer));
    }

    #[tokio::test]
    async fn submit_graded_records_progress() {
        let store = Arc::new(MemoryProgressStore::new());
        store.upsert_progress(make_test_progress("fractions", 3, 0));
        let factory = MockFactory::new()
            .with_reply("gemini", MockReply::fail(Some(503), "overloaded"))
            .with_reply(
                "anthropic",
                MockReply::text(
                    "```json\n{\"correct\": true, \"score\": 87, \"feedback\": \"Nice\"}\n```",
                ),
            );
        let p = pipeline(factory, store.clone());

        let submission = p
            .submit(&request(), TEST_NOW_MS, &CancellationToken::new())
            .await
            .unwrap();

        match &submission.outcome {
            GradeOutcome::Graded {
                verdict,
                provider_id,
                ..
            } => {
                assert!(verdict.correct);
                assert_eq!(verdict.feedback, "Nice");
                assert_eq!(provider_id, "anthropic");
            }
            GradeOutcome::Ungraded { .. } => panic!("expected a grade"),
        }
        assert_eq!(submission.progress.as_ref().unwrap().box_level, 4);
        let attempt = &store.attempts()[0];
        assert!((attempt.score - 87.0).abs() < f64::EPSILON);
        assert_eq!(attempt.duration_ms, 9_000);
    }

    #[tokio::test]
    async fn wrong_answer_resets_box() {
        let store = Arc::new(MemoryProgressStore::new());
        store.upsert_progress(make_test_progress("fractions", 4, 0));
        let factory = MockFactory::new()
            .with_reply("gemini", MockReply::text("{\"correct\": false, \"feedback\": \"No\"}"));
        let p = pipeline(factory, store.clone());

        let submission = p
            .submit(&request(), TEST_NOW_MS, &CancellationToken::new())
            .await
            .unwrap();
        let progress = submission.progress.unwrap();
        assert_eq!(progress.box_level, 1);
        assert_eq!(progress.next_review_at, TEST_NOW_MS + DAY_MS);
    }

    #[tokio::test]
    async fn ungraded_when_every_provider_fails() {
        let store = Arc::new(MemoryProgressStore::new());
        let p = pipeline(MockFactory::new(), store.clone());

        let submission = p
            .submit(&request(), TEST_NOW_MS, &CancellationToken::new())
            .await
            .unwrap();

        match &submission.outcome {
            GradeOutcome::Ungraded { error_code, notice } => {
                assert_eq!(error_code, "GYM-P010");
                assert!(notice.contains("failed"));
            }
            GradeOutcome::Graded { .. } => panic!("expected ungraded"),
        }
        assert!(submission.progress.is_none());
        assert!(store.attempts().is_empty());
    }

    #[tokio::test]
    async fn malformed_grade_is_ungraded() {
        let store = Arc::new(MemoryProgressStore::new());
        let factory = MockFactory::new().with_reply("gemini", MockReply::text("Looks right to me!"));
        let p = pipeline(factory, store);

        let outcome = p.grade(&request(), &CancellationToken::new()).await.unwrap();
        match outcome {
            GradeOutcome::Ungraded { error_code, .. } => assert_eq!(error_code, "GYM-R001"),
            GradeOutcome::Graded { .. } => panic!("expected ungraded"),
        }
    }

    #[tokio::test]
    async fn cancellation_propagates() {
        let store = Arc::new(MemoryProgressStore::new());
        let p = pipeline(MockFactory::new(), store);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = p.grade(&request(), &cancel).await.unwrap_err();
        assert!(matches!(err, GymError::Cancelled));
    }

    #[tokio::test]
    async fn reset_unknown_skill_is_not_found() {
        let store = Arc::new(MemoryProgressStore::new());
        let p = pipeline(MockFactory::new(), store.clone());
        let err = p.reset_skill("ghost").await.unwrap_err();
        assert!(matches!(err, GymError::SkillNotFound(_)));

        store.upsert_progress(make_test_progress("real", 2, 0));
        let sink = RecordingSink::default();
        let p = p.with_sink(Arc::new(sink.clone()));
        assert_eq!(p.reset_skill("real").await.unwrap().box_level, 2);
        assert_eq!(sink.deleted.snapshot(), vec!["real"]);
    }

    #[test]
    fn verdict_score_normalization() {
        let v = GradeVerdict {
            correct: true,
            score: None,
            feedback: String::new(),
        };
        assert!((v.normalized_score() - 100.0).abs() < f64::EPSILON);
        let v = GradeVerdict {
            correct: false,
            score: Some(140.0),
            feedback: String::new(),
        };
        assert!((v.normalized_score() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn prompt_includes_reference() {
        let prompt = request().with_reference("0.75").prompt();
        assert!(prompt.contains("Reference answer: 0.75"));
        assert!(prompt.contains("Student answer: 3/4"));
    }
}
