//! Practice data models.
//!
//! These types are shared by the scheduler, the grading pipeline, the
//! progress stores and the JSON output of the CLI.

use serde::{Deserialize, Serialize};

use crate::core::interval::{calculate_mastery, clamp_box_level, is_elite};

// =============================================================================
// Attempt Result
// =============================================================================

/// Outcome of the most recent graded attempt at a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptResult {
    Correct,
    Incorrect,
}

impl AttemptResult {
    #[must_use]
    pub const fn from_correct(correct: bool) -> Self {
        if correct { Self::Correct } else { Self::Incorrect }
    }

    #[must_use]
    pub const fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
        }
    }

    /// Parse the stored representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "correct" => Some(Self::Correct),
            "incorrect" => Some(Self::Incorrect),
            _ => None,
        }
    }
}

// =============================================================================
// Skill Progress
// =============================================================================

/// Leitner state for one skill.
///
/// # Fields
/// - `box_level`: Always within `[1, 5]`.
/// - `next_review_at`: Epoch milliseconds at which the skill falls due.
/// - `last_result`: Result of the attempt that produced this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
    pub skill_key: String,
    pub box_level: u8,
    pub next_review_at: i64,
    pub last_result: AttemptResult,
}

impl SkillProgress {
    /// Build a record, clamping the box level into range.
    #[must_use]
    pub fn new(
        skill_key: impl Into<String>,
        box_level: u8,
        next_review_at: i64,
        last_result: AttemptResult,
    ) -> Self {
        Self {
            skill_key: skill_key.into(),
            box_level: clamp_box_level(box_level),
            next_review_at,
            last_result,
        }
    }

    /// Whether this record is due at `now_ms`.
    #[must_use]
    pub const fn is_due(&self, now_ms: i64) -> bool {
        now_ms >= self.next_review_at
    }

    /// Mastery percentage for the current box.
    #[must_use]
    pub fn mastery(&self) -> u8 {
        calculate_mastery(self.box_level)
    }

    #[must_use]
    pub const fn is_elite(&self) -> bool {
        is_elite(self.box_level)
    }
}

// =============================================================================
// Attempt Record
// =============================================================================

/// Why an attempt was marked wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The answer was not submitted before the clock ran out.
    Timeout,
    /// The submitted answer was wrong.
    WrongAnswer,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::WrongAnswer => "wrong_answer",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "timeout" => Some(Self::Timeout),
            "wrong_answer" => Some(Self::WrongAnswer),
            _ => None,
        }
    }
}

/// One attempt at a skill. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub skill_key: String,
    pub timestamp_ms: i64,
    pub correct: bool,
    pub score: f64,
    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl AttemptRecord {
    #[must_use]
    pub fn new(
        skill_key: impl Into<String>,
        timestamp_ms: i64,
        correct: bool,
        score: f64,
        duration_ms: u64,
    ) -> Self {
        Self {
            skill_key: skill_key.into(),
            timestamp_ms,
            correct,
            score,
            duration_ms,
            error_kind: if correct {
                None
            } else {
                Some(ErrorKind::WrongAnswer)
            },
        }
    }

    /// Builder: overrides the error kind.
    #[must_use]
    pub const fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }
}
