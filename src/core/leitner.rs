//! Leitner box transitions.
//!
//! A correct attempt promotes a skill one box (capped at 5). An incorrect
//! attempt demotes it according to the configured [`FailurePolicy`]. The
//! next review is always recomputed from the new box at attempt time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::interval::{MAX_BOX_LEVEL, MIN_BOX_LEVEL, calculate_next_review_at, clamp_box_level};
use crate::core::models::{AttemptResult, SkillProgress};
use crate::error::GymError;

/// How far a skill falls after an incorrect attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Drop straight back to box 1.
    #[default]
    Reset,
    /// Drop one box, never below 1.
    StepBack,
}

impl FailurePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::StepBack => "step-back",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = GymError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reset" => Ok(Self::Reset),
            "step-back" | "step_back" | "stepback" => Ok(Self::StepBack),
            other => Err(GymError::ConfigInvalid {
                key: "scheduler.failure_policy".to_string(),
                value: other.to_string(),
                message: "expected 'reset' or 'step-back'".to_string(),
            }),
        }
    }
}

/// Box level after one attempt.
#[must_use]
pub fn next_box_level(current: u8, result: AttemptResult, policy: FailurePolicy) -> u8 {
    let current = clamp_box_level(current);
    match (result, policy) {
        (AttemptResult::Correct, _) => (current + 1).min(MAX_BOX_LEVEL),
        (AttemptResult::Incorrect, FailurePolicy::Reset) => MIN_BOX_LEVEL,
        (AttemptResult::Incorrect, FailurePolicy::StepBack) => {
            current.saturating_sub(1).max(MIN_BOX_LEVEL)
        }
    }
}

/// Apply one attempt to a skill's progress.
///
/// A missing record starts at box 1.
#[must_use]
pub fn apply_attempt(
    skill_key: &str,
    existing: Option<&SkillProgress>,
    result: AttemptResult,
    attempt_time_ms: i64,
    policy: FailurePolicy,
) -> SkillProgress {
    let current = existing.map_or(MIN_BOX_LEVEL, |p| p.box_level);
    let box_level = next_box_level(current, result, policy);
    SkillProgress::new(
        skill_key,
        box_level,
        calculate_next_review_at(box_level, attempt_time_ms),
        result,
    )
}
