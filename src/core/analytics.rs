//! Practice statistics.
//!
//! Pure aggregations over progress and attempt history.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::interval::{DAY_MS, MAX_BOX_LEVEL};
use crate::core::models::{AttemptRecord, ErrorKind, SkillProgress};
use crate::util::time::month_key;

/// Grade credited for a correct attempt in the monthly trend.
pub const GRADE_CORRECT: f64 = 10.0;
/// Grade credited for an incorrect attempt in the monthly trend.
pub const GRADE_INCORRECT: f64 = 1.0;
/// Number of months reported by [`monthly_trend`].
pub const TREND_MONTHS: usize = 6;

/// Sum of attempt scores.
#[must_use]
pub fn total_xp(attempts: &[AttemptRecord]) -> f64 {
    attempts.iter().map(|a| a.score).sum()
}

/// Accuracy summary for one calendar month (UTC).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// `YYYY-MM`.
    pub month: String,
    pub avg_grade: f64,
    pub attempts: usize,
    pub correct: usize,
}

/// Monthly average grade for the most recent [`TREND_MONTHS`] months with
/// attempts, oldest first.
#[must_use]
pub fn monthly_trend(attempts: &[AttemptRecord]) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for attempt in attempts {
        let entry = months.entry(month_key(attempt.timestamp_ms)).or_default();
        entry.0 += 1;
        if attempt.correct {
            entry.1 += 1;
        }
    }

    let skip = months.len().saturating_sub(TREND_MONTHS);
    months
        .into_iter()
        .skip(skip)
        .map(|(month, (total, correct))| {
            #[allow(clippy::cast_precision_loss)]
            let avg_grade = (correct as f64)
                .mul_add(GRADE_CORRECT, (total - correct) as f64 * GRADE_INCORRECT)
                / total as f64;
            MonthlyTrend {
                month,
                avg_grade,
                attempts: total,
                correct,
            }
        })
        .collect()
}

/// Retention bucket by time until the next review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionSegment {
    /// Due within 1.5 days (or overdue).
    Critical,
    /// Due within 7.5 days.
    Weak,
    /// Due within 14.5 days.
    Stable,
    Elite,
}

impl RetentionSegment {
    pub const ALL: [Self; 4] = [Self::Critical, Self::Weak, Self::Stable, Self::Elite];

    /// Segment for a review falling due `ms_left` milliseconds from now.
    #[must_use]
    pub fn for_time_left(ms_left: i64) -> Self {
        // Half-day boundaries: 1.5, 7.5 and 14.5 days.
        let half_days = ms_left.saturating_mul(2);
        if half_days < 3 * DAY_MS {
            Self::Critical
        } else if half_days < 15 * DAY_MS {
            Self::Weak
        } else if half_days < 29 * DAY_MS {
            Self::Stable
        } else {
            Self::Elite
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical (0-1d)",
            Self::Weak => "weak (2-7d)",
            Self::Stable => "stable (1-2w)",
            Self::Elite => "elite (2w+)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCount {
    pub segment: RetentionSegment,
    pub count: usize,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionStats {
    /// Rounded mean of `box / 5 * 100` over tracked skills.
    pub overall_strength: u8,
    /// Always one entry per segment; empty when nothing is tracked.
    pub segments: Vec<SegmentCount>,
}

fn rounded_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    u8::try_from((200 * part + whole) / (2 * whole)).unwrap_or(100)
}

/// Retention segments and overall strength.
#[must_use]
pub fn retention_stats(progress: &[SkillProgress], now_ms: i64) -> RetentionStats {
    if progress.is_empty() {
        return RetentionStats {
            overall_strength: 0,
            segments: Vec::new(),
        };
    }

    let mut counts: BTreeMap<RetentionSegment, usize> = BTreeMap::new();
    let mut level_sum = 0usize;
    for item in progress {
        let segment = RetentionSegment::for_time_left(item.next_review_at.saturating_sub(now_ms));
        *counts.entry(segment).or_default() += 1;
        level_sum += usize::from(item.box_level);
    }

    let total = progress.len();
    // mean(box / 5 * 100) == level_sum * 100 / (5 * total)
    let overall_strength = rounded_percent(level_sum, total * usize::from(MAX_BOX_LEVEL));
    let segments = RetentionSegment::ALL
        .into_iter()
        .map(|segment| {
            let count = counts.get(&segment).copied().unwrap_or(0);
            SegmentCount {
                segment,
                count,
                percentage: rounded_percent(count, total),
            }
        })
        .collect();

    RetentionStats {
        overall_strength,
        segments,
    }
}

/// Number of skills at the top box.
#[must_use]
pub fn elite_count(progress: &[SkillProgress]) -> usize {
    progress.iter().filter(|p| p.is_elite()).count()
}

/// Incorrect attempts grouped by error kind, most frequent first.
///
/// Incorrect attempts without a kind are not counted.
#[must_use]
pub fn error_distribution(attempts: &[AttemptRecord]) -> Vec<(ErrorKind, usize)> {
    let mut counts: BTreeMap<ErrorKind, usize> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| !a.correct) {
        if let Some(kind) = attempt.error_kind {
            *counts.entry(kind).or_default() += 1;
        }
    }
    let mut out: Vec<_> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

/// Mean time spent per attempt, or `None` with no attempts.
#[must_use]
pub fn average_duration_ms(attempts: &[AttemptRecord]) -> Option<u64> {
    let n = u64::try_from(attempts.len()).ok().filter(|&n| n > 0)?;
    let total: u64 = attempts.iter().map(|a| a.duration_ms).sum();
    Some(total / n)
}

/// Everything `gym stats` reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub tracked_skills: usize,
    pub total_attempts: usize,
    pub total_xp: f64,
    pub elite_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_duration_ms: Option<u64>,
    pub retention: RetentionStats,
    pub monthly_trend: Vec<MonthlyTrend>,
    pub error_distribution: BTreeMap<String, usize>,
}

impl StatsReport {
    #[must_use]
    pub fn build(progress: &[SkillProgress], attempts: &[AttemptRecord], now_ms: i64) -> Self {
        Self {
            tracked_skills: progress.len(),
            total_attempts: attempts.len(),
            total_xp: total_xp(attempts),
            elite_count: elite_count(progress),
            average_duration_ms: average_duration_ms(attempts),
            retention: retention_stats(progress, now_ms),
            monthly_trend: monthly_trend(attempts),
            error_distribution: error_distribution(attempts)
                .into_iter()
                .map(|(kind, count)| (kind.as_str().to_string(), count))
                .collect(),
        }
    }
}
