//! Human-readable output using colored.
//!
//! Renderers return plain strings; whether ANSI codes are emitted is decided
//! once in `main` through `colored::control`.

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};

use crate::cli::providers::ProviderStatus;
use crate::core::analytics::{RetentionSegment, StatsReport};
use crate::core::generation::GeneratedQuestion;
use crate::core::grading::{GradeOutcome, Submission};
use crate::core::health::HealthWarning;
use crate::core::models::{AttemptResult, SkillProgress};
use crate::core::scheduler::{QueueStatus, ScheduledItem};
use crate::util::format::{format_duration_ms, format_percent, mastery_bar};
use crate::util::time::format_due;

const BAR_WIDTH: usize = 20;

fn bar(mastery: u8) -> ColoredString {
    let bar = mastery_bar(mastery, BAR_WIDTH);
    match mastery {
        75.. => bar.green(),
        25..75 => bar.yellow(),
        _ => bar.red(),
    }
}

fn status_label(status: QueueStatus) -> ColoredString {
    match status {
        QueueStatus::Due => "due".red().bold(),
        QueueStatus::New => "new".cyan().bold(),
        QueueStatus::Upcoming => "upcoming".dimmed(),
    }
}

fn result_label(result: AttemptResult) -> ColoredString {
    match result {
        AttemptResult::Correct => "correct".green(),
        AttemptResult::Incorrect => "incorrect".red(),
    }
}

/// Render the practice queue.
#[must_use]
pub fn render_queue(items: &[ScheduledItem], now_ms: i64) -> String {
    if items.is_empty() {
        return format!(
            "{}\n{}",
            "Nothing to practise yet.".bold(),
            "Pass --skills to start tracking new skills.".dimmed()
        );
    }

    let width = key_width(items.iter().map(|i| i.skill_key.as_str()));
    let mut out = format!("{}\n", "Practice queue".bold());
    for (i, item) in items.iter().enumerate() {
        let when = item
            .next_review_at
            .map_or_else(|| "never practised".to_string(), |at| format_due(at, now_ms));
        let _ = writeln!(
            out,
            "{:>3}. {:<width$}  {:<8}  box {}  {} {:>4}  {}",
            i + 1,
            item.skill_key,
            status_label(item.status),
            item.box_level,
            bar(item.mastery),
            format_percent(f64::from(item.mastery)),
            when.dimmed(),
        );
    }
    out
}

/// Render a skill's state after an attempt was recorded.
#[must_use]
pub fn render_progress_update(progress: &SkillProgress, now_ms: i64) -> String {
    format!(
        "{} {}  {}  box {}  {} {}\n  next review {}",
        "Recorded".bold(),
        progress.skill_key.bold(),
        result_label(progress.last_result),
        progress.box_level,
        bar(progress.mastery()),
        format_percent(f64::from(progress.mastery())),
        format_due(progress.next_review_at, now_ms),
    )
}

/// Render the result of `gym grade`.
#[must_use]
pub fn render_submission(submission: &Submission, now_ms: i64) -> String {
    match &submission.outcome {
        GradeOutcome::Graded {
            verdict,
            provider_id,
            model,
        } => {
            let mut out = format!(
                "{} {}  score {}  {}\n",
                "Graded:".bold(),
                if verdict.correct {
                    "correct".green().bold()
                } else {
                    "incorrect".red().bold()
                },
                format_percent(verdict.normalized_score()),
                format!("({provider_id} / {model})").dimmed()
            );
            if !verdict.feedback.is_empty() {
                let _ = writeln!(out, "  {}", verdict.feedback);
            }
            if let Some(progress) = &submission.progress {
                out.push('\n');
                out.push_str(&render_progress_update(progress, now_ms));
                out.push('\n');
            }
            out
        }
        GradeOutcome::Ungraded { notice, error_code } => format!(
            "{} {} {}\n  {}\n",
            "Not graded:".yellow().bold(),
            notice,
            format!("[{error_code}]").dimmed(),
            "Nothing was recorded. Self-grade with `gym answer <skill> --correct|--incorrect`."
                .dimmed()
        ),
    }
}

/// Render a generated question. The answer is shown last, after a divider.
#[must_use]
pub fn render_question(question: &GeneratedQuestion) -> String {
    let mut out = format!(
        "{} {}  {}\n\n{}\n",
        "Question".bold(),
        question.skill_key.bold(),
        format!(
            "difficulty {}/5 via {}",
            question.difficulty, question.provider_id
        )
        .dimmed(),
        question.question.question
    );
    if let Some(hint) = &question.question.hint {
        let _ = writeln!(out, "\n{} {hint}", "Hint:".cyan().bold());
    }
    let _ = writeln!(out, "\n{}", "-".repeat(40).dimmed());
    let _ = writeln!(out, "{} {}", "Answer:".green().bold(), question.question.answer);
    if let Some(explanation) = &question.question.explanation {
        let _ = writeln!(out, "{}", explanation.dimmed());
    }
    out
}

/// Render every tracked skill.
#[must_use]
pub fn render_status(progress: &[SkillProgress], now_ms: i64) -> String {
    if progress.is_empty() {
        return "No skills tracked yet.".bold().to_string();
    }

    let width = key_width(progress.iter().map(|p| p.skill_key.as_str()));
    let due = progress.iter().filter(|p| p.is_due(now_ms)).count();
    let mut out = format!(
        "{}  {}\n",
        "Progress".bold(),
        format!("{} tracked, {due} due", progress.len()).dimmed()
    );
    for p in progress {
        let due_text = format_due(p.next_review_at, now_ms);
        let _ = writeln!(
            out,
            "  {:<width$}  box {}  {} {:>4}  {:<9}  {}",
            p.skill_key,
            p.box_level,
            bar(p.mastery()),
            format_percent(f64::from(p.mastery())),
            result_label(p.last_result),
            if p.is_due(now_ms) {
                due_text.red()
            } else {
                due_text.normal()
            },
        );
    }
    out
}

/// Render practice statistics.
#[must_use]
pub fn render_stats(report: &StatsReport) -> String {
    let mut out = format!("{}\n", "Practice statistics".bold());
    let _ = writeln!(out, "  Skills tracked   {}", report.tracked_skills);
    let _ = writeln!(out, "  Attempts         {}", report.total_attempts);
    let _ = writeln!(out, "  Total XP         {:.0}", report.total_xp);
    let _ = writeln!(out, "  Elite skills     {}", report.elite_count);
    if let Some(ms) = report.average_duration_ms {
        let _ = writeln!(out, "  Avg. time        {}", format_duration_ms(ms));
    }
    let _ = writeln!(
        out,
        "  Retention        {} {}",
        bar(report.retention.overall_strength),
        format_percent(f64::from(report.retention.overall_strength))
    );

    if !report.retention.segments.is_empty() {
        let _ = writeln!(out, "\n{}", "Retention segments".bold());
        for seg in &report.retention.segments {
            let label = match seg.segment {
                RetentionSegment::Critical => seg.segment.label().red(),
                RetentionSegment::Weak => seg.segment.label().yellow(),
                RetentionSegment::Stable => seg.segment.label().normal(),
                RetentionSegment::Elite => seg.segment.label().green(),
            };
            let _ = writeln!(
                out,
                "  {:<16} {:>3}  {:>4}",
                label,
                seg.count,
                format_percent(f64::from(seg.percentage))
            );
        }
    }

    if !report.monthly_trend.is_empty() {
        let _ = writeln!(out, "\n{}", "Monthly trend".bold());
        for month in &report.monthly_trend {
            let _ = writeln!(
                out,
                "  {}  avg {:>4.1}  {}/{} correct",
                month.month, month.avg_grade, month.correct, month.attempts
            );
        }
    }

    if !report.error_distribution.is_empty() {
        let _ = writeln!(out, "\n{}", "Mistakes".bold());
        let mut kinds: Vec<_> = report.error_distribution.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (kind, count) in kinds {
            let _ = writeln!(out, "  {kind:<16} {count}");
        }
    }
    out
}

/// Render the provider cascade.
#[must_use]
pub fn render_providers(rows: &[ProviderStatus]) -> String {
    if rows.is_empty() {
        return format!(
            "{}\n{}",
            "No providers enabled.".yellow().bold(),
            "Enable one under [[ai.routing]] in the config file.".dimmed()
        );
    }

    let width = key_width(rows.iter().map(|r| r.provider_id.as_str()));
    let mut out = format!("{}\n", "Provider cascade".bold());
    for (i, row) in rows.iter().enumerate() {
        let state = if row.credentials_present {
            "ready".green()
        } else {
            "no key".red()
        };
        let _ = writeln!(
            out,
            "{:>3}. {:<width$}  {:<24}  {:<8}  {}",
            i + 1,
            row.provider_id,
            row.model,
            state,
            row.api_key_env
                .as_deref()
                .map_or_else(|| "local".to_string(), |env| format!("${env}"))
                .dimmed()
        );
    }
    out
}

/// Render `gym status --due` when nothing is due.
#[must_use]
pub fn render_nothing_due() -> String {
    "Nothing due right now.".green().to_string()
}

/// Render the result of `gym reset`.
#[must_use]
pub fn render_reset(removed: &SkillProgress) -> String {
    format!(
        "{} {} {}",
        "Reset".bold(),
        removed.skill_key.bold(),
        format!("(was box {})", removed.box_level).dimmed()
    )
}

/// One-line banner per outstanding warning, printed under command output.
#[must_use]
pub fn render_notice_banner(warnings: &[HealthWarning]) -> Option<String> {
    if warnings.is_empty() {
        return None;
    }
    let lines: Vec<String> = warnings
        .iter()
        .map(|w| format!("{} {}", "notice:".yellow().bold(), w.message))
        .collect();
    Some(lines.join("\n"))
}

fn key_width<'a>(keys: impl Iterator<Item = &'a str>) -> usize {
    keys.map(|k| k.chars().count()).max().unwrap_or(0).max(8)
}
