//! Practice commands: `next`, `answer`, `grade` and `generate`.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cli::args::{AnswerArgs, GenerateArgs, GradeArgs, NextArgs, OutputFormat};
use crate::cli::context::AppContext;
use crate::core::grading::{AttemptInput, GradeRequest};
use crate::core::models::{ErrorKind, SkillProgress};
use crate::core::scheduler::ScheduledItem;
use crate::error::Result;
use crate::render::{self, human};
use crate::util::time::now_ms;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextOutput {
    session_size: usize,
    due: usize,
    items: Vec<ScheduledItem>,
}

/// Show the next practice session.
///
/// # Errors
/// Returns error if output cannot be rendered.
pub fn next(ctx: &AppContext, args: &NextArgs, format: OutputFormat, pretty: bool) -> Result<()> {
    let now = now_ms();
    let size = args.count.unwrap_or(ctx.config.session_size);
    let items = ctx.scheduler().session(&args.skills, now, size);
    tracing::debug!(candidates = args.skills.len(), size, returned = items.len(), "Built session");

    let output = NextOutput {
        session_size: size,
        due: items.iter().filter(|i| i.is_due()).count(),
        items,
    };
    render::emit(
        "next",
        &output,
        |o| human::render_queue(&o.items, now),
        ctx.health.snapshot(),
        format,
        pretty,
    )
}

/// Record a self-graded attempt.
///
/// # Errors
/// Returns error if output cannot be rendered.
pub async fn answer(
    ctx: &AppContext,
    args: &AnswerArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let now = now_ms();
    let correct = args.correct && !args.incorrect;
    let mut input = AttemptInput::new(args.skill.clone(), correct, now)
        .with_duration_ms(args.duration_ms);
    if let Some(score) = args.score {
        input = input.with_score(score);
    }
    if args.timed_out {
        input = input.with_error_kind(ErrorKind::Timeout);
    }

    let progress: SkillProgress = ctx.pipeline().record_result(input).await;
    render::emit(
        "answer",
        &progress,
        |p| human::render_progress_update(p, now),
        ctx.health.snapshot(),
        format,
        pretty,
    )
}

/// Grade an answer with the provider cascade.
///
/// An ungraded outcome is reported, not returned as an error.
///
/// # Errors
/// Returns [`crate::error::GymError::Cancelled`] on Ctrl+C, and
/// configuration errors.
pub async fn grade(
    ctx: &AppContext,
    args: &GradeArgs,
    format: OutputFormat,
    pretty: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut request = GradeRequest::new(args.skill.clone(), args.question.clone(), args.answer.clone())
        .with_duration_ms(args.duration_ms);
    if let Some(reference) = &args.reference {
        request = request.with_reference(reference.clone());
    }

    let now = now_ms();
    let submission = ctx.pipeline().submit(&request, now, cancel).await?;
    render::emit(
        "grade",
        &submission,
        |s| human::render_submission(s, now),
        ctx.health.snapshot(),
        format,
        pretty,
    )
}

/// Generate a practice question at the skill's level.
///
/// # Errors
/// Returns cascade errors, including
/// [`crate::error::GymError::AllProvidersFailed`].
pub async fn generate(
    ctx: &AppContext,
    args: &GenerateArgs,
    format: OutputFormat,
    pretty: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let question = ctx.generator().generate(&args.skill, cancel).await?;
    render::emit(
        "generate",
        &question,
        human::render_question,
        ctx.health.snapshot(),
        format,
        pretty,
    )
}
