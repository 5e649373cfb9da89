//! Progress commands: `status`, `stats` and `reset`.

use serde::Serialize;

use crate::cli::args::{OutputFormat, ResetArgs, StatusArgs};
use crate::cli::context::AppContext;
use crate::core::analytics::StatsReport;
use crate::core::models::SkillProgress;
use crate::error::Result;
use crate::render::{self, human};
use crate::storage::progress::ProgressStore;
use crate::util::time::now_ms;

/// A tracked skill with derived fields for scripts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusEntry {
    #[serde(flatten)]
    progress: SkillProgress,
    mastery: u8,
    due: bool,
}

/// Show tracked skills, or only the due ones with `--due`.
///
/// # Errors
/// Returns error if output cannot be rendered.
pub fn status(
    ctx: &AppContext,
    args: &StatusArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let now = now_ms();
    let progress = if args.due {
        ctx.scheduler().due_items(now)
    } else {
        ctx.store.all_progress()
    };
    let entries: Vec<StatusEntry> = progress
        .iter()
        .map(|p| StatusEntry {
            mastery: p.mastery(),
            due: p.is_due(now),
            progress: p.clone(),
        })
        .collect();
    render::emit(
        "status",
        &entries,
        |_| {
            if args.due && progress.is_empty() {
                human::render_nothing_due()
            } else {
                human::render_status(&progress, now)
            }
        },
        ctx.health.snapshot(),
        format,
        pretty,
    )
}

/// Show practice statistics.
///
/// # Errors
/// Returns error if output cannot be rendered.
pub fn stats(ctx: &AppContext, format: OutputFormat, pretty: bool) -> Result<()> {
    let report = StatsReport::build(&ctx.store.all_progress(), &ctx.store.attempts(), now_ms());
    render::emit(
        "stats",
        &report,
        human::render_stats,
        ctx.health.snapshot(),
        format,
        pretty,
    )
}

/// Forget a skill's progress. Its attempt history is kept.
///
/// # Errors
/// Returns [`crate::error::GymError::SkillNotFound`] for untracked skills.
pub async fn reset(
    ctx: &AppContext,
    args: &ResetArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let removed = ctx.pipeline().reset_skill(&args.skill).await?;
    render::emit(
        "reset",
        &removed,
        human::render_reset,
        ctx.health.snapshot(),
        format,
        pretty,
    )
}
