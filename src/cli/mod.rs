//! CLI argument parsing and command dispatch.

pub mod args;
pub mod context;
pub mod practice;
pub mod progress;
pub mod providers;

use tokio_util::sync::CancellationToken;

pub use args::{Cli, Commands, OutputFormat};
pub use context::AppContext;

use crate::error::Result;

/// Run one subcommand against a loaded context.
///
/// # Errors
/// Returns the command's error.
pub async fn dispatch(
    ctx: &AppContext,
    command: &Commands,
    format: OutputFormat,
    pretty: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Commands::Next(args) => practice::next(ctx, args, format, pretty),
        Commands::Answer(args) => practice::answer(ctx, args, format, pretty).await,
        Commands::Grade(args) => practice::grade(ctx, args, format, pretty, cancel).await,
        Commands::Generate(args) => practice::generate(ctx, args, format, pretty, cancel).await,
        Commands::Status(args) => progress::status(ctx, args, format, pretty),
        Commands::Stats => progress::stats(ctx, format, pretty),
        Commands::Reset(args) => progress::reset(ctx, args, format, pretty).await,
        Commands::Providers => providers::providers(ctx, format, pretty),
    }
}
