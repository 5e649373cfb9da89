//! gym - Leitner-box practice with AI grading
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use studygym::cli::{AppContext, Cli};
use studygym::core::logging::{self, LogFormat, LogLevel, LogSettings};
use studygym::render::error::render_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = LogSettings::resolve(
        cli.log_level.as_deref().and_then(LogLevel::from_arg),
        cli.json_output.then_some(LogFormat::Json),
        None,
        cli.verbose,
    );
    logging::init(&settings);

    if !studygym::util::env::should_use_color(cli.no_color) {
        colored::control::set_override(false);
    }

    let format = cli.effective_format();
    let pretty = cli.pretty;

    let Some(command) = &cli.command else {
        print_quickstart();
        return ExitCode::SUCCESS;
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = match AppContext::load(&cli.overrides()) {
        Ok(ctx) => studygym::cli::dispatch(&ctx, command, format, pretty, &cancel).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(code = e.error_code(), error = %e, "Command failed");
            eprintln!("{}", render_error(&e, format, pretty));
            ExitCode::from(u8::try_from(i32::from(e.exit_code())).unwrap_or(1))
        }
    }
}

/// Print quickstart help when no command is given.
fn print_quickstart() {
    println!(
        r"gym - Leitner-box practice with AI grading

USAGE:
    gym [OPTIONS] <COMMAND>

QUICK START:
    gym next --skills fractions,decimals   # What to practise now
    gym generate fractions                 # Ask AI for a question
    gym grade fractions -q '1/2+1/4?' -a '3/4'
    gym answer fractions --correct         # Self-grade instead
    gym status                             # Boxes and due dates
    gym stats                              # XP, retention, trends

PROVIDERS:
    gym providers                          # Cascade order and keys

ROBOT MODE (for scripts and agents):
    gym status --json
    gym stats --json --pretty

For more help: gym --help"
    );
    println!("\nVersion: {}", env!("CARGO_PKG_VERSION"));
}
