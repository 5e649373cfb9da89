//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::core::health::HealthWarning;
use crate::error::Result;
use robot::RobotOutput;

/// Print a command result in the requested format.
///
/// Human output goes to stdout with any warnings as a banner on stderr.
/// JSON output carries warnings inside the envelope.
///
/// # Errors
/// Returns error if JSON serialization fails.
pub fn emit<T: Serialize>(
    command: &str,
    data: &T,
    render_human: impl FnOnce(&T) -> String,
    notices: Vec<HealthWarning>,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = RobotOutput::new(command, data).with_notices(notices);
            println!("{}", robot::render_json(&output, pretty)?);
        }
        OutputFormat::Human => {
            let text = render_human(data);
            println!("{}", text.trim_end());
            if let Some(banner) = human::render_notice_banner(&notices) {
                eprintln!("{banner}");
            }
        }
    }
    Ok(())
}
