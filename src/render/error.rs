//! Error rendering for the `gym` binary.
//!
//! Human output is a short block with the error code, the first fix
//! suggestion and its context. JSON output carries every suggestion for
//! scripts and agents.

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::GymError;

/// Render an error for stderr.
#[must_use]
pub fn render_error(error: &GymError, format: OutputFormat, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => render_human(error),
    }
}

fn render_human(error: &GymError) -> String {
    let suggestions = error.fix_suggestions();
    let mut lines = vec![format!(
        "{} {} {}",
        "error:".red().bold(),
        error,
        format!("[{}]", error.error_code()).dimmed()
    )];

    if let Some(suggestion) = suggestions.first() {
        let commands: Vec<_> = suggestion
            .commands
            .iter()
            .filter(|c| !c.starts_with('#'))
            .collect();
        if !commands.is_empty() {
            lines.push(String::new());
            lines.push("How to fix:".bold().to_string());
            for (i, cmd) in commands.iter().enumerate() {
                lines.push(format!("  {}. {}", i + 1, cmd.cyan()));
            }
        }
        if !suggestion.context.is_empty() {
            lines.push(String::new());
            lines.push(format!("{} {}", "Why:".bold(), suggestion.context));
        }
        if let Some(prevention) = &suggestion.prevention {
            lines.push(format!("{} {prevention}", "Tip:".green().bold()));
        }
        if let Some(url) = &suggestion.doc_url {
            lines.push(format!("{} {}", "Docs:".dimmed(), url.underline()));
        }
    }
    lines.join("\n")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    exit_code: i32,
    transient: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    suggestions: Vec<SuggestionJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionJson {
    commands: Vec<String>,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prevention: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc_url: Option<String>,
}

/// Render an error as JSON.
#[must_use]
pub fn render_error_json(error: &GymError, pretty: bool) -> String {
    let json = ErrorJson {
        error_code: error.error_code(),
        category: error.category().to_string(),
        message: error.to_string(),
        exit_code: error.exit_code().into(),
        transient: error.is_transient(),
        provider: error.provider().map(String::from),
        model: error.model().map(String::from),
        suggestions: error
            .fix_suggestions()
            .into_iter()
            .map(|s| SuggestionJson {
                commands: s.commands,
                context: s.context,
                prevention: s.prevention,
                doc_url: s.doc_url,
            })
            .collect(),
    };
    let rendered = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    rendered.unwrap_or_else(|_| format!("error [{}]: {error}", error.error_code()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::strip_ansi_codes;
    use serde_json::Value;

    #[test]
    fn json_carries_code_and_exit() {
        let err = GymError::AllProvidersFailed {
            attempted: 2,
            failures: vec!["a".into(), "b".into()],
        };
        let json: Value = serde_json::from_str(&render_error_json(&err, false)).unwrap();
        assert_eq!(json["errorCode"], "GYM-P010");
        assert_eq!(json["exitCode"], 2);
        assert!(!json["suggestions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn human_has_code_and_fix() {
        let err = GymError::EnvVarMissing {
            name: "GEMINI_API_KEY".into(),
        };
        let text = strip_ansi_codes(&render_error(&err, OutputFormat::Human, false));
        assert!(text.starts_with("error: "));
        assert!(text.contains("[GYM-C003]"));
        assert!(text.contains("GEMINI_API_KEY"));
    }
}
