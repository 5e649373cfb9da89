//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use crate::core::leitner::FailurePolicy;
use crate::storage::config::CliOverrides;

/// Leitner-box practice with AI grading.
#[derive(Parser, Debug)]
#[command(name = "gym")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSON logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    // === Config overrides ===
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Progress database path
    #[arg(long, value_name = "PATH", global = true)]
    pub database: Option<PathBuf>,

    /// What happens to a skill after a wrong answer
    #[arg(long, value_name = "POLICY", global = true)]
    pub failure_policy: Option<FailurePolicy>,

    /// Default per-provider timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,
}

impl Cli {
    #[must_use]
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }

    /// Config values given as flags.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            failure_policy: self.failure_policy,
            timeout_ms: self.timeout_ms,
            database: self.database.clone(),
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show what to practise next
    Next(NextArgs),

    /// Record a self-graded answer
    Answer(AnswerArgs),

    /// Grade a free-form answer with AI and record it
    Grade(GradeArgs),

    /// Generate a practice question
    Generate(GenerateArgs),

    /// Show progress for every tracked skill
    Status(StatusArgs),

    /// Show practice statistics
    Stats,

    /// Forget a skill's progress
    Reset(ResetArgs),

    /// Show the provider cascade
    Providers,
}

#[derive(Args, Debug, Default)]
pub struct NextArgs {
    /// Candidate skills (comma-separated). Defaults to every tracked skill.
    #[arg(long, value_delimiter = ',', value_name = "SKILLS")]
    pub skills: Vec<String>,

    /// Session size (defaults to [scheduler] session_size)
    #[arg(long, short = 'n', value_name = "N")]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("result").required(true).args(["correct", "incorrect"])))]
pub struct AnswerArgs {
    /// Skill key
    pub skill: String,

    /// The answer was right
    #[arg(long)]
    pub correct: bool,

    /// The answer was wrong
    #[arg(long)]
    pub incorrect: bool,

    /// Score from 0 to 100 (defaults to 100 or 0)
    #[arg(long, value_name = "SCORE", value_parser = parse_score)]
    pub score: Option<f64>,

    /// Time spent answering
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub duration_ms: u64,

    /// The answer was wrong because time ran out
    #[arg(long, requires = "incorrect")]
    pub timed_out: bool,
}

fn parse_score(value: &str) -> Result<f64, String> {
    let score: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=100.0).contains(&score) {
        Ok(score)
    } else {
        Err(format!("{score} is outside 0..=100"))
    }
}

#[derive(Args, Debug)]
pub struct GradeArgs {
    /// Skill key
    pub skill: String,

    /// The question that was asked
    #[arg(long, short = 'q')]
    pub question: String,

    /// The student's answer
    #[arg(long, short = 'a')]
    pub answer: String,

    /// A model answer for the grader
    #[arg(long)]
    pub reference: Option<String>,

    /// Time spent answering
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub duration_ms: u64,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Skill key, or `mix-<name>` for a mixed session
    pub skill: String,
}

#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Only skills due now, most overdue first
    #[arg(long)]
    pub due: bool,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Skill key
    pub skill: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn skills_are_comma_separated() {
        let cli = Cli::parse_from(["gym", "next", "--skills", "a,b", "-n", "3"]);
        match cli.command {
            Some(Commands::Next(args)) => {
                assert_eq!(args.skills, vec!["a", "b"]);
                assert_eq!(args.count, Some(3));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn answer_requires_a_result() {
        assert!(Cli::try_parse_from(["gym", "answer", "fractions"]).is_err());
        assert!(
            Cli::try_parse_from(["gym", "answer", "fractions", "--correct", "--incorrect"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["gym", "answer", "fractions", "--correct"]).is_ok());
    }

    #[test]
    fn score_must_be_a_percentage() {
        assert!(Cli::try_parse_from(["gym", "answer", "x", "--correct", "--score", "101"]).is_err());
        assert!(Cli::try_parse_from(["gym", "answer", "x", "--correct", "--score", "nan"]).is_err());
        let cli = Cli::parse_from(["gym", "answer", "x", "--incorrect", "--score", "40"]);
        match cli.command {
            Some(Commands::Answer(args)) => assert_eq!(args.score, Some(40.0)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn global_overrides() {
        let cli = Cli::parse_from([
            "gym",
            "status",
            "--json",
            "--failure-policy",
            "step-back",
            "--timeout-ms",
            "500",
        ]);
        assert_eq!(cli.effective_format(), OutputFormat::Json);
        let o = cli.overrides();
        assert_eq!(o.failure_policy, Some(FailurePolicy::StepBack));
        assert_eq!(o.timeout_ms, Some(500));
    }

    #[test]
    fn health_is_not_a_command() {
        assert!(Cli::try_parse_from(["gym", "health"]).is_err());
    }
}
