//! Configuration file loading and resolution.
//!
//! The config file lives at `<config dir>/studygym/config.toml` and is
//! optional. `GYM_CONFIG` points at another file.
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `GYM_CONFIG`: config file path
//! - `GYM_FAILURE_POLICY`: `reset` or `step-back`
//! - `GYM_TIMEOUT_MS`: default per-provider timeout
//! - `GYM_DATABASE`: progress database path

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::leitner::FailurePolicy;
use crate::core::provider::AiConfig;
use crate::error::{GymError, Result};
use crate::util::env::non_empty_var;

pub const ENV_CONFIG: &str = "GYM_CONFIG";
pub const ENV_FAILURE_POLICY: &str = "GYM_FAILURE_POLICY";
pub const ENV_TIMEOUT_MS: &str = "GYM_TIMEOUT_MS";
pub const ENV_DATABASE: &str = "GYM_DATABASE";

/// Default number of items in a practice session.
pub const DEFAULT_SESSION_SIZE: usize = 10;

// =============================================================================
// Config File
// =============================================================================

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub failure_policy: FailurePolicy,
    pub session_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            session_size: DEFAULT_SESSION_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Progress database path; the data directory default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl Config {
    /// Load a config file. A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns [`GymError::ConfigParse`] if the file exists but is not valid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parse config TOML. `path` is only used in error messages.
    ///
    /// # Errors
    /// Returns [`GymError::ConfigParse`] on malformed TOML.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| GymError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| GymError::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Check values that deserialize fine but cannot be used.
    ///
    /// # Errors
    /// Returns [`GymError::ConfigInvalid`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.session_size == 0 {
            return Err(invalid("scheduler.session_size", "0", "must be at least 1"));
        }
        if self.ai.max_tokens == 0 {
            return Err(invalid("ai.max_tokens", "0", "must be at least 1"));
        }
        if self.ai.json_max_tokens == 0 {
            return Err(invalid("ai.json_max_tokens", "0", "must be at least 1"));
        }
        if self.ai.timeout_ms == Some(0) {
            return Err(invalid("ai.timeout_ms", "0", "must be at least 1"));
        }
        self.ai.build_cascade().map(|_| ())
    }
}

fn invalid(key: &str, value: &str, message: &str) -> GymError {
    GymError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigSource {
    Cli,
    Env,
    ConfigFile,
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Source of each overridable setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSources {
    pub config_path: ConfigSource,
    pub failure_policy: ConfigSource,
    pub timeout: ConfigSource,
    pub database: ConfigSource,
}

/// Settings given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub failure_policy: Option<FailurePolicy>,
    pub timeout_ms: Option<u64>,
    pub database: Option<PathBuf>,
}

/// Final configuration after merging every source.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub config_path: PathBuf,
    /// `[ai]` with the resolved default timeout applied.
    pub ai: AiConfig,
    pub failure_policy: FailurePolicy,
    pub session_size: usize,
    pub database: PathBuf,
    pub paths: AppPaths,
    pub sources: ConfigSources,
}

impl ResolvedConfig {
    /// Resolve against the process environment and the default directories.
    ///
    /// # Errors
    /// Returns an error if the config file is malformed or any resolved value
    /// is invalid.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        Self::resolve_with(cli, AppPaths::new(), non_empty_var)
    }

    /// Resolve with an explicit directory layout and environment lookup.
    ///
    /// # Errors
    /// See [`ResolvedConfig::resolve`].
    pub fn resolve_with(
        cli: &CliOverrides,
        paths: AppPaths,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut sources = ConfigSources::default();

        let config_path = pick(
            cli.config_path.clone(),
            env(ENV_CONFIG).map(PathBuf::from),
            None,
            &mut sources.config_path,
        )
        .unwrap_or_else(|| paths.config_file());

        let config = Config::load_from(&config_path)?;

        let env_policy = env(ENV_FAILURE_POLICY)
            .map(|v| FailurePolicy::from_str(&v))
            .transpose()?;
        let failure_policy = pick(
            cli.failure_policy,
            env_policy,
            Some(config.scheduler.failure_policy),
            &mut sources.failure_policy,
        )
        .unwrap_or_default();

        let env_timeout = env(ENV_TIMEOUT_MS)
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|_| invalid(ENV_TIMEOUT_MS, &v, "expected milliseconds"))
            })
            .transpose()?;
        let timeout_ms = pick(
            cli.timeout_ms,
            env_timeout,
            config.ai.timeout_ms,
            &mut sources.timeout,
        );

        let database = pick(
            cli.database.clone(),
            env(ENV_DATABASE).map(PathBuf::from),
            config.storage.database.clone(),
            &mut sources.database,
        )
        .unwrap_or_else(|| paths.database_file());

        let mut ai = config.ai;
        ai.timeout_ms = timeout_ms;
        let resolved = Config {
            ai,
            scheduler: SchedulerConfig {
                failure_policy,
                session_size: config.scheduler.session_size,
            },
            storage: StorageConfig {
                database: Some(database.clone()),
            },
        };
        resolved.validate()?;

        Ok(Self {
            config_path,
            ai: resolved.ai,
            failure_policy,
            session_size: resolved.scheduler.session_size,
            database,
            paths,
            sources,
        })
    }
}

/// First present value in precedence order, recording where it came from.
fn pick<T>(cli: Option<T>, env: Option<T>, file: Option<T>, source: &mut ConfigSource) -> Option<T> {
    let (value, from) = if cli.is_some() {
        (cli, ConfigSource::Cli)
    } else if env.is_some() {
        (env, ConfigSource::Env)
    } else if file.is_some() {
        (file, ConfigSource::ConfigFile)
    } else {
        (None, ConfigSource::Default)
    };
    *source = from;
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::core::provider::ProviderKind;
    use crate::test_utils::{TestDir, make_test_config_toml};

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_file_is_default() {
        let config = Config::load_from(Path::new("/nonexistent/gym/config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scheduler.session_size, 10);
        assert_eq!(config.ai.routing.len(), 4);
    }

    #[test]
    fn parses_every_section() {
        let config = Config::parse(&make_test_config_toml(), Path::new("x.toml")).unwrap();
        assert_eq!(config.ai.max_tokens, 1024);
        assert_eq!(config.scheduler.failure_policy, FailurePolicy::StepBack);
        assert_eq!(config.scheduler.session_size, 5);
        assert_eq!(config.ai.custom_providers[0].id, "lmstudio");
        assert!(config.validate().is_ok());

        let cascade = config.ai.build_cascade().unwrap();
        let ids: Vec<_> = cascade.iter().map(|d| d.provider_id.as_str()).collect();
        assert_eq!(ids, vec!["gemini", "anthropic", "custom:lmstudio"]);
    }

    #[test]
    fn malformed_toml_names_path() {
        let err = Config::parse("[ai\nmax_tokens = ", Path::new("/etc/gym.toml")).unwrap_err();
        match err {
            GymError::ConfigParse { path, .. } => assert_eq!(path, "/etc/gym.toml"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn unknown_policy_is_parse_error() {
        let toml = "[scheduler]\nfailure_policy = \"forgive\"\n";
        assert!(Config::parse(toml, Path::new("c.toml")).is_err());
    }

    #[test]
    fn zero_session_size_is_invalid() {
        let mut config = Config::default();
        config.scheduler.session_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scheduler.session_size"));
    }

    #[test]
    fn custom_priority_on_builtin_band_is_invalid() {
        let toml = r#"
[[ai.custom_providers]]
id = "dup"
base_url = "http://localhost:9/v1"
model = "m"
priority = 2.0
"#;
        let config = Config::parse(toml, Path::new("c.toml")).unwrap();
        assert!(matches!(config.validate(), Err(GymError::ConfigInvalid { .. })));
    }

    #[test]
    fn custom_priority_outside_builtin_range_is_invalid() {
        for priority in ["0.5", "4.5"] {
            let toml = format!(
                "[[ai.custom_providers]]\nid = \"edge\"\nbase_url = \"http://localhost:9/v1\"\n\
                 model = \"m\"\npriority = {priority}\n"
            );
            let config = Config::parse(&toml, Path::new("c.toml")).unwrap();
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains("strictly between"),
                "priority {priority}: {err}"
            );
        }
    }

    #[test]
    fn save_and_reload() {
        let dir = TestDir::new();
        let path = dir.file_path("nested/config.toml");
        let mut config = Config::default();
        config.scheduler.failure_policy = FailurePolicy::StepBack;
        config.ai.routing[0].model = Some("gemini-1.5-pro".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn defaults_without_any_source() {
        let dir = TestDir::new();
        let paths = AppPaths::rooted(dir.path());
        let resolved =
            ResolvedConfig::resolve_with(&CliOverrides::default(), paths.clone(), env_of(&[]))
                .unwrap();
        assert_eq!(resolved.failure_policy, FailurePolicy::Reset);
        assert_eq!(resolved.database, paths.database_file());
        assert_eq!(resolved.ai.timeout_ms, None);
        assert_eq!(resolved.sources.database, ConfigSource::Default);
    }

    #[test]
    fn precedence_cli_env_file() {
        let dir = TestDir::new();
        dir.create_file(
            "gym.toml",
            "[ai]\ntimeout_ms = 1000\n[scheduler]\nfailure_policy = \"step-back\"\n\
             [storage]\ndatabase = \"/file/db.sqlite\"\n",
        );
        let config_path = dir.file_path("gym.toml");
        let config_env = config_path.display().to_string();
        let pairs = [
            (ENV_CONFIG, config_env.as_str()),
            (ENV_TIMEOUT_MS, "2000"),
            (ENV_DATABASE, "/env/db.sqlite"),
        ];
        let env = env_of(&pairs);
        let cli = CliOverrides {
            database: Some(PathBuf::from("/cli/db.sqlite")),
            ..CliOverrides::default()
        };

        let resolved =
            ResolvedConfig::resolve_with(&cli, AppPaths::rooted(dir.path()), env).unwrap();

        assert_eq!(resolved.config_path, config_path);
        assert_eq!(resolved.sources.config_path, ConfigSource::Env);
        assert_eq!(resolved.failure_policy, FailurePolicy::StepBack);
        assert_eq!(resolved.sources.failure_policy, ConfigSource::ConfigFile);
        assert_eq!(resolved.ai.timeout_ms, Some(2000));
        assert_eq!(resolved.sources.timeout, ConfigSource::Env);
        assert_eq!(resolved.database, PathBuf::from("/cli/db.sqlite"));
        assert_eq!(resolved.sources.database, ConfigSource::Cli);

        let gemini = resolved
            .ai
            .build_cascade()
            .unwrap()
            .into_iter()
            .find(|d| d.kind == ProviderKind::Gemini)
            .unwrap();
        assert_eq!(gemini.timeout_ms, Some(2000));
    }

    #[test]
    fn bad_env_values_are_rejected() {
        let dir = TestDir::new();
        let paths = AppPaths::rooted(dir.path());
        let err = ResolvedConfig::resolve_with(
            &CliOverrides::default(),
            paths.clone(),
            env_of(&[(ENV_TIMEOUT_MS, "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, GymError::ConfigInvalid { .. }));

        let err = ResolvedConfig::resolve_with(
            &CliOverrides::default(),
            paths,
            env_of(&[(ENV_FAILURE_POLICY, "lenient")]),
        )
        .unwrap_err();
        assert!(matches!(err, GymError::ConfigInvalid { .. }));
    }

    #[test]
    fn source_display() {
        assert_eq!(ConfigSource::Env.to_string(), "environment variable");
    }
}
