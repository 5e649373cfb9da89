//! Storage: configuration and progress persistence.

pub mod config;
pub mod paths;
pub mod progress;
pub mod progress_db;
pub mod progress_schema;

pub use config::{
    CliOverrides, Config, ConfigSource, ConfigSources, ENV_CONFIG, ENV_DATABASE,
    ENV_FAILURE_POLICY, ENV_TIMEOUT_MS, ResolvedConfig,
};
pub use paths::AppPaths;
pub use progress::{MemoryProgressStore, ProgressSink, ProgressStore};
pub use progress_db::ProgressDb;
