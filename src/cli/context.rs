//! Per-invocation state shared by every command.

use std::sync::Arc;

use crate::core::cascade::Cascade;
use crate::core::generation::QuestionGenerator;
use crate::core::grading::GradingPipeline;
use crate::core::health::ProviderHealth;
use crate::core::scheduler::Scheduler;
use crate::error::Result;
use crate::providers::{ClientFactory, HttpClientFactory};
use crate::storage::config::{CliOverrides, ResolvedConfig};
use crate::storage::progress::MemoryProgressStore;
use crate::storage::progress_db::ProgressDb;

/// Resolved config, hydrated progress, and this run's provider health.
pub struct AppContext {
    pub config: ResolvedConfig,
    pub store: Arc<MemoryProgressStore>,
    pub db: ProgressDb,
    pub health: ProviderHealth,
    factory: Arc<dyn ClientFactory>,
}

impl AppContext {
    /// Resolve configuration and open the database.
    ///
    /// # Errors
    /// Returns error if configuration is invalid or the database cannot be
    /// opened.
    pub fn load(overrides: &CliOverrides) -> Result<Self> {
        let config = ResolvedConfig::resolve(overrides)?;
        Self::from_config(config, Arc::new(HttpClientFactory::new()?))
    }

    /// Build from an already resolved config and a client factory.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened.
    pub fn from_config(config: ResolvedConfig, factory: Arc<dyn ClientFactory>) -> Result<Self> {
        tracing::debug!(
            config = %config.config_path.display(),
            database = %config.database.display(),
            policy = config.failure_policy.as_str(),
            "Loading context"
        );
        let db = ProgressDb::open(&config.database)?;
        let store = Arc::new(db.load_store()?);
        Ok(Self {
            config,
            store,
            db,
            health: ProviderHealth::new(),
            factory,
        })
    }

    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.store.clone(), self.config.failure_policy)
    }

    #[must_use]
    pub fn cascade(&self) -> Cascade {
        Cascade::new(
            self.config.ai.clone(),
            self.health.clone(),
            self.factory.clone(),
        )
    }

    /// Grading pipeline that persists to the progress database.
    #[must_use]
    pub fn pipeline(&self) -> GradingPipeline {
        GradingPipeline::new(self.scheduler(), self.cascade()).with_sink(Arc::new(self.db.clone()))
    }

    #[must_use]
    pub fn generator(&self) -> QuestionGenerator {
        QuestionGenerator::new(self.cascade(), self.scheduler())
    }
}
