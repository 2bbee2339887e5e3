//! Builders to construct a job coordinator from configuration.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::core::{JobCoordinator, OptimizationError, ResultCache, SettingsProvider, TournamentStore};
use crate::infra::{InMemoryResultCache, SettingsRegistry};

/// Step-by-step assembly of a [`JobCoordinator`].
///
/// The tournament store is required; the cache defaults to
/// [`InMemoryResultCache`] and settings default to [`SettingsRegistry`] with
/// built-in defaults.
#[derive(Default)]
pub struct CoordinatorBuilder {
    config: ServiceConfig,
    store: Option<Arc<dyn TournamentStore>>,
    cache: Option<Box<dyn ResultCache>>,
    settings: Option<Arc<dyn SettingsProvider>>,
}

impl CoordinatorBuilder {
    /// Start from default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Service configuration.
    #[must_use]
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Tournament store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn TournamentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Result cache.
    #[must_use]
    pub fn cache(mut self, cache: Box<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Settings provider.
    #[must_use]
    pub fn settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Validate configuration and assemble the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizationError::Store`] without a store, or
    /// [`OptimizationError::InvalidProblem`] for invalid configuration.
    pub fn build(self) -> Result<JobCoordinator, OptimizationError> {
        self.config
            .validate()
            .map_err(|e| OptimizationError::InvalidProblem(format!("config invalid: {e}")))?;
        let store = self
            .store
            .ok_or_else(|| OptimizationError::Store("no tournament store configured".into()))?;
        let cache = self.cache.unwrap_or_else(|| Box::new(InMemoryResultCache::new()));
        let settings = self.settings.unwrap_or_else(|| Arc::new(SettingsRegistry::default()));
        Ok(JobCoordinator::new(store, cache, settings, self.config))
    }
}

/// Build a coordinator from service configuration, loading settings presets
/// from `cfg.settings_file` when set.
///
/// # Errors
///
/// Returns [`OptimizationError::InvalidProblem`] when configuration or the
/// presets file is invalid.
pub fn build_coordinator(
    cfg: &ServiceConfig,
    store: Arc<dyn TournamentStore>,
) -> Result<JobCoordinator, OptimizationError> {
    let registry = match &cfg.settings_file {
        Some(path) => SettingsRegistry::from_file(path)
            .map_err(|e| OptimizationError::InvalidProblem(format!("settings presets invalid: {e}")))?,
        None => SettingsRegistry::default(),
    };
    CoordinatorBuilder::new()
        .config(cfg.clone())
        .store(store)
        .settings(Arc::new(registry))
        .build()
}
