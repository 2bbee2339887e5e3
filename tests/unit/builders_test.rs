//! Tests for builders

use std::sync::Arc;

use regatta_scheduler::builders::{build_coordinator, CoordinatorBuilder};
use regatta_scheduler::config::ServiceConfig;
use regatta_scheduler::core::OptimizationError;
use regatta_scheduler::infra::InMemoryTournamentStore;

#[test]
fn test_builder_requires_store() {
    let err = CoordinatorBuilder::new().build().unwrap_err();
    assert!(matches!(err, OptimizationError::Store(_)));
}

#[test]
fn test_builder_rejects_invalid_config() {
    let err = CoordinatorBuilder::new()
        .config(ServiceConfig::default().with_progress_buffer(0))
        .store(Arc::new(InMemoryTournamentStore::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, OptimizationError::InvalidProblem(_)));
}

#[test]
fn test_build_coordinator_with_defaults() {
    let coordinator = build_coordinator(&ServiceConfig::default(), Arc::new(InMemoryTournamentStore::new())).unwrap();
    assert_eq!(coordinator.active_jobs(), 0);
    assert_eq!(coordinator.cached_results(), 0);
    assert_eq!(coordinator.config().progress_buffer, 256);
}

#[test]
fn test_build_coordinator_missing_presets_file() {
    let cfg = ServiceConfig {
        settings_file: Some("/nonexistent/regatta-presets.json".to_string()),
        ..ServiceConfig::default()
    };
    let err = build_coordinator(&cfg, Arc::new(InMemoryTournamentStore::new())).unwrap_err();
    assert!(matches!(err, OptimizationError::InvalidProblem(_)));
}
