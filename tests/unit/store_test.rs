//! Tests for the in-memory tournament store and settings presets

use regatta_scheduler::config::{OptimizerSettings, SettingsChoice};
use regatta_scheduler::core::{Boat, OptimizationError, SettingsProvider, Team, TournamentInputs, TournamentStore};
use regatta_scheduler::infra::{InMemoryTournamentStore, SettingsRegistry};

fn inputs() -> TournamentInputs {
    TournamentInputs {
        teams: vec![Team::new("a", "Alpha", 0), Team::new("b", "Bravo", 1)],
        boats: vec![Boat::new("x", "X-Ray", 0), Boat::new("y", "Yankee", 1)],
        flights: 2,
        settings: SettingsChoice::Named("fast".to_string()),
    }
}

#[tokio::test]
async fn test_store_round_trip() {
    let store = InMemoryTournamentStore::new();
    store.insert_tournament(5, inputs());
    assert_eq!(store.tournament_count(), 1);
    assert_eq!(store.load_tournament_inputs(5).await.unwrap(), inputs());
    assert!(store.load_schedule_result(5).await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_unknown_tournament() {
    let store = InMemoryTournamentStore::new();
    let err = store.load_tournament_inputs(99).await.unwrap_err();
    assert_eq!(err, OptimizationError::TournamentNotFound(99));
}

#[test]
fn test_inputs_json_shape() {
    let json = serde_json::to_value(inputs()).unwrap();
    assert_eq!(json["flights"], 2);
    assert_eq!(json["settings"]["kind"], "named");
    assert_eq!(json["boats"][0]["color"], serde_json::Value::Null);
}

#[test]
fn test_registry_resolves_named_preset() {
    let fast = OptimizerSettings::default().with_seed(7);
    let registry = SettingsRegistry::default().with_preset("fast", fast.clone());
    assert_eq!(registry.resolve(&inputs().settings).unwrap(), fast);
}
