//! Tests for configuration validation

use regatta_scheduler::config::{OptimizerSettings, ServiceConfig, SettingsChoice};

#[test]
fn test_default_settings_are_valid() {
    let settings = OptimizerSettings::default();
    assert!(settings.validate().is_ok());
    assert_eq!(settings.seed, 42);
    assert_eq!(settings.match_matrix.swap_teams, 2);
    assert_eq!(settings.match_matrix.max_branches, 1);
    assert!((settings.match_matrix.factor_team_missing - 20.01).abs() < f64::EPSILON);
    assert_eq!(settings.boat_schedule.swap_races, 2);
}

#[test]
fn test_settings_invalid_individuals() {
    let mut settings = OptimizerSettings::default();
    settings.boat_schedule.individuals = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_invalid_max_branches() {
    let mut settings = OptimizerSettings::default();
    settings.match_matrix.max_branches = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_non_finite_factor() {
    let mut settings = OptimizerSettings::default();
    settings.match_matrix.factor_less_participants = f64::NAN;
    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_from_json_uses_camel_case() {
    let json = r#"{
        "seed": 11,
        "matchMatrix": { "swapTeams": 4, "earlyStopping": 50 },
        "boatSchedule": { "weightStayOnBoat": 2.5 }
    }"#;

    let settings = OptimizerSettings::from_json_str(json).unwrap();
    assert_eq!(settings.seed, 11);
    assert_eq!(settings.match_matrix.swap_teams, 4);
    assert_eq!(settings.match_matrix.budget().early_stopping, Some(50));
    assert!((settings.boat_schedule.weight_stay_on_boat - 2.5).abs() < f64::EPSILON);
}

#[test]
fn test_settings_from_malformed_json() {
    assert!(OptimizerSettings::from_json_str("{ not json").is_err());
}

#[test]
fn test_settings_choice_wire_format() {
    let named: SettingsChoice = serde_json::from_str(r#"{"kind": "named", "value": "fast"}"#).unwrap();
    assert_eq!(named, SettingsChoice::Named("fast".to_string()));
    let default: SettingsChoice = serde_json::from_str(r#"{"kind": "default"}"#).unwrap();
    assert_eq!(default, SettingsChoice::Default);
}

#[test]
fn test_service_config_validation() {
    assert!(ServiceConfig::default().validate().is_ok());
    assert!(ServiceConfig::default().with_progress_buffer(0).validate().is_err());
    assert!(ServiceConfig::default().with_bind_addr(" ").validate().is_err());
}
