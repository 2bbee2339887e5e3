//! Tests for problem fingerprints

use regatta_scheduler::config::OptimizerSettings;
use regatta_scheduler::core::{fingerprint, Boat, Team};

fn teams() -> Vec<Team> {
    (0..8).map(|i| Team::new(format!("team-{i}"), format!("Team {i}"), i)).collect()
}

fn boats() -> Vec<Boat> {
    (0..4).map(|i| Boat::new(format!("boat-{i}"), format!("Boat {i}"), i)).collect()
}

#[test]
fn test_fingerprint_is_deterministic() {
    let settings = OptimizerSettings::default();
    let a = fingerprint(&teams(), &boats(), 3, &settings).unwrap();
    let b = fingerprint(&teams(), &boats(), 3, &settings).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_fingerprint_changes_with_roster_identity() {
    let settings = OptimizerSettings::default();
    let base = fingerprint(&teams(), &boats(), 3, &settings).unwrap();
    let mut other = teams();
    other[0].id = "team-x".to_string();
    assert_ne!(base, fingerprint(&other, &boats(), 3, &settings).unwrap());
}

#[test]
fn test_fingerprint_sensitive_to_every_setting() {
    let base_settings = OptimizerSettings::default();
    let base = fingerprint(&teams(), &boats(), 3, &base_settings).unwrap();

    let variants: Vec<Box<dyn Fn(&mut OptimizerSettings)>> = vec![
        Box::new(|s| s.seed += 1),
        Box::new(|s| s.match_matrix.swap_teams += 1),
        Box::new(|s| s.match_matrix.max_branches += 1),
        Box::new(|s| s.match_matrix.factor_less_participants += 0.5),
        Box::new(|s| s.match_matrix.factor_team_missing += 0.5),
        Box::new(|s| s.match_matrix.loops += 1),
        Box::new(|s| s.match_matrix.individuals += 1),
        Box::new(|s| s.match_matrix.early_stopping = 10),
        Box::new(|s| s.match_matrix.show_every_n += 1),
        Box::new(|s| s.boat_schedule.swap_boats += 1),
        Box::new(|s| s.boat_schedule.swap_races += 1),
        Box::new(|s| s.boat_schedule.weight_stay_on_boat += 0.5),
        Box::new(|s| s.boat_schedule.weight_stay_on_shuttle += 0.5),
        Box::new(|s| s.boat_schedule.weight_change_between_boats += 0.5),
        Box::new(|s| s.boat_schedule.loops += 1),
        Box::new(|s| s.boat_schedule.individuals += 1),
        Box::new(|s| s.boat_schedule.early_stopping = 10),
        Box::new(|s| s.boat_schedule.show_every_n += 1),
    ];

    for (idx, mutate) in variants.iter().enumerate() {
        let mut settings = base_settings.clone();
        mutate(&mut settings);
        let changed = fingerprint(&teams(), &boats(), 3, &settings).unwrap();
        assert_ne!(base, changed, "setting variant {idx} did not change the fingerprint");
    }
}

#[test]
fn test_fingerprint_ignores_presentation() {
    let settings = OptimizerSettings::default();
    let base = fingerprint(&teams(), &boats(), 3, &settings).unwrap();
    let mut recolored = boats();
    for boat in &mut recolored {
        boat.color = Some("blue".to_string());
        boat.name = format!("Renamed {}", boat.id);
    }
    assert_eq!(base, fingerprint(&teams(), &recolored, 3, &settings).unwrap());
}
