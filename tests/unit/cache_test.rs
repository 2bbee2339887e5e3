//! Tests for the in-memory result cache

use regatta_scheduler::core::{
    BoatSchedule, Fingerprint, MatchMatrix, ResultCache, ScheduleResult,
};
use regatta_scheduler::infra::InMemoryResultCache;

fn result(fingerprint: &Fingerprint, final_score: f64) -> ScheduleResult {
    ScheduleResult {
        fingerprint: fingerprint.clone(),
        seed: 42,
        team_ids: vec!["a".to_string(), "b".to_string()],
        boat_ids: vec!["x".to_string(), "y".to_string()],
        match_matrix: MatchMatrix { flights: Vec::new() },
        boat_schedule: BoatSchedule { flights: Vec::new() },
        saved_shuttles: 0,
        saved_shuttles_harbour: 0,
        saved_shuttles_sea: 0,
        boat_changes: 0,
        baseline_boat_changes: 0,
        match_score: 0.0,
        final_score,
        computation_time_ms: 10,
        from_cache: false,
    }
}

#[test]
fn test_cache_put_and_get() {
    let mut cache = InMemoryResultCache::new();
    let fp = Fingerprint::from_hex("abc123");
    assert!(cache.is_empty());
    cache.put(fp.clone(), result(&fp, 1.0));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&fp).map(|r| r.final_score), Some(1.0));
}

#[test]
fn test_cache_put_is_last_writer_wins() {
    let mut cache = InMemoryResultCache::new();
    let fp = Fingerprint::from_hex("abc123");
    cache.put(fp.clone(), result(&fp, 1.0));
    cache.put(fp.clone(), result(&fp, 2.0));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&fp).map(|r| r.final_score), Some(2.0));
}

#[test]
fn test_cache_remove() {
    let mut cache = InMemoryResultCache::new();
    let fp = Fingerprint::from_hex("abc123");
    cache.put(fp.clone(), result(&fp, 1.0));
    assert!(cache.remove(&fp).is_some());
    assert!(cache.get(&fp).is_none());
    assert!(cache.remove(&fp).is_none());
}
