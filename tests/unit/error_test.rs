//! Tests for error types

use regatta_scheduler::core::OptimizationError;

#[test]
fn test_invalid_problem_error() {
    let err = OptimizationError::InvalidProblem("boat pool is empty".to_string());
    assert_eq!(format!("{}", err), "invalid problem: boat pool is empty");
}

#[test]
fn test_already_running_error() {
    let err = OptimizationError::AlreadyRunning(12);
    assert_eq!(format!("{}", err), "optimization already running for tournament 12");
}

#[test]
fn test_cancelled_error() {
    let err = OptimizationError::Cancelled;
    assert_eq!(format!("{}", err), "optimization cancelled");
}

#[test]
fn test_unknown_settings_error() {
    let err = OptimizationError::UnknownSettings("turbo".to_string());
    assert_eq!(format!("{}", err), "unknown optimizer settings `turbo`");
}

#[test]
fn test_rejections_happen_before_a_worker() {
    assert!(OptimizationError::InvalidProblem(String::new()).is_rejection());
    assert!(OptimizationError::AlreadyRunning(1).is_rejection());
    assert!(OptimizationError::TournamentNotFound(1).is_rejection());
    assert!(!OptimizationError::Cancelled.is_rejection());
    assert!(!OptimizationError::InternalFault("panic".to_string()).is_rejection());
}
