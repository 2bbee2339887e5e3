//! HTTP router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use regatta_scheduler::builders::CoordinatorBuilder;
use regatta_scheduler::config::{OptimizerSettings, SettingsChoice};
use regatta_scheduler::core::{Boat, JobCoordinator, JobState, Team, TournamentInputs};
use regatta_scheduler::infra::InMemoryTournamentStore;
use regatta_scheduler::runtime::router;
use serde_json::Value;
use tower::ServiceExt;

fn quick_inputs(teams: u32, boats: u32) -> TournamentInputs {
    let mut settings = OptimizerSettings::default();
    settings.match_matrix.loops = 200;
    settings.match_matrix.individuals = 20;
    settings.boat_schedule.loops = 200;
    settings.boat_schedule.individuals = 20;
    TournamentInputs {
        teams: (0..teams).map(|i| Team::new(format!("t{i}"), format!("Team {i}"), i)).collect(),
        boats: (0..boats).map(|i| Boat::new(format!("b{i}"), format!("Boat {i}"), i)).collect(),
        flights: 2,
        settings: SettingsChoice::Custom(settings),
    }
}

fn app() -> (Router, JobCoordinator) {
    let store = Arc::new(InMemoryTournamentStore::new());
    store.insert_tournament(1, quick_inputs(6, 3));
    store.insert_tournament(2, quick_inputs(1, 1));
    let coordinator = CoordinatorBuilder::new().store(store).build().unwrap();
    (router(coordinator.clone()), coordinator)
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["activeJobs"], 0);
}

#[tokio::test]
async fn test_start_then_fetch_result() {
    let (app, coordinator) = app();

    let (status, body) = send(&app, "POST", "/optimization/1/start").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["tournamentId"], 1);
    assert_eq!(body["status"], "running");
    assert_eq!(body["fromCache"], false);

    let state = coordinator.wait_for_terminal_async(1, Duration::from_secs(60)).await;
    assert_eq!(state, Some(JobState::Completed));

    let (status, body) = send(&app, "GET", "/optimization/1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["hasResult"], true);
    assert_eq!(body["isRunning"], false);

    let (status, body) = send(&app, "GET", "/optimization/1/result").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teamIds"].as_array().map(Vec::len), Some(6));
    assert_eq!(body["matchMatrix"]["flights"].as_array().map(Vec::len), Some(2));

    let (status, body) = send(&app, "POST", "/optimization/1/start").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["fromCache"], true);
}

#[tokio::test]
async fn test_invalid_problem_is_bad_request() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/optimization/2/start").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_problem");
}

#[tokio::test]
async fn test_unknown_tournament_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/optimization/42/start").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "tournament_not_found");
}

#[tokio::test]
async fn test_result_missing_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/optimization/1/result").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "no_result");
}

#[tokio::test]
async fn test_cancel_always_succeeds() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/optimization/1/cancel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn test_progress_stream_ends_with_completed() {
    let (app, _) = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/optimization/1/progress").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let (status, _) = send(&app, "POST", "/optimization/1/start").await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let bytes = tokio::time::timeout(Duration::from_secs(60), response.into_body().collect())
        .await
        .unwrap()
        .unwrap()
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: started"));
    assert!(text.contains("event: completed"));
    assert!(text.trim_end().ends_with('}'));
}
