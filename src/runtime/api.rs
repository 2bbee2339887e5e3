//! HTTP surface of the optimization service.
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | POST | `/optimization/:id/start` | 202 |
//! | POST | `/optimization/:id/cancel` | 200 |
//! | GET | `/optimization/:id/status` | 200 |
//! | GET | `/optimization/:id/result` | 200, 404 without result |
//! | GET | `/optimization/:id/progress` | SSE stream |
//! | GET | `/health` | 200 |

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::{JobCoordinator, JobStatus, OptimizationError, StartOutcome, StatusReport, TournamentId};

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Engine or coordinator error.
    #[error(transparent)]
    Optimization(#[from] OptimizationError),
    /// The tournament has no persisted schedule.
    #[error("no schedule for tournament {0}")]
    NoResult(TournamentId),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Optimization(err) => match err {
                OptimizationError::InvalidProblem(_) => (StatusCode::BAD_REQUEST, "invalid_problem"),
                OptimizationError::UnknownSettings(_) => (StatusCode::BAD_REQUEST, "unknown_settings"),
                OptimizationError::AlreadyRunning(_) => (StatusCode::CONFLICT, "already_running"),
                OptimizationError::TournamentNotFound(_) => (StatusCode::NOT_FOUND, "tournament_not_found"),
                OptimizationError::Cancelled => (StatusCode::CONFLICT, "cancelled"),
                OptimizationError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
                OptimizationError::InternalFault(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_fault"),
            },
            Self::NoResult(_) => (StatusCode::NOT_FOUND, "no_result"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": { "code": code, "message": self.to_string() }
        }));
        (status, body).into_response()
    }
}

/// Response of a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    /// Tournament.
    pub tournament_id: TournamentId,
    /// `running` for a new run, `completed` for a cache hit.
    pub status: JobStatus,
    /// Whether the schedule was served from the cache.
    pub from_cache: bool,
    /// Identifier of the new run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

/// Response of a cancel request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// Tournament.
    pub tournament_id: TournamentId,
    /// Whether a run was active and got flagged.
    pub cancelled: bool,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Runs currently searching.
    pub active_jobs: usize,
    /// Results held by the cache.
    pub cached_results: usize,
}

/// Router exposing the coordinator.
pub fn router(coordinator: JobCoordinator) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/optimization/:id/start", post(start))
        .route("/optimization/:id/cancel", post(cancel))
        .route("/optimization/:id/status", get(status))
        .route("/optimization/:id/result", get(result))
        .route("/optimization/:id/progress", get(progress))
        .with_state(coordinator)
}

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error when binding or serving fails.
pub async fn serve(coordinator: JobCoordinator, addr: &str) -> crate::core::AppResult<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "optimization service listening");
    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("optimization service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Return a health payload.
async fn health(State(coordinator): State<JobCoordinator>) -> Json<Health> {
    Json(Health {
        ok: true,
        active_jobs: coordinator.active_jobs(),
        cached_results: coordinator.cached_results(),
    })
}

async fn start(
    State(coordinator): State<JobCoordinator>,
    Path(id): Path<TournamentId>,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let response = match coordinator.start(id).await? {
        StartOutcome::Started { run_id, .. } => StartResponse {
            tournament_id: id,
            status: JobStatus::Running,
            from_cache: false,
            run_id: Some(run_id),
        },
        StartOutcome::Cached(_) => StartResponse {
            tournament_id: id,
            status: JobStatus::Completed,
            from_cache: true,
            run_id: None,
        },
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

async fn cancel(State(coordinator): State<JobCoordinator>, Path(id): Path<TournamentId>) -> Json<CancelResponse> {
    let cancelled = coordinator.cancel(id);
    Json(CancelResponse { tournament_id: id, cancelled })
}

async fn status(
    State(coordinator): State<JobCoordinator>,
    Path(id): Path<TournamentId>,
) -> Result<Json<StatusReport>, ApiError> {
    Ok(Json(coordinator.status(id).await?))
}

async fn result(State(coordinator): State<JobCoordinator>, Path(id): Path<TournamentId>) -> Result<Response, ApiError> {
    coordinator
        .result(id)
        .await?
        .map(|result| Json(result).into_response())
        .ok_or(ApiError::NoResult(id))
}

async fn progress(
    State(coordinator): State<JobCoordinator>,
    Path(id): Path<TournamentId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(tournament_id = id, "progress subscriber connected");
    let stream = coordinator.subscribe(id).into_stream().filter_map(|event| async move {
        match Event::default().event(event.kind.as_str()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                warn!(error = %e, "failed to serialize progress event");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
