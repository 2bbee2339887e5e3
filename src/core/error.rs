//! Error types for optimization operations.

use thiserror::Error;

use super::model::TournamentId;

/// Errors produced by the optimization engine and its coordinator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizationError {
    /// Inputs are empty or contradictory; rejected before any search starts.
    #[error("invalid problem: {0}")]
    InvalidProblem(String),
    /// A run is already active for the tournament.
    #[error("optimization already running for tournament {0}")]
    AlreadyRunning(TournamentId),
    /// The run was cancelled by the caller.
    #[error("optimization cancelled")]
    Cancelled,
    /// Unexpected fault during computation.
    #[error("internal fault: {0}")]
    InternalFault(String),
    /// The tournament store has no such tournament.
    #[error("tournament {0} not found")]
    TournamentNotFound(TournamentId),
    /// A named settings preset could not be resolved.
    #[error("unknown optimizer settings `{0}`")]
    UnknownSettings(String),
    /// Persistence collaborator failure with context.
    #[error("store error: {0}")]
    Store(String),
}

impl OptimizationError {
    /// Whether the error was raised synchronously, before a worker was spawned.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidProblem(_)
                | Self::AlreadyRunning(_)
                | Self::TournamentNotFound(_)
                | Self::UnknownSettings(_)
        )
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
