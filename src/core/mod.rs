//! Core optimization engine, job lifecycle and collaborator seams.

pub mod boat_schedule;
pub mod coordinator;
pub mod error;
pub mod evolution;
pub mod fingerprint;
pub mod match_matrix;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod storage;

pub use boat_schedule::{BoatScheduleOptimizer, BoatScheduleOutcome, InterFlightStat, ScheduleMetrics};
pub use coordinator::{JobCoordinator, JobState, JobStatus, StartOutcome, StatusReport};
pub use error::{AppResult, OptimizationError};
pub use evolution::{NoopMonitor, Phase, SearchCommand, SearchMonitor};
pub use fingerprint::{fingerprint, Fingerprint};
pub use match_matrix::{MatchMatrixOptimizer, MatchMatrixOutcome, PairingStats};
pub use model::{
    Boat, BoatSchedule, Flight, FlightPairing, MatchMatrix, Problem, Race, RaceAssignment,
    ScheduleResult, Team, TeamIdx, TournamentId, TournamentInputs,
};
pub use progress::{ProgressChannel, ProgressEvent, ProgressKind, ProgressSubscription};
pub use storage::{ResultCache, SettingsProvider, TournamentStore};
