//! Collaborator seams: result cache, tournament store and settings provider.

use async_trait::async_trait;

use super::error::OptimizationError;
use super::fingerprint::Fingerprint;
use super::model::{ScheduleResult, TournamentId, TournamentInputs};
use crate::config::{OptimizerSettings, SettingsChoice};

/// Completed schedules keyed by problem fingerprint.
///
/// Implementations need no internal locking; the coordinator serializes access.
pub trait ResultCache: Send {
    /// Cached result for a fingerprint.
    fn get(&self, fingerprint: &Fingerprint) -> Option<ScheduleResult>;
    /// Store a result, replacing any previous entry.
    fn put(&mut self, fingerprint: Fingerprint, result: ScheduleResult);
    /// Drop an entry.
    fn remove(&mut self, fingerprint: &Fingerprint) -> Option<ScheduleResult>;
    /// Number of entries.
    fn len(&self) -> usize;
    /// Whether the cache holds nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persistence of tournament inputs and their latest schedule.
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Teams, boats, flight count and settings choice of a tournament.
    async fn load_tournament_inputs(&self, id: TournamentId) -> Result<TournamentInputs, OptimizationError>;

    /// Persist the schedule of a tournament, replacing the previous one.
    async fn save_schedule_result(&self, id: TournamentId, result: &ScheduleResult) -> Result<(), OptimizationError>;

    /// Latest persisted schedule, if any.
    async fn load_schedule_result(&self, id: TournamentId) -> Result<Option<ScheduleResult>, OptimizationError>;
}

/// Resolves a tournament's settings choice into concrete settings.
pub trait SettingsProvider: Send + Sync {
    /// Concrete settings for `choice`.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizationError::UnknownSettings`] for an unknown preset name.
    fn resolve(&self, choice: &SettingsChoice) -> Result<OptimizerSettings, OptimizationError>;
}
