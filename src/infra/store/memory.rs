//! In-memory tournament store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::{OptimizationError, ScheduleResult, TournamentId, TournamentInputs, TournamentStore};

/// Tournaments and their latest schedules held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTournamentStore {
    tournaments: RwLock<HashMap<TournamentId, TournamentInputs>>,
    results: RwLock<HashMap<TournamentId, ScheduleResult>>,
}

impl InMemoryTournamentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a tournament's inputs.
    pub fn insert_tournament(&self, id: TournamentId, inputs: TournamentInputs) {
        self.tournaments.write().insert(id, inputs);
    }

    /// Forget a tournament and its schedule.
    pub fn remove_tournament(&self, id: TournamentId) -> Option<TournamentInputs> {
        self.results.write().remove(&id);
        self.tournaments.write().remove(&id)
    }

    /// Number of registered tournaments.
    #[must_use]
    pub fn tournament_count(&self) -> usize {
        self.tournaments.read().len()
    }
}

#[async_trait]
impl TournamentStore for InMemoryTournamentStore {
    async fn load_tournament_inputs(&self, id: TournamentId) -> Result<TournamentInputs, OptimizationError> {
        self.tournaments
            .read()
            .get(&id)
            .cloned()
            .ok_or(OptimizationError::TournamentNotFound(id))
    }

    async fn save_schedule_result(&self, id: TournamentId, result: &ScheduleResult) -> Result<(), OptimizationError> {
        if !self.tournaments.read().contains_key(&id) {
            return Err(OptimizationError::TournamentNotFound(id));
        }
        self.results.write().insert(id, result.clone());
        Ok(())
    }

    async fn load_schedule_result(&self, id: TournamentId) -> Result<Option<ScheduleResult>, OptimizationError> {
        Ok(self.results.read().get(&id).cloned())
    }
}
