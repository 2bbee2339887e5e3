//! Optimizer settings for both search phases.

use serde::{Deserialize, Serialize};

/// Iteration budget shared by both evolutionary phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Generation count.
    pub loops: u32,
    /// Population size.
    pub individuals: usize,
    /// Generations without improvement before halting; `None` disables it.
    pub early_stopping: Option<u32>,
    /// Progress emission cadence in generations; 0 disables progress events.
    pub show_every_n: u32,
}

/// Parameters of the match-matrix (pairing) phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchMatrixSettings {
    /// Offspring created per generation by swapping teams between races.
    pub swap_teams: u32,
    /// Equally-best partial schedules carried from one flight to the next.
    pub max_branches: u32,
    /// Penalty weight for uneven sailing with empty boats.
    pub factor_less_participants: f64,
    /// Penalty weight for uneven empty boats within a flight.
    pub factor_team_missing: f64,
    /// Generation count per flight.
    pub loops: u32,
    /// Population size.
    pub individuals: u32,
    /// Generations without improvement before halting; values <= 0 disable it.
    pub early_stopping: i32,
    /// Progress emission cadence.
    pub show_every_n: u32,
}

impl Default for MatchMatrixSettings {
    fn default() -> Self {
        Self {
            swap_teams: 2,
            max_branches: 1,
            factor_less_participants: 3.01,
            factor_team_missing: 20.01,
            loops: 10_000,
            individuals: 100,
            early_stopping: -1,
            show_every_n: 1_000,
        }
    }
}

impl MatchMatrixSettings {
    /// Budget view used by the search loop.
    #[must_use]
    pub fn budget(&self) -> SearchBudget {
        SearchBudget {
            loops: self.loops,
            individuals: self.individuals as usize,
            early_stopping: u32::try_from(self.early_stopping).ok().filter(|n| *n > 0),
            show_every_n: self.show_every_n,
        }
    }

    /// Validate match-matrix settings.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.individuals == 0 {
            return Err("matchMatrix.individuals must be greater than 0".into());
        }
        if self.max_branches == 0 {
            return Err("matchMatrix.maxBranches must be greater than 0".into());
        }
        check_weight("matchMatrix.factorLessParticipants", self.factor_less_participants)?;
        check_weight("matchMatrix.factorTeamMissing", self.factor_team_missing)
    }
}

/// Parameters of the boat/shuttle scheduling phase.
///
/// All three weights are penalties: a larger weight makes the corresponding
/// event more expensive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoatScheduleSettings {
    /// Offspring created per generation by swapping two boats within a race.
    pub swap_boats: u32,
    /// Offspring created per generation by swapping two races within a flight.
    pub swap_races: u32,
    /// Cost per shuttle needed at a flight boundary (teams that keep their boat need none).
    pub weight_stay_on_boat: f64,
    /// Cost per shuttle needed at sea around a flight boundary.
    pub weight_stay_on_shuttle: f64,
    /// Cost per team switching boats between consecutive races.
    pub weight_change_between_boats: f64,
    /// Generation count.
    pub loops: u32,
    /// Population size.
    pub individuals: u32,
    /// Generations without improvement before halting; values <= 0 disable it.
    pub early_stopping: i32,
    /// Progress emission cadence.
    pub show_every_n: u32,
}

impl Default for BoatScheduleSettings {
    fn default() -> Self {
        Self {
            swap_boats: 2,
            swap_races: 2,
            weight_stay_on_boat: 1.0,
            weight_stay_on_shuttle: 1.0,
            weight_change_between_boats: 1.0,
            loops: 10_000,
            individuals: 100,
            early_stopping: -1,
            show_every_n: 1_000,
        }
    }
}

impl BoatScheduleSettings {
    /// Budget view used by the search loop.
    #[must_use]
    pub fn budget(&self) -> SearchBudget {
        SearchBudget {
            loops: self.loops,
            individuals: self.individuals as usize,
            early_stopping: u32::try_from(self.early_stopping).ok().filter(|n| *n > 0),
            show_every_n: self.show_every_n,
        }
    }

    /// Validate boat-schedule settings.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.individuals == 0 {
            return Err("boatSchedule.individuals must be greater than 0".into());
        }
        check_weight("boatSchedule.weightStayOnBoat", self.weight_stay_on_boat)?;
        check_weight("boatSchedule.weightStayOnShuttle", self.weight_stay_on_shuttle)?;
        check_weight(
            "boatSchedule.weightChangeBetweenBoats",
            self.weight_change_between_boats,
        )
    }
}

/// Full optimizer configuration: seed plus both parameter groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizerSettings {
    /// Seed for every random decision of both phases.
    pub seed: u64,
    /// Phase 1 parameters.
    pub match_matrix: MatchMatrixSettings,
    /// Phase 2 parameters.
    pub boat_schedule: BoatScheduleSettings,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            match_matrix: MatchMatrixSettings::default(),
            boat_schedule: BoatScheduleSettings::default(),
        }
    }
}

impl OptimizerSettings {
    /// Validate both parameter groups.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        self.match_matrix.validate()?;
        self.boat_schedule.validate()
    }

    /// Parse settings from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let settings: Self =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Same settings with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// How a tournament selects its optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SettingsChoice {
    /// The provider's default settings.
    #[default]
    Default,
    /// A named preset known to the provider.
    Named(String),
    /// Settings stored with the tournament itself.
    Custom(OptimizerSettings),
}

fn check_weight(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{name} must be a finite, non-negative number"));
    }
    Ok(())
}
