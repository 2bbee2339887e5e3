//! Domain model: tournament inputs, the derived problem, and schedule results.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::OptimizationError;
use super::fingerprint::Fingerprint;
use crate::config::SettingsChoice;

/// Tournament identifier used by the store and the coordinator.
pub type TournamentId = i64;

/// Index of a team inside a [`Problem`]. Indices `>= num_teams` denote empty boats.
pub type TeamIdx = usize;

/// A participating team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Stable identity.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Ordinal position within the roster.
    pub position: u32,
}

impl Team {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: u32) -> Self {
        Self { id: id.into(), name: name.into(), position }
    }
}

/// A boat of the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boat {
    /// Stable identity.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Presentation-only color tag.
    #[serde(default)]
    pub color: Option<String>,
    /// Ordinal position within the fleet.
    pub position: u32,
}

impl Boat {
    /// Convenience constructor without a color tag.
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: u32) -> Self {
        Self { id: id.into(), name: name.into(), color: None, position }
    }
}

/// Everything the persistence collaborator provides for one tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentInputs {
    /// Team roster.
    pub teams: Vec<Team>,
    /// Boat pool.
    pub boats: Vec<Boat>,
    /// Number of flights to schedule.
    pub flights: u32,
    /// Settings selection resolved by the settings provider.
    #[serde(default)]
    pub settings: SettingsChoice,
}

/// Dimensions of one optimization problem, derived from validated inputs.
///
/// Teams and boats are indexed in ordinal order (position, then id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Real teams.
    pub num_teams: usize,
    /// Boats, i.e. slots per race.
    pub num_boats: usize,
    /// Races needed so that every team sails once per flight.
    pub races_per_flight: usize,
    /// Flights to schedule.
    pub flights: usize,
    /// Team identities by index.
    pub team_ids: Vec<String>,
    /// Boat identities by index.
    pub boat_ids: Vec<String>,
}

impl Problem {
    /// Validate the roster and derive the problem dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizationError::InvalidProblem`] for empty, undersized or
    /// contradictory inputs.
    pub fn new(teams: &[Team], boats: &[Boat], flights: u32) -> Result<Self, OptimizationError> {
        if teams.is_empty() {
            return Err(invalid("team roster is empty"));
        }
        if boats.is_empty() {
            return Err(invalid("boat pool is empty"));
        }
        if teams.len() < 2 {
            return Err(invalid("at least two teams are needed to build pairings"));
        }
        if boats.len() < 2 {
            return Err(invalid("at least two boats are needed to race"));
        }
        if flights == 0 {
            return Err(invalid("flight count must be greater than 0"));
        }
        ensure_unique_ids("team", teams.iter().map(|t| t.id.as_str()))?;
        ensure_unique_ids("boat", boats.iter().map(|b| b.id.as_str()))?;

        let mut teams: Vec<&Team> = teams.iter().collect();
        teams.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        let mut boats: Vec<&Boat> = boats.iter().collect();
        boats.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));

        let num_teams = teams.len();
        let num_boats = boats.len();
        Ok(Self {
            num_teams,
            num_boats,
            races_per_flight: num_teams.div_ceil(num_boats),
            flights: flights as usize,
            team_ids: teams.iter().map(|t| t.id.clone()).collect(),
            boat_ids: boats.iter().map(|b| b.id.clone()).collect(),
        })
    }

    /// Validate and derive from stored tournament inputs.
    ///
    /// # Errors
    ///
    /// See [`Problem::new`].
    pub fn from_inputs(inputs: &TournamentInputs) -> Result<Self, OptimizationError> {
        Self::new(&inputs.teams, &inputs.boats, inputs.flights)
    }

    /// Total slots per flight, including empty boats.
    #[must_use]
    pub const fn slots_per_flight(&self) -> usize {
        self.races_per_flight * self.num_boats
    }

    /// Whether every slot of a flight is taken by a real team.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.slots_per_flight() == self.num_teams
    }

    /// Whether the index denotes a real team rather than an empty boat.
    #[must_use]
    pub const fn is_team(&self, idx: TeamIdx) -> bool {
        idx < self.num_teams
    }
}

fn invalid(msg: &str) -> OptimizationError {
    OptimizationError::InvalidProblem(msg.to_string())
}

fn ensure_unique_ids<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), OptimizationError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(OptimizationError::InvalidProblem(format!("{kind} id must not be empty")));
        }
        if !seen.insert(id) {
            return Err(OptimizationError::InvalidProblem(format!("duplicate {kind} id `{id}`")));
        }
    }
    Ok(())
}

/// One race: `slots[b]` is the participant sailing boat `b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Race {
    /// Participant per boat slot.
    pub slots: Vec<TeamIdx>,
}

impl Race {
    /// Real teams in this race.
    pub fn participants(&self, num_teams: usize) -> impl Iterator<Item = TeamIdx> + '_ {
        self.slots.iter().copied().filter(move |t| *t < num_teams)
    }

    /// Number of real teams in this race.
    #[must_use]
    pub fn participant_count(&self, num_teams: usize) -> usize {
        self.participants(num_teams).count()
    }

    /// Number of empty boats in this race.
    #[must_use]
    pub fn empty_boats(&self, num_teams: usize) -> usize {
        self.slots.len() - self.participant_count(num_teams)
    }
}

/// One flight: races in sailing order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Flight {
    /// Races in order.
    pub races: Vec<Race>,
}

impl Flight {
    /// Sort participants inside each race and races by their first participant.
    ///
    /// Gives every grouping a single canonical form. Destroys boat assignment.
    pub fn normalize(&mut self) {
        for race in &mut self.races {
            race.slots.sort_unstable();
        }
        self.races.sort_by_key(|race| race.slots.first().copied());
    }

    /// Canonical copy of this flight's grouping.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.normalize();
        copy
    }
}

/// Per-flight pairing plan produced by the match-matrix phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMatrix {
    /// Flights in order.
    pub flights: Vec<FlightPairing>,
}

/// Race groupings of one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightPairing {
    /// Sorted team indices of every race.
    pub races: Vec<Vec<TeamIdx>>,
}

impl MatchMatrix {
    /// Build the public pairing plan from internal flights.
    #[must_use]
    pub fn from_flights(problem: &Problem, flights: &[Flight]) -> Self {
        let flights = flights
            .iter()
            .map(|flight| {
                let mut races: Vec<Vec<TeamIdx>> = flight
                    .races
                    .iter()
                    .map(|race| {
                        let mut teams: Vec<TeamIdx> = race.participants(problem.num_teams).collect();
                        teams.sort_unstable();
                        teams
                    })
                    .collect();
                races.sort();
                FlightPairing { races }
            })
            .collect();
        Self { flights }
    }

    /// How often every pair of teams meets, indexed `[i][j]`.
    #[must_use]
    pub fn pair_counts(&self, num_teams: usize) -> Vec<Vec<u32>> {
        let mut counts = vec![vec![0_u32; num_teams]; num_teams];
        for race in self.flights.iter().flat_map(|f| f.races.iter()) {
            for (k, &a) in race.iter().enumerate() {
                for &b in &race[k + 1..] {
                    counts[a][b] += 1;
                    counts[b][a] += 1;
                }
            }
        }
        counts
    }

    /// Check that every team sails exactly once per flight.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation.
    pub fn validate(&self, num_teams: usize) -> Result<(), String> {
        for (f, flight) in self.flights.iter().enumerate() {
            let mut seen = vec![0_u32; num_teams];
            for &team in flight.races.iter().flatten() {
                if team >= num_teams {
                    return Err(format!("flight {f}: unknown team index {team}"));
                }
                seen[team] += 1;
            }
            if let Some(team) = seen.iter().position(|&n| n != 1) {
                return Err(format!("flight {f}: team {team} appears {} times", seen[team]));
            }
        }
        Ok(())
    }
}

/// Boat assignment of every race slot produced by the boat-schedule phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatSchedule {
    /// Flights in order, each a list of races in sailing order.
    pub flights: Vec<Vec<RaceAssignment>>,
}

/// Boat assignment of one race slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceAssignment {
    /// `boats[b]` is the team sailing boat `b`, `None` if the boat stays empty.
    pub boats: Vec<Option<TeamIdx>>,
}

impl BoatSchedule {
    /// Build the public boat plan from internal flights.
    #[must_use]
    pub fn from_flights(problem: &Problem, flights: &[Flight]) -> Self {
        let flights = flights
            .iter()
            .map(|flight| {
                flight
                    .races
                    .iter()
                    .map(|race| RaceAssignment {
                        boats: race
                            .slots
                            .iter()
                            .map(|&t| problem.is_team(t).then_some(t))
                            .collect(),
                    })
                    .collect()
            })
            .collect();
        Self { flights }
    }

    /// Check that no boat is double-booked and no team sails twice in one race slot.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation.
    pub fn validate(&self, num_teams: usize, num_boats: usize) -> Result<(), String> {
        for (f, flight) in self.flights.iter().enumerate() {
            for (r, race) in flight.iter().enumerate() {
                if race.boats.len() != num_boats {
                    return Err(format!(
                        "flight {f} race {r}: {} boat entries for {num_boats} boats",
                        race.boats.len()
                    ));
                }
                let mut seen = HashSet::new();
                for team in race.boats.iter().flatten() {
                    if *team >= num_teams {
                        return Err(format!("flight {f} race {r}: unknown team index {team}"));
                    }
                    if !seen.insert(*team) {
                        return Err(format!("flight {f} race {r}: team {team} on two boats"));
                    }
                }
            }
        }
        Ok(())
    }

    /// The groupings this boat plan realizes, in canonical pairing form.
    #[must_use]
    pub fn pairings(&self) -> MatchMatrix {
        let flights = self
            .flights
            .iter()
            .map(|flight| {
                let mut races: Vec<Vec<TeamIdx>> = flight
                    .iter()
                    .map(|race| {
                        let mut teams: Vec<TeamIdx> = race.boats.iter().flatten().copied().collect();
                        teams.sort_unstable();
                        teams
                    })
                    .collect();
                races.sort();
                FlightPairing { races }
            })
            .collect();
        MatchMatrix { flights }
    }
}

/// A completed optimization: both plans, metrics, and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    /// Problem fingerprint that produced this result.
    pub fingerprint: Fingerprint,
    /// Seed used by both phases.
    pub seed: u64,
    /// Team identity per team index.
    pub team_ids: Vec<String>,
    /// Boat identity per boat index.
    pub boat_ids: Vec<String>,
    /// Pairing plan.
    pub match_matrix: MatchMatrix,
    /// Boat plan.
    pub boat_schedule: BoatSchedule,
    /// Shuttle transfers avoided relative to the naive rotation.
    pub saved_shuttles: u32,
    /// Avoided transfers in the harbour between flights.
    pub saved_shuttles_harbour: u32,
    /// Avoided transfers at sea around flight boundaries.
    pub saved_shuttles_sea: u32,
    /// Teams switching boats between consecutive races.
    pub boat_changes: u32,
    /// Boat changes of the naive rotation for the same pairings.
    pub baseline_boat_changes: u32,
    /// Phase 1 objective value.
    pub match_score: f64,
    /// Phase 2 objective value.
    pub final_score: f64,
    /// Wall-clock time of the computation (or of the cache lookup).
    pub computation_time_ms: u64,
    /// Whether this copy was served from the result cache.
    #[serde(default)]
    pub from_cache: bool,
}
