//! Phase 1: flight-by-flight search for balanced team pairings.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use super::error::OptimizationError;
use super::evolution::{Candidate, Evolution, Phase, SearchMonitor, COST_EPSILON};
use super::model::{Flight, Problem, Race};
use crate::config::MatchMatrixSettings;

/// Meeting counts and empty-boat exposure accumulated over a partial schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingStats {
    num_teams: usize,
    meetings: Vec<u32>,
    lower: Vec<u32>,
}

impl PairingStats {
    /// Empty statistics for `num_teams` real teams.
    #[must_use]
    pub fn new(num_teams: usize) -> Self {
        Self { num_teams, meetings: vec![0; num_teams * num_teams], lower: vec![0; num_teams] }
    }

    /// Account one more flight.
    pub fn add(&mut self, flight: &Flight) {
        for race in &flight.races {
            let teams: Vec<usize> = race.participants(self.num_teams).collect();
            for (k, &a) in teams.iter().enumerate() {
                for &b in &teams[k + 1..] {
                    self.meetings[a * self.num_teams + b] += 1;
                    self.meetings[b * self.num_teams + a] += 1;
                }
            }
            if teams.len() < race.slots.len() {
                for &t in &teams {
                    self.lower[t] += 1;
                }
            }
        }
    }

    /// How often teams `a` and `b` met.
    #[must_use]
    pub fn meetings(&self, a: usize, b: usize) -> u32 {
        self.meetings[a * self.num_teams + b]
    }

    /// Races team `t` sailed with empty boats.
    #[must_use]
    pub fn lower_participants(&self, t: usize) -> u32 {
        self.lower[t]
    }
}

/// Best pairing schedule found by the match-matrix phase.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchMatrixOutcome {
    /// Normalized flights including empty-boat placeholders.
    pub flights: Vec<Flight>,
    /// Objective value of the schedule.
    pub score: f64,
    /// Generations run across all flights and branches.
    pub generations: u64,
}

#[derive(Debug, Clone)]
struct Branch {
    flights: Vec<Flight>,
    stats: PairingStats,
    score: f64,
}

/// Searches pairings flight by flight, carrying equally good branches forward.
pub struct MatchMatrixOptimizer<'a> {
    problem: &'a Problem,
    settings: &'a MatchMatrixSettings,
}

impl<'a> MatchMatrixOptimizer<'a> {
    /// Bind the optimizer to a problem and its settings.
    #[must_use]
    pub const fn new(problem: &'a Problem, settings: &'a MatchMatrixSettings) -> Self {
        Self { problem, settings }
    }

    /// Objective of a schedule whose statistics already include `last`.
    ///
    /// Cubed deviation of every pair's meeting count from the mean, plus the
    /// uneven empty-boat exposure and the uneven empty boats of `last`.
    #[must_use]
    pub fn cost(&self, stats: &PairingStats, last: &Flight) -> f64 {
        let n = self.problem.num_teams;
        let pairs = n * (n - 1) / 2;
        let mut sum = 0_u64;
        for a in 0..n {
            for b in 0..a {
                sum += u64::from(stats.meetings(a, b));
            }
        }
        let avg = sum as f64 / pairs as f64;
        let mut cost = 0.0;
        for a in 0..n {
            for b in 0..a {
                cost += (f64::from(stats.meetings(a, b)) - avg).abs().powi(3);
            }
        }

        let avg_lower = (0..n).map(|t| f64::from(stats.lower_participants(t))).sum::<f64>() / n as f64;
        if avg_lower > 0.0 {
            let spread: f64 = (0..n)
                .map(|t| (avg_lower - f64::from(stats.lower_participants(t))).abs().powi(3))
                .sum();
            cost += spread * self.settings.factor_less_participants;
        }

        if !self.problem.is_full() && self.settings.factor_team_missing > 0.0 {
            let empty = last.races.iter().map(|r| r.empty_boats(n));
            let max = empty.clone().max().unwrap_or(0);
            let min = empty.min().unwrap_or(0);
            cost += (max - min) as f64 * self.settings.factor_team_missing;
        }
        cost
    }

    /// Sum over races of the variance of team ordinals; prefers mixed races.
    #[must_use]
    pub fn ordinal_spread(&self, flight: &Flight) -> f64 {
        flight
            .races
            .iter()
            .map(|race| {
                let teams: Vec<f64> =
                    race.participants(self.problem.num_teams).map(|t| t as f64).collect();
                if teams.is_empty() {
                    return 0.0;
                }
                let mean = teams.iter().sum::<f64>() / teams.len() as f64;
                teams.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / teams.len() as f64
            })
            .sum()
    }

    /// A uniformly random, normalized grouping.
    pub fn random_flight(&self, rng: &mut StdRng) -> Flight {
        let mut slots: Vec<usize> = (0..self.problem.slots_per_flight()).collect();
        slots.shuffle(rng);
        let mut flight = Flight {
            races: slots
                .chunks(self.problem.num_boats)
                .map(|chunk| Race { slots: chunk.to_vec() })
                .collect(),
        };
        flight.normalize();
        flight
    }

    /// Swap one participant between two distinct races, then normalize.
    ///
    /// Returns `None` when the flight has a single race.
    pub fn swap_between_races(flight: &Flight, rng: &mut StdRng) -> Option<Flight> {
        let races = flight.races.len();
        if races < 2 {
            return None;
        }
        let r1 = rng.random_range(0..races);
        let r2 = (r1 + 1 + rng.random_range(0..races - 1)) % races;
        let mut child = flight.clone();
        let t1 = rng.random_range(0..child.races[r1].slots.len());
        let t2 = rng.random_range(0..child.races[r2].slots.len());
        let moved = child.races[r1].slots[t1];
        child.races[r1].slots[t1] = child.races[r2].slots[t2];
        child.races[r2].slots[t2] = moved;
        child.normalize();
        Some(child)
    }

    fn evaluate(&self, base: &PairingStats, flight: Flight) -> Candidate<Flight> {
        let mut stats = base.clone();
        stats.add(&flight);
        let cost = self.cost(&stats, &flight);
        let spread = self.ordinal_spread(&flight);
        Candidate::new(flight, cost, spread)
    }

    /// Run the phase.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizationError::Cancelled`] when the monitor stops the search.
    pub fn optimize(
        &self,
        rng: &mut StdRng,
        monitor: &dyn SearchMonitor,
    ) -> Result<MatchMatrixOutcome, OptimizationError> {
        let budget = self.settings.budget();
        let evolution = Evolution { phase: Phase::MatchMatrix, budget, stop_when_converged: false };
        let max_branches = self.settings.max_branches.max(1) as usize;
        let mut generations = 0_u64;

        let first = self.random_flight(rng);
        let mut stats = PairingStats::new(self.problem.num_teams);
        stats.add(&first);
        let score = self.cost(&stats, &first);
        let mut branches = vec![Branch { flights: vec![first], stats, score }];

        for flight_idx in 1..self.problem.flights {
            let mut finalists: Vec<(usize, Candidate<Flight>)> = Vec::new();
            for (branch_idx, branch) in branches.iter().enumerate() {
                let population = (0..budget.individuals)
                    .map(|_| self.evaluate(&branch.stats, self.random_flight(rng)))
                    .collect();
                let population = evolution.run(population, monitor, &mut generations, |pop| {
                    (0..self.settings.swap_teams)
                        .filter_map(|_| {
                            let parent = &pop[rng.random_range(0..pop.len())];
                            Self::swap_between_races(&parent.genome, rng)
                        })
                        .map(|child| self.evaluate(&branch.stats, child))
                        .collect()
                })?;
                finalists.extend(population.into_iter().map(|c| (branch_idx, c)));
            }

            let best = finalists.iter().map(|(_, c)| c.cost).fold(f64::INFINITY, f64::min);
            finalists.retain(|(_, c)| (c.cost - best).abs() < COST_EPSILON);
            if finalists.len() > max_branches {
                finalists.shuffle(rng);
                finalists.truncate(max_branches);
            }
            debug!(flight = flight_idx, best_cost = best, branches = finalists.len(), "flight settled");

            branches = finalists
                .into_iter()
                .map(|(branch_idx, candidate)| {
                    let parent = &branches[branch_idx];
                    let mut stats = parent.stats.clone();
                    stats.add(&candidate.genome);
                    let mut flights = parent.flights.clone();
                    flights.push(candidate.genome);
                    Branch { flights, stats, score: candidate.cost }
                })
                .collect();
        }

        let Some(best) = branches.into_iter().next() else {
            return Err(OptimizationError::InternalFault("match-matrix search lost every branch".into()));
        };
        info!(score = best.score, generations, flights = best.flights.len(), "match matrix optimized");
        Ok(MatchMatrixOutcome { flights: best.flights, score: best.score, generations })
    }
}
