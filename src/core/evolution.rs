//! Generational search shared by both optimization phases.
//!
//! A population of scored candidates is ranked, truncated to its budget and
//! aged every generation. Callers supply the breeding step; the loop owns
//! cancellation checks, early stopping and progress cadence.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::OptimizationError;
use crate::config::SearchBudget;

/// Costs closer than this are considered equal.
pub const COST_EPSILON: f64 = 1e-5;

/// Optimization phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Team pairing across flights.
    MatchMatrix,
    /// Boat and race-order assignment.
    BoatSchedule,
}

impl Phase {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MatchMatrix => "match_matrix",
            Self::BoatSchedule => "boat_schedule",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision returned by a monitor at every generation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchCommand {
    /// Keep searching.
    #[default]
    Continue,
    /// Abort the search with a reason.
    Terminate(String),
}

impl fmt::Display for SearchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "Continue"),
            Self::Terminate(reason) => write!(f, "Terminate: {reason}"),
        }
    }
}

/// Observes and controls a running search.
pub trait SearchMonitor: Send + Sync {
    /// Polled once per generation; `Terminate` cancels the run.
    fn search_command(&self) -> SearchCommand;

    /// A phase is about to start.
    fn on_phase_started(&self, _phase: Phase) {}

    /// Periodic progress with the global generation counter.
    fn on_progress(&self, phase: Phase, iteration: u64, best_score: f64);

    /// A phase finished with its best score.
    fn on_phase_completed(&self, _phase: Phase, _best_score: f64) {}
}

/// Monitor that never stops and ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl SearchMonitor for NoopMonitor {
    fn search_command(&self) -> SearchCommand {
        SearchCommand::Continue
    }

    fn on_progress(&self, _phase: Phase, _iteration: u64, _best_score: f64) {}
}

/// A scored member of the population.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<G> {
    /// The candidate solution.
    pub genome: G,
    /// Objective value, lower is better.
    pub cost: f64,
    /// Secondary key for equal costs, lower is better.
    pub spread: f64,
    /// Generations survived.
    pub age: u32,
}

impl<G> Candidate<G> {
    /// Fresh candidate with age zero.
    pub const fn new(genome: G, cost: f64, spread: f64) -> Self {
        Self { genome, cost, spread, age: 0 }
    }
}

fn compare<G: Ord>(a: &Candidate<G>, b: &Candidate<G>) -> Ordering {
    a.cost
        .total_cmp(&b.cost)
        .then_with(|| a.spread.total_cmp(&b.spread))
        .then_with(|| a.genome.cmp(&b.genome))
}

/// Sort best-first, drop duplicate genomes and keep at most `individuals`.
///
/// Duplicates share every ranking key, so they end up adjacent. The oldest
/// copy survives.
pub fn rank_and_truncate<G: Ord>(population: &mut Vec<Candidate<G>>, individuals: usize) {
    population.sort_by(|a, b| compare(a, b).then_with(|| b.age.cmp(&a.age)));
    population.dedup_by(|later, earlier| later.genome == earlier.genome);
    population.truncate(individuals.max(1));
}

/// Static parameters of one search run.
#[derive(Debug, Clone, Copy)]
pub struct Evolution {
    /// Phase reported to the monitor.
    pub phase: Phase,
    /// Generations, population size, early stopping and progress cadence.
    pub budget: SearchBudget,
    /// Stop once best and worst cost coincide.
    pub stop_when_converged: bool,
}

impl Evolution {
    /// Run the generational loop.
    ///
    /// `generations` is a counter shared across consecutive runs of the same
    /// phase; progress fires whenever it hits a multiple of `show_every_n`.
    /// `breed` receives the ranked population and returns scored offspring.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizationError::Cancelled`] when the monitor terminates
    /// the search.
    pub fn run<G, B>(
        &self,
        mut population: Vec<Candidate<G>>,
        monitor: &dyn SearchMonitor,
        generations: &mut u64,
        mut breed: B,
    ) -> Result<Vec<Candidate<G>>, OptimizationError>
    where
        G: Ord,
        B: FnMut(&[Candidate<G>]) -> Vec<Candidate<G>>,
    {
        let individuals = self.budget.individuals;
        rank_and_truncate(&mut population, individuals);

        for _ in 0..self.budget.loops {
            if let SearchCommand::Terminate(reason) = monitor.search_command() {
                debug!(phase = %self.phase, generation = *generations, %reason, "search terminated");
                return Err(OptimizationError::Cancelled);
            }

            let offspring = breed(&population);
            population.extend(offspring);
            rank_and_truncate(&mut population, individuals);
            for candidate in &mut population {
                candidate.age += 1;
            }
            *generations += 1;

            let (Some(best), Some(worst)) = (population.first(), population.last()) else {
                break;
            };
            let show_every_n = u64::from(self.budget.show_every_n);
            if show_every_n > 0 && *generations % show_every_n == 0 {
                monitor.on_progress(self.phase, *generations, best.cost);
            }
            if self.budget.early_stopping.is_some_and(|limit| best.age >= limit) {
                debug!(phase = %self.phase, generation = *generations, "early stopping");
                break;
            }
            if self.stop_when_converged && (worst.cost - best.cost).abs() < COST_EPSILON {
                debug!(phase = %self.phase, generation = *generations, "population converged");
                break;
            }
        }

        Ok(population)
    }
}
