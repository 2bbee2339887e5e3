//! Phase 2: boat assignment and race order on top of fixed pairings.
//!
//! Only the position of a team inside its race (its boat) and the order of
//! races inside a flight change. Groupings from phase 1 are never touched.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use super::error::OptimizationError;
use super::evolution::{Candidate, Evolution, Phase, SearchMonitor};
use super::model::{Flight, Problem, Race};
use crate::config::BoatScheduleSettings;

/// Shuttles needed to move `teams` crews.
#[must_use]
pub const fn shuttles(teams: u32) -> u32 {
    (teams + 1) / 2
}

/// What happens to crews at the boundary between two consecutive flights.
///
/// Compares the last race of the earlier flight with the first race of the
/// later one. Teams sailing both on the same boat stay aboard; teams sailing
/// both on different boats change boats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterFlightStat {
    /// Teams keeping their boat across the boundary.
    pub stay_on_boat: u32,
    /// Teams sailing both races on different boats.
    pub change_boats: u32,
    /// Crews to ferry in the harbour between the flights.
    pub shuttle_between: u32,
    /// Crews to ferry at sea around the second-to-last race of the earlier flight.
    pub shuttle_last_race: u32,
    /// Crews to ferry at sea around the second race of the later flight.
    pub shuttle_first_race: u32,
}

impl InterFlightStat {
    /// Boundary statistics of `before` followed by `after`.
    #[must_use]
    pub fn between(before: &Flight, after: &Flight, num_teams: usize) -> Self {
        let mut stat = Self::default();
        let (Some(last), Some(first)) = (before.races.last(), after.races.first()) else {
            return stat;
        };

        let mut to_transfer = count(last.participant_count(num_teams).max(first.participant_count(num_teams)));
        for (i, team) in last.slots.iter().enumerate().filter(|(_, t)| **t < num_teams) {
            if let Some(j) = first.slots.iter().position(|t| t == team) {
                if i == j {
                    stat.stay_on_boat += 1;
                    to_transfer = to_transfer.saturating_sub(1);
                } else {
                    stat.change_boats += 1;
                }
            }
        }
        stat.shuttle_between = to_transfer;

        if before.races.len() > 1 && after.races.len() > 1 {
            let second_last = &before.races[before.races.len() - 2];
            stat.shuttle_last_race = transfers_at_sea(second_last, first, num_teams);
            stat.shuttle_first_race = transfers_at_sea(last, &after.races[1], num_teams);
        }
        stat
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn count(n: usize) -> u32 {
    n as u32
}

// Crews of either race that do not sail both and must be ferried.
fn transfers_at_sea(a: &Race, b: &Race, num_teams: usize) -> u32 {
    let common = a.participants(num_teams).filter(|t| b.slots.contains(t)).count();
    count(a.participant_count(num_teams).max(b.participant_count(num_teams)) - common)
}

/// Shuttle and boat-change metrics of a finished schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleMetrics {
    /// Shuttle trips avoided in the harbour compared with the naive rotation.
    pub saved_shuttles_harbour: u32,
    /// Shuttle trips avoided at sea compared with the naive rotation.
    pub saved_shuttles_sea: u32,
    /// Teams switching boats at flight boundaries.
    pub boat_changes: u32,
}

impl ScheduleMetrics {
    /// Compute metrics for `flights`.
    #[must_use]
    pub fn measure(problem: &Problem, flights: &[Flight]) -> Self {
        let per_race = shuttles(count(problem.num_boats));
        let mut metrics = Self::default();
        for pair in flights.windows(2) {
            let stat = InterFlightStat::between(&pair[0], &pair[1], problem.num_teams);
            metrics.saved_shuttles_harbour += per_race.saturating_sub(shuttles(stat.shuttle_between));
            if problem.races_per_flight > 1 {
                metrics.saved_shuttles_sea += (2 * per_race)
                    .saturating_sub(shuttles(stat.shuttle_first_race) + shuttles(stat.shuttle_last_race));
            }
            metrics.boat_changes += stat.change_boats;
        }
        metrics
    }

    /// Harbour plus sea savings.
    #[must_use]
    pub const fn saved_shuttles(&self) -> u32 {
        self.saved_shuttles_harbour + self.saved_shuttles_sea
    }
}

/// Best boat schedule found by the boat-schedule phase.
#[derive(Debug, Clone, PartialEq)]
pub struct BoatScheduleOutcome {
    /// Flights with races in sailing order and teams at their boat positions.
    pub flights: Vec<Flight>,
    /// Objective value.
    pub score: f64,
    /// Generations run.
    pub generations: u64,
}

/// Searches boat positions and race order for fixed groupings.
pub struct BoatScheduleOptimizer<'a> {
    problem: &'a Problem,
    settings: &'a BoatScheduleSettings,
}

impl<'a> BoatScheduleOptimizer<'a> {
    /// Bind the optimizer to a problem and its settings.
    #[must_use]
    pub const fn new(problem: &'a Problem, settings: &'a BoatScheduleSettings) -> Self {
        Self { problem, settings }
    }

    /// Objective of a full boat schedule; every weight is a penalty.
    ///
    /// Terms accumulate over flight prefixes: each flight adds the running
    /// total of everything seen so far, so a boundary term is counted once
    /// for its own flight and once for every flight after it.
    #[must_use]
    pub fn cost(&self, flights: &[Flight]) -> f64 {
        let n = self.problem.num_teams;
        let boats = self.problem.num_boats;
        let mut usage = vec![0_u32; boats * n];
        let mut total = 0_u32;
        let mut running = 0.0;
        let mut cost = 0.0;

        for (idx, flight) in flights.iter().enumerate() {
            for race in &flight.races {
                for (boat, &team) in race.slots.iter().enumerate() {
                    if team < n {
                        usage[boat * n + team] += 1;
                        total += 1;
                    }
                }
            }
            let avg = f64::from(total) / (boats * n) as f64;
            running += usage.iter().map(|&u| (f64::from(u) - avg).abs().floor()).sum::<f64>();

            if idx > 0 {
                let stat = InterFlightStat::between(&flights[idx - 1], flight, n);
                running += f64::from(stat.change_boats) * self.settings.weight_change_between_boats;
                running += (transfer_cost(stat.shuttle_first_race) + transfer_cost(stat.shuttle_last_race))
                    * self.settings.weight_stay_on_shuttle;
                running += transfer_cost(stat.shuttle_between) * self.settings.weight_stay_on_boat;
            }
            cost += running;
        }
        cost
    }

    /// Every race of the pairing plan with teams on boats in ascending order.
    #[must_use]
    pub fn naive_rotation(pairings: &[Flight]) -> Vec<Flight> {
        pairings.iter().map(Flight::normalized).collect()
    }

    /// Swap two boats within one random race.
    ///
    /// Returns `None` when races have fewer than two boats.
    pub fn swap_boats(flights: &[Flight], rng: &mut StdRng) -> Option<Vec<Flight>> {
        let f = rng.random_range(0..flights.len());
        let r = rng.random_range(0..flights[f].races.len());
        let boats = flights[f].races[r].slots.len();
        if boats < 2 {
            return None;
        }
        let b1 = rng.random_range(0..boats);
        let b2 = (b1 + 1 + rng.random_range(0..boats - 1)) % boats;
        let mut child = flights.to_vec();
        child[f].races[r].slots.swap(b1, b2);
        Some(child)
    }

    /// Swap two races within one random flight.
    ///
    /// Returns `None` when flights have a single race.
    pub fn swap_races(flights: &[Flight], rng: &mut StdRng) -> Option<Vec<Flight>> {
        let f = rng.random_range(0..flights.len());
        let races = flights[f].races.len();
        if races < 2 {
            return None;
        }
        let r1 = rng.random_range(0..races);
        let r2 = (r1 + 1 + rng.random_range(0..races - 1)) % races;
        let mut child = flights.to_vec();
        child[f].races.swap(r1, r2);
        Some(child)
    }

    fn evaluate(&self, flights: Vec<Flight>) -> Candidate<Vec<Flight>> {
        let cost = self.cost(&flights);
        Candidate::new(flights, cost, 0.0)
    }

    /// Run the phase over the pairing plan of phase 1.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizationError::Cancelled`] when the monitor stops the
    /// search, or [`OptimizationError::InternalFault`] for an empty plan.
    pub fn optimize(
        &self,
        pairings: &[Flight],
        rng: &mut StdRng,
        monitor: &dyn SearchMonitor,
    ) -> Result<BoatScheduleOutcome, OptimizationError> {
        if pairings.is_empty() || pairings.iter().any(|f| f.races.is_empty()) {
            return Err(OptimizationError::InternalFault("boat schedule needs a non-empty pairing plan".into()));
        }
        let budget = self.settings.budget();
        let evolution = Evolution { phase: Phase::BoatSchedule, budget, stop_when_converged: true };
        let mut generations = 0_u64;

        let naive = Self::naive_rotation(pairings);
        let mut population = Vec::with_capacity(budget.individuals);
        for _ in 1..budget.individuals {
            let mut shuffled = naive.clone();
            for race in shuffled.iter_mut().flat_map(|f| f.races.iter_mut()) {
                race.slots.shuffle(rng);
            }
            population.push(self.evaluate(shuffled));
        }
        population.push(self.evaluate(naive));

        let population = evolution.run(population, monitor, &mut generations, |pop| {
            let mut offspring = Vec::new();
            for _ in 0..self.settings.swap_boats {
                let parent = &pop[rng.random_range(0..pop.len())];
                if let Some(child) = Self::swap_boats(&parent.genome, rng) {
                    offspring.push(self.evaluate(child));
                }
            }
            for _ in 0..self.settings.swap_races {
                let parent = &pop[rng.random_range(0..pop.len())];
                if let Some(child) = Self::swap_races(&parent.genome, rng) {
                    offspring.push(self.evaluate(child));
                }
            }
            offspring
        })?;

        let Some(best) = population.into_iter().next() else {
            return Err(OptimizationError::InternalFault("boat schedule search lost its population".into()));
        };
        info!(score = best.cost, generations, "boat schedule optimized");
        Ok(BoatScheduleOutcome { flights: best.genome, score: best.cost, generations })
    }
}

fn transfer_cost(crews: u32) -> f64 {
    f64::from(shuttles(crews)) + 0.01 * f64::from(crews)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::core::evolution::NoopMonitor;
    use crate::core::model::{Boat, Team};

    fn problem(teams: u32, boats: u32, flights: u32) -> Problem {
        let teams: Vec<Team> = (0..teams).map(|i| Team::new(format!("t{i}"), "", i)).collect();
        let boats: Vec<Boat> = (0..boats).map(|i| Boat::new(format!("b{i}"), "", i)).collect();
        Problem::new(&teams, &boats, flights).unwrap()
    }

    fn race(slots: &[usize]) -> Race {
        Race { slots: slots.to_vec() }
    }

    #[test]
    fn shuttles_round_up() {
        assert_eq!(shuttles(0), 0);
        assert_eq!(shuttles(1), 1);
        assert_eq!(shuttles(4), 2);
        assert_eq!(shuttles(5), 3);
    }

    #[test]
    fn boundary_distinguishes_stay_and_change() {
        let before = Flight { races: vec![race(&[4, 5, 6, 7]), race(&[0, 1, 2, 3])] };
        let after = Flight { races: vec![race(&[0, 2, 1, 5]), race(&[3, 4, 6, 7])] };
        let stat = InterFlightStat::between(&before, &after, 8);
        assert_eq!(stat.stay_on_boat, 1);
        assert_eq!(stat.change_boats, 2);
        assert_eq!(stat.shuttle_between, 3);
        // second-to-last race [4,5,6,7] vs first race [0,2,1,5]: only 5 in common
        assert_eq!(stat.shuttle_last_race, 3);
        // last race [0,1,2,3] vs second race [3,4,6,7]: only 3 in common
        assert_eq!(stat.shuttle_first_race, 3);
    }

    #[test]
    fn single_race_flights_have_no_sea_transfers() {
        let before = Flight { races: vec![race(&[0, 1])] };
        let after = Flight { races: vec![race(&[1, 0])] };
        let stat = InterFlightStat::between(&before, &after, 2);
        assert_eq!(stat.change_boats, 2);
        assert_eq!(stat.shuttle_last_race, 0);
        assert_eq!(stat.shuttle_first_race, 0);
    }

    #[test]
    fn single_boat_or_race_mutations_are_skipped() {
        let mut rng = StdRng::seed_from_u64(3);
        let flights = vec![Flight { races: vec![race(&[0, 1])] }];
        assert!(BoatScheduleOptimizer::swap_races(&flights, &mut rng).is_none());
        let lone = vec![Flight { races: vec![race(&[0]), race(&[1])] }];
        assert!(BoatScheduleOptimizer::swap_boats(&lone, &mut rng).is_none());
    }

    #[test]
    fn search_keeps_groupings_and_beats_baseline() {
        let problem = problem(8, 4, 3);
        let pairings = vec![
            Flight { races: vec![race(&[0, 1, 2, 3]), race(&[4, 5, 6, 7])] },
            Flight { races: vec![race(&[0, 1, 4, 5]), race(&[2, 3, 6, 7])] },
            Flight { races: vec![race(&[0, 2, 4, 6]), race(&[1, 3, 5, 7])] },
        ];
        let settings = BoatScheduleSettings { loops: 300, individuals: 30, show_every_n: 0, ..Default::default() };
        let optimizer = BoatScheduleOptimizer::new(&problem, &settings);
        let outcome = optimizer.optimize(&pairings, &mut StdRng::seed_from_u64(42), &NoopMonitor).unwrap();

        for (planned, scheduled) in pairings.iter().zip(&outcome.flights) {
            assert_eq!(planned.normalized(), scheduled.normalized());
        }
        let naive = BoatScheduleOptimizer::naive_rotation(&pairings);
        let baseline = ScheduleMetrics::measure(&problem, &naive);
        // 4 and 5 move at the first boundary, 2 and 6 at the second
        assert_eq!(baseline.boat_changes, 4);
        let metrics = ScheduleMetrics::measure(&problem, &outcome.flights);
        assert!(metrics.boat_changes <= baseline.boat_changes);
        assert!(outcome.score <= optimizer.cost(&naive) + 1e-9);
    }

    #[test]
    fn naive_rotation_keeps_crews_already_aligned() {
        let problem = problem(8, 4, 2);
        let pairings = vec![
            Flight { races: vec![race(&[0, 1, 2, 3]), race(&[4, 5, 6, 7])] },
            Flight { races: vec![race(&[0, 5, 6, 7]), race(&[1, 2, 3, 4])] },
        ];
        let naive = BoatScheduleOptimizer::naive_rotation(&pairings);
        let metrics = ScheduleMetrics::measure(&problem, &naive);
        assert_eq!(metrics.boat_changes, 0);
        assert_eq!(InterFlightStat::between(&naive[0], &naive[1], 8).stay_on_boat, 3);
    }

    #[test]
    fn boundary_terms_weigh_on_every_later_flight() {
        let problem = problem(8, 4, 3);
        let flights = vec![
            Flight { races: vec![race(&[0, 1, 2, 3]), race(&[4, 5, 6, 7])] },
            Flight { races: vec![race(&[0, 1, 4, 5]), race(&[2, 3, 6, 7])] },
            Flight { races: vec![race(&[0, 2, 4, 6]), race(&[1, 3, 5, 7])] },
        ];
        let light = BoatScheduleSettings { weight_change_between_boats: 1.0, ..Default::default() };
        let heavy = BoatScheduleSettings { weight_change_between_boats: 2.0, ..Default::default() };
        let delta = BoatScheduleOptimizer::new(&problem, &heavy).cost(&flights)
            - BoatScheduleOptimizer::new(&problem, &light).cost(&flights);

        let first = InterFlightStat::between(&flights[0], &flights[1], 8).change_boats;
        let second = InterFlightStat::between(&flights[1], &flights[2], 8).change_boats;
        assert_eq!((first, second), (2, 2));
        assert!((delta - f64::from(2 * first + second)).abs() < 1e-9);
    }
}
