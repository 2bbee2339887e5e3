//! Both phases chained into a single schedule computation.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, info_span};

use super::boat_schedule::{BoatScheduleOptimizer, ScheduleMetrics};
use super::error::OptimizationError;
use super::evolution::{Phase, SearchMonitor};
use super::fingerprint::Fingerprint;
use super::match_matrix::MatchMatrixOptimizer;
use super::model::{BoatSchedule, MatchMatrix, Problem, ScheduleResult};
use crate::config::OptimizerSettings;

/// Compute a schedule: pairings first, then boats on top of them.
///
/// Every random decision derives from `settings.seed`, so identical inputs
/// produce identical results.
///
/// # Errors
///
/// - [`OptimizationError::Cancelled`] when the monitor stops the search
/// - [`OptimizationError::InternalFault`] when a finished plan breaks its invariants
pub fn optimize(
    problem: &Problem,
    settings: &OptimizerSettings,
    fingerprint: Fingerprint,
    monitor: &dyn SearchMonitor,
) -> Result<ScheduleResult, OptimizationError> {
    let _span = info_span!("optimize", fingerprint = fingerprint.short(), seed = settings.seed).entered();
    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(settings.seed);

    monitor.on_phase_started(Phase::MatchMatrix);
    let pairing = MatchMatrixOptimizer::new(problem, &settings.match_matrix).optimize(&mut rng, monitor)?;
    monitor.on_phase_completed(Phase::MatchMatrix, pairing.score);
    let match_matrix = MatchMatrix::from_flights(problem, &pairing.flights);
    match_matrix.validate(problem.num_teams).map_err(OptimizationError::InternalFault)?;

    monitor.on_phase_started(Phase::BoatSchedule);
    let boats = BoatScheduleOptimizer::new(problem, &settings.boat_schedule)
        .optimize(&pairing.flights, &mut rng, monitor)?;
    monitor.on_phase_completed(Phase::BoatSchedule, boats.score);
    let boat_schedule = BoatSchedule::from_flights(problem, &boats.flights);
    boat_schedule
        .validate(problem.num_teams, problem.num_boats)
        .map_err(OptimizationError::InternalFault)?;
    if boat_schedule.pairings() != match_matrix {
        return Err(OptimizationError::InternalFault(
            "boat schedule changed the pairing plan".into(),
        ));
    }

    let metrics = ScheduleMetrics::measure(problem, &boats.flights);
    let baseline = ScheduleMetrics::measure(problem, &BoatScheduleOptimizer::naive_rotation(&pairing.flights));
    let computation_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        match_score = pairing.score,
        final_score = boats.score,
        saved_shuttles = metrics.saved_shuttles(),
        boat_changes = metrics.boat_changes,
        baseline_boat_changes = baseline.boat_changes,
        computation_time_ms,
        "schedule computed"
    );

    Ok(ScheduleResult {
        fingerprint,
        seed: settings.seed,
        team_ids: problem.team_ids.clone(),
        boat_ids: problem.boat_ids.clone(),
        match_matrix,
        boat_schedule,
        saved_shuttles: metrics.saved_shuttles(),
        saved_shuttles_harbour: metrics.saved_shuttles_harbour,
        saved_shuttles_sea: metrics.saved_shuttles_sea,
        boat_changes: metrics.boat_changes,
        baseline_boat_changes: baseline.boat_changes,
        match_score: pairing.score,
        final_score: boats.score,
        computation_time_ms,
        from_cache: false,
    })
}
