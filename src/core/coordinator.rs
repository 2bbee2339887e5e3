//! Job coordinator: start, cancel and observe optimization runs.
//!
//! Each run executes on its own OS thread with a private current-thread
//! tokio runtime for the store calls at completion, so the search never
//! blocks the caller's runtime.
//!
//! # Lifecycle
//!
//! `Idle -> Running -> {Completed, Cancelled, Failed}`; a later start moves a
//! tournament back to `Running`. At most one run per tournament is active.
//!
//! Lock order: `jobs`, then `channels` or `states`. The cache lock is never
//! held together with another one.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::OptimizationError;
use super::evolution::{Phase, SearchCommand, SearchMonitor};
use super::fingerprint::{fingerprint, Fingerprint};
use super::model::{Problem, ScheduleResult, TournamentId};
use super::pipeline;
use super::progress::{ProgressChannel, ProgressEvent, ProgressSubscription};
use super::storage::{ResultCache, SettingsProvider, TournamentStore};
use crate::config::{OptimizerSettings, ServiceConfig};

/// Lifecycle state of a tournament's optimization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    /// Never started in this process.
    #[default]
    Idle,
    /// A worker is searching.
    Running,
    /// A result was produced or served from the cache.
    Completed,
    /// The last run was cancelled.
    Cancelled,
    /// The last run failed with a diagnostic.
    Failed(String),
}

impl JobState {
    /// Payload-free status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        match self {
            Self::Idle => JobStatus::Idle,
            Self::Running => JobStatus::Running,
            Self::Completed => JobStatus::Completed,
            Self::Cancelled => JobStatus::Cancelled,
            Self::Failed(_) => JobStatus::Failed,
        }
    }

    /// Whether the run has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed(_))
    }
}

/// Serializable status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// See [`JobState::Idle`].
    Idle,
    /// See [`JobState::Running`].
    Running,
    /// See [`JobState::Completed`].
    Completed,
    /// See [`JobState::Cancelled`].
    Cancelled,
    /// See [`JobState::Failed`].
    Failed,
}

/// Snapshot returned by [`JobCoordinator::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Tournament.
    pub tournament_id: TournamentId,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Whether a worker is searching.
    pub is_running: bool,
    /// Whether the store holds a schedule.
    pub has_result: bool,
    /// Current phase while running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Best score of the current phase while running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
    /// Diagnostic of a failed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of [`JobCoordinator::start`].
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A worker was spawned.
    Started {
        /// Identifier of the new run.
        run_id: Uuid,
        /// Fingerprint being computed.
        fingerprint: Fingerprint,
    },
    /// Served from the cache without a search.
    Cached(Box<ScheduleResult>),
}

impl StartOutcome {
    /// Whether the outcome came from the cache.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// In-flight run. Doubles as the search monitor of its worker.
struct OptimizationJob {
    tournament_id: TournamentId,
    run_id: Uuid,
    fingerprint: Fingerprint,
    cancelled: AtomicBool,
    progress: Mutex<(Option<Phase>, Option<f64>)>,
    channel: ProgressChannel,
}

impl OptimizationJob {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl SearchMonitor for OptimizationJob {
    fn search_command(&self) -> SearchCommand {
        if self.cancelled.load(Ordering::Acquire) {
            SearchCommand::Terminate("cancelled by request".into())
        } else {
            SearchCommand::Continue
        }
    }

    fn on_phase_started(&self, phase: Phase) {
        *self.progress.lock() = (Some(phase), None);
        debug!(tournament_id = self.tournament_id, run_id = %self.run_id, %phase, "phase started");
        self.channel.publish(ProgressEvent::phase_started(self.tournament_id, phase));
    }

    fn on_progress(&self, phase: Phase, iteration: u64, best_score: f64) {
        *self.progress.lock() = (Some(phase), Some(best_score));
        self.channel.publish(ProgressEvent::progress(self.tournament_id, phase, iteration, best_score));
    }

    fn on_phase_completed(&self, phase: Phase, best_score: f64) {
        *self.progress.lock() = (Some(phase), Some(best_score));
        info!(
            tournament_id = self.tournament_id,
            run_id = %self.run_id,
            %phase,
            best_score,
            "phase completed"
        );
        self.channel.publish(ProgressEvent::phase_completed(self.tournament_id, phase, best_score));
    }
}

struct Shared {
    store: Arc<dyn TournamentStore>,
    cache: Mutex<Box<dyn ResultCache>>,
    settings: Arc<dyn SettingsProvider>,
    config: ServiceConfig,
    jobs: Mutex<HashMap<TournamentId, Arc<OptimizationJob>>>,
    channels: Mutex<HashMap<TournamentId, ProgressChannel>>,
    states: Mutex<HashMap<TournamentId, JobState>>,
    terminal: Condvar,
}

impl Shared {
    fn channel(&self, id: TournamentId) -> ProgressChannel {
        self.channels
            .lock()
            .entry(id)
            .or_insert_with(|| ProgressChannel::new(self.config.progress_buffer))
            .clone()
    }

    fn subscribe(&self, id: TournamentId) -> ProgressSubscription {
        self.channels
            .lock()
            .entry(id)
            .or_insert_with(|| ProgressChannel::new(self.config.progress_buffer))
            .subscribe()
    }

    /// Forget the channel of a tournament nobody listens to and nothing runs for.
    fn release_channel(&self, id: TournamentId) {
        let jobs = self.jobs.lock();
        if jobs.contains_key(&id) {
            return;
        }
        let mut channels = self.channels.lock();
        if channels.get(&id).is_some_and(|c| c.subscriber_count() == 0) {
            channels.remove(&id);
        }
    }

    fn set_state(&self, id: TournamentId, state: JobState) {
        let terminal = state.is_terminal();
        self.states.lock().insert(id, state);
        if terminal {
            self.terminal.notify_all();
        }
    }

    /// Drop the job and record its terminal state in one step.
    fn finish(&self, job: &OptimizationJob, state: JobState, event: ProgressEvent) {
        {
            let mut jobs = self.jobs.lock();
            if jobs.get(&job.tournament_id).is_some_and(|j| j.run_id == job.run_id) {
                jobs.remove(&job.tournament_id);
            }
            self.set_state(job.tournament_id, state);
        }
        job.channel.publish(event);
        self.release_channel(job.tournament_id);
    }
}

/// Runs and tracks optimizations per tournament. Cheap to clone.
#[derive(Clone)]
pub struct JobCoordinator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for JobCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobCoordinator")
            .field("active_jobs", &self.shared.jobs.lock().len())
            .field("cached_results", &self.shared.cache.lock().len())
            .finish_non_exhaustive()
    }
}

impl JobCoordinator {
    /// Assemble a coordinator from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn TournamentStore>,
        cache: Box<dyn ResultCache>,
        settings: Arc<dyn SettingsProvider>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                cache: Mutex::new(cache),
                settings,
                config,
                jobs: Mutex::new(HashMap::new()),
                channels: Mutex::new(HashMap::new()),
                states: Mutex::new(HashMap::new()),
                terminal: Condvar::new(),
            }),
        }
    }

    /// Start optimizing a tournament.
    ///
    /// Inputs are loaded, validated and fingerprinted before anything else;
    /// a cached result completes the tournament immediately.
    ///
    /// # Errors
    ///
    /// - [`OptimizationError::TournamentNotFound`] / [`OptimizationError::Store`] from the store
    /// - [`OptimizationError::UnknownSettings`] for an unknown preset
    /// - [`OptimizationError::InvalidProblem`] for empty or contradictory inputs
    /// - [`OptimizationError::AlreadyRunning`] while a run is active
    /// - [`OptimizationError::InternalFault`] if the worker thread cannot be spawned
    pub async fn start(&self, id: TournamentId) -> Result<StartOutcome, OptimizationError> {
        let inputs = self.shared.store.load_tournament_inputs(id).await?;
        let settings = self.shared.settings.resolve(&inputs.settings)?;
        settings.validate().map_err(OptimizationError::InvalidProblem)?;
        let problem = Problem::from_inputs(&inputs)?;
        let fp = fingerprint(&inputs.teams, &inputs.boats, inputs.flights, &settings)?;

        if self.shared.jobs.lock().contains_key(&id) {
            return Err(OptimizationError::AlreadyRunning(id));
        }

        let lookup = Instant::now();
        let cached = self.shared.cache.lock().get(&fp);
        if let Some(mut result) = cached {
            result.from_cache = true;
            result.computation_time_ms = u64::try_from(lookup.elapsed().as_millis()).unwrap_or(u64::MAX);
            self.shared.store.save_schedule_result(id, &result).await?;
            self.shared.set_state(id, JobState::Completed);
            self.shared.channel(id).publish(ProgressEvent::completed(
                id,
                result.final_score,
                "served from cache",
            ));
            self.shared.release_channel(id);
            info!(tournament_id = id, fingerprint = fp.short(), "schedule served from cache");
            return Ok(StartOutcome::Cached(Box::new(result)));
        }

        let job = {
            let mut jobs = self.shared.jobs.lock();
            if jobs.contains_key(&id) {
                return Err(OptimizationError::AlreadyRunning(id));
            }
            let job = Arc::new(OptimizationJob {
                tournament_id: id,
                run_id: Uuid::new_v4(),
                fingerprint: fp.clone(),
                cancelled: AtomicBool::new(false),
                progress: Mutex::new((None, None)),
                channel: self.shared.channel(id),
            });
            jobs.insert(id, Arc::clone(&job));
            self.shared.set_state(id, JobState::Running);
            job
        };

        let run_id = job.run_id;
        let shared = Arc::clone(&self.shared);
        let worker_job = Arc::clone(&job);
        let spawned = thread::Builder::new()
            .name(format!("regatta-opt-{id}"))
            .stack_size(self.shared.config.worker_stack_size)
            .spawn(move || run_worker(&shared, &worker_job, &problem, &settings));

        if let Err(e) = spawned {
            let message = format!("failed to spawn optimization worker: {e}");
            error!(tournament_id = id, run_id = %run_id, error = %e, "worker spawn failed");
            self.shared.finish(&job, JobState::Failed(message.clone()), ProgressEvent::failed(id, &message));
            return Err(OptimizationError::InternalFault(message));
        }

        info!(tournament_id = id, run_id = %run_id, fingerprint = fp.short(), "optimization started");
        Ok(StartOutcome::Started { run_id, fingerprint: fp })
    }

    /// Request cancellation. Always succeeds; returns whether a run was active.
    pub fn cancel(&self, id: TournamentId) -> bool {
        let job = self.shared.jobs.lock().get(&id).cloned();
        match job {
            Some(job) => {
                job.cancel();
                info!(tournament_id = id, run_id = %job.run_id, "cancellation requested");
                true
            }
            None => {
                debug!(tournament_id = id, "cancel without active run");
                false
            }
        }
    }

    /// Current lifecycle snapshot.
    ///
    /// # Errors
    ///
    /// Propagates store failures while checking for a persisted result.
    pub async fn status(&self, id: TournamentId) -> Result<StatusReport, OptimizationError> {
        let state = self.state(id);
        let (phase, best_score) = self
            .shared
            .jobs
            .lock()
            .get(&id)
            .map_or((None, None), |job| *job.progress.lock());
        let has_result = self.shared.store.load_schedule_result(id).await?.is_some();
        let error = match &state {
            JobState::Failed(message) => Some(message.clone()),
            _ => None,
        };
        Ok(StatusReport {
            tournament_id: id,
            status: state.status(),
            is_running: state == JobState::Running,
            has_result,
            phase,
            best_score,
            error,
        })
    }

    /// Lifecycle state without touching the store.
    #[must_use]
    pub fn state(&self, id: TournamentId) -> JobState {
        self.shared.states.lock().get(&id).cloned().unwrap_or_default()
    }

    /// Persisted schedule of a tournament.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn result(&self, id: TournamentId) -> Result<Option<ScheduleResult>, OptimizationError> {
        self.shared.store.load_schedule_result(id).await
    }

    /// Subscribe to a tournament's progress; valid before a run starts.
    #[must_use]
    pub fn subscribe(&self, id: TournamentId) -> ProgressSubscription {
        self.shared.subscribe(id)
    }

    /// Block until the tournament reaches a terminal state or `timeout` elapses.
    #[must_use]
    pub fn wait_for_terminal(&self, id: TournamentId, timeout: Duration) -> Option<JobState> {
        let deadline = Instant::now() + timeout;
        let mut states = self.shared.states.lock();
        loop {
            if let Some(state) = states.get(&id).filter(|s| s.is_terminal()) {
                return Some(state.clone());
            }
            if self.shared.terminal.wait_until(&mut states, deadline).timed_out() {
                return states.get(&id).filter(|s| s.is_terminal()).cloned();
            }
        }
    }

    /// Async variant of [`JobCoordinator::wait_for_terminal`]; waits on the
    /// blocking pool.
    pub async fn wait_for_terminal_async(&self, id: TournamentId, timeout: Duration) -> Option<JobState> {
        let coordinator = self.clone();
        tokio::task::spawn_blocking(move || coordinator.wait_for_terminal(id, timeout))
            .await
            .ok()
            .flatten()
    }

    /// Number of cached results.
    #[must_use]
    pub fn cached_results(&self) -> usize {
        self.shared.cache.lock().len()
    }

    /// Number of active runs.
    #[must_use]
    pub fn active_jobs(&self) -> usize {
        self.shared.jobs.lock().len()
    }

    /// Service configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.shared.config
    }
}

fn run_worker(shared: &Shared, job: &OptimizationJob, problem: &Problem, settings: &OptimizerSettings) {
    let id = job.tournament_id;
    job.channel.publish(ProgressEvent::started(id));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pipeline::optimize(problem, settings, job.fingerprint.clone(), job)
    }))
    .unwrap_or_else(|payload| Err(OptimizationError::InternalFault(panic_message(payload.as_ref()))));

    match outcome.and_then(|result| commit(shared, job, result)) {
        Ok(result) => {
            info!(
                tournament_id = id,
                run_id = %job.run_id,
                final_score = result.final_score,
                computation_time_ms = result.computation_time_ms,
                "optimization completed"
            );
            shared.finish(
                job,
                JobState::Completed,
                ProgressEvent::completed(id, result.final_score, "optimization completed"),
            );
        }
        Err(OptimizationError::Cancelled) => {
            info!(tournament_id = id, run_id = %job.run_id, "optimization cancelled");
            shared.finish(job, JobState::Cancelled, ProgressEvent::cancelled(id));
        }
        Err(e) => {
            let message = e.to_string();
            error!(tournament_id = id, run_id = %job.run_id, error = %message, "optimization failed");
            shared.finish(job, JobState::Failed(message.clone()), ProgressEvent::failed(id, message));
        }
    }
}

/// Settle the schedule for this fingerprint, then persist exactly that one.
///
/// The first run to reach the cache wins; later runs adopt its result and
/// discard their own. A failed store save takes our cache entry back out.
fn commit(
    shared: &Shared,
    job: &OptimizationJob,
    result: ScheduleResult,
) -> Result<ScheduleResult, OptimizationError> {
    if job.cancelled.load(Ordering::Acquire) {
        return Err(OptimizationError::Cancelled);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| OptimizationError::InternalFault(format!("worker runtime: {e}")))?;

    let (committed, inserted) = {
        let mut cache = shared.cache.lock();
        match cache.get(&job.fingerprint) {
            Some(mut cached) => {
                cached.from_cache = true;
                (cached, false)
            }
            None => {
                cache.put(job.fingerprint.clone(), result.clone());
                (result, true)
            }
        }
    };
    if !inserted {
        warn!(
            tournament_id = job.tournament_id,
            run_id = %job.run_id,
            fingerprint = job.fingerprint.short(),
            "result already cached by an earlier run, discarding ours"
        );
    }

    if let Err(e) = runtime.block_on(shared.store.save_schedule_result(job.tournament_id, &committed)) {
        if inserted {
            shared.cache.lock().remove(&job.fingerprint);
        }
        return Err(e);
    }
    Ok(committed)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(|| "worker panicked".to_string(), |msg| format!("worker panicked: {msg}"))
}
