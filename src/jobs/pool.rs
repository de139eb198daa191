//! # Pool de Workers
//! src/jobs/pool.rs
//!
//! Un número fijo de slots persistentes (un thread cada uno) más una cola
//! FIFO acotada. La admisión nunca bloquea: el job arranca en un slot libre,
//! espera en la cola o se rechaza de inmediato con `PoolSaturated`.
//!
//! ## Contabilidad de slots
//!
//! - `free`: slots en espera que nadie reservó todavía.
//! - `handoff`: jobs ya asignados a un slot libre; cuentan como activos.
//! - `backlog`: la cola propiamente dicha; cuenta como encolados.
//!
//! Un job solo va a `handoff` si la cola está vacía, así que el orden de
//! arranque respeta el orden de admisión.

use super::cancel::CancelSignal;
use super::job::Job;
use super::lock;
use super::types::{unix_now, unix_secs, JobState, JobSummary, PoolSnapshot};
use crate::error::DispatchError;
use crate::scenario::ScenarioRunner;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use uuid::Uuid;

/// Cuántos jobs terminados se conservan para `/info`
const RECENT_HISTORY: usize = 64;

/// Se invoca una vez por cada job que sale del pool, fuera de cualquier lock
pub type CompletionHook = Arc<dyn Fn(&JobSummary) + Send + Sync>;

/// Rechazo de admisión: el job vuelve a manos de quien lo envió
pub struct Saturated {
    job: Job,
    queue_capacity: usize,
}

impl Saturated {
    pub fn job(&self) -> &Job {
        &self.job
    }
}

impl fmt::Debug for Saturated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saturated")
            .field("job_id", &self.job.id())
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl From<Saturated> for DispatchError {
    fn from(rejected: Saturated) -> Self {
        DispatchError::PoolSaturated {
            queue_capacity: rejected.queue_capacity,
        }
    }
}

/// Pool de ejecución acotado
pub struct WorkPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct Shared {
    state: Mutex<PoolState>,
    work_ready: Condvar,
    runner: Arc<dyn ScenarioRunner>,
    hook: Option<CompletionHook>,
    concurrency_limit: usize,
    queue_capacity: usize,
}

struct PoolState {
    backlog: VecDeque<Job>,
    handoff: VecDeque<Job>,
    free: usize,
    active: HashMap<Uuid, ActiveJob>,
    recent: VecDeque<JobSummary>,
    shutdown: bool,
}

struct ActiveJob {
    since: u64,
    cancel: CancelSignal,
}

impl WorkPool {
    /// Crea el pool y levanta `concurrency_limit` slots
    pub fn new(
        concurrency_limit: usize,
        queue_capacity: usize,
        runner: Arc<dyn ScenarioRunner>,
    ) -> std::io::Result<Self> {
        Self::start(concurrency_limit, queue_capacity, runner, None)
    }

    /// Igual que `new`, notificando cada job terminado a `hook`
    pub fn with_completion_hook(
        concurrency_limit: usize,
        queue_capacity: usize,
        runner: Arc<dyn ScenarioRunner>,
        hook: CompletionHook,
    ) -> std::io::Result<Self> {
        Self::start(concurrency_limit, queue_capacity, runner, Some(hook))
    }

    fn start(
        concurrency_limit: usize,
        queue_capacity: usize,
        runner: Arc<dyn ScenarioRunner>,
        hook: Option<CompletionHook>,
    ) -> std::io::Result<Self> {
        if concurrency_limit == 0 {
            tracing::warn!("Concurrency limit of 0 requested, using 1 slot");
        }
        let concurrency_limit = concurrency_limit.max(1);

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                backlog: VecDeque::with_capacity(queue_capacity.min(1024)),
                handoff: VecDeque::new(),
                free: concurrency_limit,
                active: HashMap::new(),
                recent: VecDeque::with_capacity(RECENT_HISTORY),
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            runner,
            hook,
            concurrency_limit,
            queue_capacity,
        });

        let pool = Self {
            shared,
            workers: Mutex::new(Vec::with_capacity(concurrency_limit)),
        };

        for slot in 0..concurrency_limit {
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("bot-slot-{}", slot))
                .spawn(move || slot_loop(slot, &shared));

            match spawned {
                Ok(handle) => lock(&pool.workers).push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(e);
                }
            }
        }

        tracing::info!(concurrency_limit, queue_capacity, "Work pool started");
        Ok(pool)
    }

    /// Intenta admitir un job sin bloquear
    pub fn post_work(&self, job: Job) -> Result<(), Saturated> {
        let mut state = lock(&self.shared.state);
        let id = job.id();

        if state.shutdown {
            tracing::warn!(job_id = %id, "Pool is shutting down, rejecting job");
            return Err(self.saturated(job));
        }

        if state.backlog.is_empty() && state.free > 0 {
            state.free -= 1;
            state.active.insert(
                id,
                ActiveJob {
                    since: unix_now(),
                    cancel: job.cancel().clone(),
                },
            );
            state.handoff.push_back(job);
            self.shared.work_ready.notify_one();
            tracing::debug!(job_id = %id, "Job handed to a free slot");
            return Ok(());
        }

        if state.backlog.len() < self.shared.queue_capacity {
            state.backlog.push_back(job);
            tracing::debug!(job_id = %id, queued = state.backlog.len(), "Job queued");
            return Ok(());
        }

        Err(self.saturated(job))
    }

    fn saturated(&self, job: Job) -> Saturated {
        Saturated {
            job,
            queue_capacity: self.shared.queue_capacity,
        }
    }

    /// Jobs ocupando un slot
    pub fn active_routines(&self) -> usize {
        lock(&self.shared.state).active.len()
    }

    /// Jobs esperando en la cola
    pub fn queued_work(&self) -> usize {
        lock(&self.shared.state).backlog.len()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.shared.concurrency_limit
    }

    pub fn queue_capacity(&self) -> usize {
        self.shared.queue_capacity
    }

    /// Foto de diagnóstico; no usar para tomar decisiones de control
    pub fn info(&self) -> PoolSnapshot {
        let state = lock(&self.shared.state);

        let mut running: Vec<JobSummary> = state
            .active
            .iter()
            .map(|(id, active)| JobSummary::new(*id, JobState::Running, active.since))
            .collect();
        running.sort_by_key(|summary| (summary.since, summary.id));

        let queued = state
            .backlog
            .iter()
            .map(|job| JobSummary::new(job.id(), JobState::Queued, unix_secs(job.submitted_at())));

        PoolSnapshot {
            active_count: state.active.len(),
            queued_count: state.backlog.len(),
            concurrency_limit: self.shared.concurrency_limit,
            queue_capacity: self.shared.queue_capacity,
            jobs: running.into_iter().chain(queued).collect(),
            recent: state.recent.iter().rev().cloned().collect(),
        }
    }

    /// Apaga el pool
    ///
    /// Los jobs encolados se descartan como cancelados; a los activos se les
    /// dispara la señal y se espera a que sus slots terminen.
    pub fn shutdown(&self) {
        let drained = self.begin_shutdown();
        if let Some(hook) = &self.shared.hook {
            for summary in &drained {
                hook(summary);
            }
        }

        let workers: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Slot thread panicked outside of a job");
            }
        }
    }

    fn begin_shutdown(&self) -> Vec<JobSummary> {
        let mut state = lock(&self.shared.state);
        if state.shutdown {
            return Vec::new();
        }
        state.shutdown = true;

        let now = unix_now();
        let drained: Vec<JobSummary> = state
            .backlog
            .drain(..)
            .map(|job| {
                job.cancel().fire();
                JobSummary::new(job.id(), JobState::Cancelled, now)
            })
            .collect();
        for summary in &drained {
            push_recent(&mut state, summary.clone());
        }

        for active in state.active.values() {
            active.cancel.fire();
        }

        self.shared.work_ready.notify_all();
        tracing::info!(
            discarded = drained.len(),
            active = state.active.len(),
            "Work pool shutting down"
        );
        drained
    }
}

impl Drop for WorkPool {
    fn drop(&mut self) {
        // Sin join: un runner que ignora la señal no debe colgar el drop
        let drained = self.begin_shutdown();
        if let Some(hook) = &self.shared.hook {
            for summary in &drained {
                hook(summary);
            }
        }
    }
}

fn slot_loop(slot: usize, shared: &Shared) {
    tracing::debug!(slot, "Slot started");
    let mut state = lock(&shared.state);

    loop {
        // El slot está libre (contado en `free`) hasta tomar un job
        let job = loop {
            if let Some(job) = state.handoff.pop_front() {
                break Some(job);
            }
            if let Some(job) = state.backlog.pop_front() {
                state.free -= 1;
                state.active.insert(
                    job.id(),
                    ActiveJob {
                        since: unix_now(),
                        cancel: job.cancel().clone(),
                    },
                );
                break Some(job);
            }
            if state.shutdown {
                break None;
            }
            state = wait(&shared.work_ready, state);
        };

        let Some(job) = job else {
            tracing::debug!(slot, "Slot stopped");
            return;
        };
        drop(state);

        let summary = execute(slot, shared, &job);

        // El job sigue contando como activo mientras corre el hook
        if let Some(hook) = &shared.hook {
            hook(&summary);
        }

        state = lock(&shared.state);
        state.active.remove(&job.id());
        push_recent(&mut state, summary);
        state.free += 1;
    }
}

/// Corre el job aislando cualquier pánico del runner
fn execute(slot: usize, shared: &Shared, job: &Job) -> JobSummary {
    let id = job.id();
    if job.cancel().is_cancelled() {
        tracing::info!(job_id = %id, slot, "Job cancelled while queued, skipping");
        return JobSummary::new(id, JobState::Cancelled, unix_now());
    }

    let started = Instant::now();
    tracing::info!(job_id = %id, slot, "Job started");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        shared.runner.run(job.config(), job.cancel(), job.rng())
    }));

    let mut summary = JobSummary::new(id, JobState::Completed, unix_now());
    match outcome {
        Ok(Ok(stats)) => {
            summary.visits = Some(stats.visits);
            if job.cancel().is_cancelled() {
                summary.state = JobState::Cancelled;
            }
        }
        Ok(Err(e)) => fail(&mut summary, e.to_string()),
        Err(payload) => fail(&mut summary, panic_message(payload.as_ref())),
    }

    tracing::info!(
        job_id = %id,
        slot,
        state = summary.state.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Job finished"
    );
    summary
}

fn fail(summary: &mut JobSummary, message: String) {
    let error = DispatchError::RunnerFailure {
        id: summary.id,
        message,
    };
    tracing::error!(job_id = %summary.id, error = %error, "Job failed");
    summary.state = JobState::Failed;
    summary.error = Some(error.to_string());
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

fn push_recent(state: &mut PoolState, summary: JobSummary) {
    if state.recent.len() >= RECENT_HISTORY {
        state.recent.pop_front();
    }
    state.recent.push_back(summary);
}

fn wait<'a>(condvar: &Condvar, guard: MutexGuard<'a, PoolState>) -> MutexGuard<'a, PoolState> {
    condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
}
