//! # Despachador
//! src/jobs/dispatcher.rs
//!
//! Fachada que une el pool, el registro de cancelación y el Expiry Timer.
//! Es dueño de los tres y de la fuente de aleatoriedad; se comparte entre
//! conexiones con un `Arc`.
//!
//! ## Flujo de un submit
//!
//! ```text
//! validate → register(signal) → arm(ttl) → post_work
//!                                              │
//!                      saturado ←──────────────┤
//!             disarm + remove + PoolSaturated  │
//!                                              ▼
//!                           slot termina → hook: disarm + remove
//! ```

use super::cancel::CancelSignal;
use super::job::Job;
use super::pool::{CompletionHook, WorkPool};
use super::registry::CancellationRegistry;
use super::rng::SharedRng;
use super::timer::ExpiryTimer;
use super::types::{JobSummary, PoolSnapshot};
use crate::config::Config;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::scenario::{BotConfig, ScenarioRunner};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Parámetros del despachador
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub concurrency_limit: usize,
    pub queue_capacity: usize,

    /// Duración de un minuto de `timeToLive`
    pub ttl_unit: Duration,

    /// Sugerencia para clientes rechazados por saturación
    pub retry_after: Duration,
}

impl DispatcherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit(),
            queue_capacity: config.queue_length,
            ttl_unit: config.ttl_unit(),
            retry_after: Duration::from_secs(config.retry_after_secs),
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: 1,
            queue_capacity: 0,
            ttl_unit: Duration::from_secs(60),
            retry_after: Duration::from_secs(5),
        }
    }
}

/// Fachada de despacho de corridas
pub struct Dispatcher {
    registry: Arc<CancellationRegistry>,
    timer: Arc<ExpiryTimer>,
    pool: WorkPool,
    rng: SharedRng,
    settings: DispatcherSettings,
    metrics: MetricsCollector,
}

impl Dispatcher {
    /// Levanta el timer y el pool
    pub fn new(
        settings: DispatcherSettings,
        runner: Arc<dyn ScenarioRunner>,
        rng: SharedRng,
    ) -> Result<Self> {
        Self::with_metrics(settings, runner, rng, MetricsCollector::new())
    }

    /// Igual que `new`, registrando los resultados en `metrics`
    pub fn with_metrics(
        settings: DispatcherSettings,
        runner: Arc<dyn ScenarioRunner>,
        rng: SharedRng,
        metrics: MetricsCollector,
    ) -> Result<Self> {
        let registry = Arc::new(CancellationRegistry::new());
        let timer = Arc::new(ExpiryTimer::start(Arc::clone(&registry))?);

        let hook: CompletionHook = {
            let registry = Arc::clone(&registry);
            let timer = Arc::clone(&timer);
            let metrics = metrics.clone();
            Arc::new(move |summary: &JobSummary| {
                timer.disarm(summary.id);
                registry.remove(summary.id);
                metrics.record_outcome(summary.state);
            })
        };

        let pool = WorkPool::with_completion_hook(
            settings.concurrency_limit,
            settings.queue_capacity,
            runner,
            hook,
        )?;

        Ok(Self {
            registry,
            timer,
            pool,
            rng,
            settings,
            metrics,
        })
    }

    /// Valida la configuración y admite una corrida nueva
    pub fn submit(&self, mut config: BotConfig) -> Result<Uuid> {
        let id = Uuid::new_v4();
        config.validate(id)?;

        let job = Job::new(id, config, CancelSignal::new(), self.rng.clone());
        self.submit_job(job)?;
        Ok(id)
    }

    /// Admite un job ya construido
    ///
    /// El timer se arma antes de entregar el job al pool para que una
    /// corrida que arranca de inmediato ya tenga su vencimiento.
    pub fn submit_job(&self, job: Job) -> Result<()> {
        let id = job.id();
        let ttl = self.ttl_for(job.config());

        self.registry.register(id, job.cancel().clone())?;
        self.timer.arm(id, ttl);

        if let Err(rejected) = self.pool.post_work(job) {
            self.timer.disarm(id);
            self.registry.remove(id);
            self.metrics.record_rejected();
            tracing::warn!(job_id = %id, "Work pool saturated, job rejected");
            return Err(rejected.into());
        }

        self.metrics.record_submitted();
        tracing::info!(job_id = %id, ttl_secs = ttl.as_secs(), "Job accepted");
        Ok(())
    }

    /// Pide que una corrida se detenga
    pub fn request_stop(&self, id: Uuid) -> Result<()> {
        self.registry.cancel(id)?;
        self.timer.disarm(id);
        tracing::info!(job_id = %id, "Job stop requested");
        Ok(())
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.pool.info()
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Cancela todo y espera a que los slots terminen
    pub fn shutdown(&self) {
        let cancelled = self.registry.cancel_all();
        tracing::info!(cancelled, "Dispatcher shutting down");
        self.timer.shutdown();
        self.pool.shutdown();
    }

    fn ttl_for(&self, config: &BotConfig) -> Duration {
        self.settings
            .ttl_unit
            .saturating_mul(config.ttl_minutes())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("settings", &self.settings)
            .field("registered", &self.registry.len())
            .field("armed", &self.timer.armed())
            .finish()
    }
}
