//! Tests de integración del pool y del despachador
//! tests/pool_test.rs
//!
//! Propiedades de admisión, orden y cancelación observadas desde la API
//! pública, con runners de prueba controlados por el propio test.

use assert_matches::assert_matches;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use uabot_dispatch::jobs::{
    CancelSignal, CancellationRegistry, Dispatcher, DispatcherSettings, ExpiryTimer, Job, JobState,
    SharedRng, WorkPool,
};
use uabot_dispatch::scenario::{BotConfig, RunStats, ScenarioError, ScenarioRunner};
use uabot_dispatch::DispatchError;
use uuid::Uuid;

/// Anota el org de cada corrida al arrancar y espera la cancelación
#[derive(Clone, Default)]
struct RecordingRunner {
    started: Arc<Mutex<Vec<String>>>,
}

impl ScenarioRunner for RecordingRunner {
    fn run(
        &self,
        config: &BotConfig,
        cancel: &CancelSignal,
        _rng: &SharedRng,
    ) -> Result<RunStats, ScenarioError> {
        self.started.lock().unwrap().push(config.org.clone());
        while !cancel.wait_timeout(Duration::from_millis(5)) {}
        Ok(RunStats::default())
    }
}

/// Cuenta visitas en ticks fijos hasta que lo cancelen
struct TickingRunner {
    tick: Duration,
}

impl ScenarioRunner for TickingRunner {
    fn run(
        &self,
        _config: &BotConfig,
        cancel: &CancelSignal,
        _rng: &SharedRng,
    ) -> Result<RunStats, ScenarioError> {
        let mut stats = RunStats::default();
        loop {
            stats.visits += 1;
            if cancel.wait_timeout(self.tick) {
                return Ok(stats);
            }
        }
    }
}

struct PanickingRunner;

impl ScenarioRunner for PanickingRunner {
    fn run(
        &self,
        config: &BotConfig,
        _cancel: &CancelSignal,
        _rng: &SharedRng,
    ) -> Result<RunStats, ScenarioError> {
        if config.org == "boom" {
            panic!("scenario blew up");
        }
        Ok(RunStats { visits: 1, clicks: 0 })
    }
}

fn config(org: &str) -> BotConfig {
    let mut levels = BTreeMap::new();
    levels.insert("BotSearch".to_string(), vec!["default".to_string()]);
    BotConfig {
        origin_levels: Some(levels),
        search_endpoint: "https://search.example.com".to_string(),
        search_token: "search-token".to_string(),
        analytics_endpoint: "https://analytics.example.com".to_string(),
        analytics_token: "analytics-token".to_string(),
        org: org.to_string(),
        time_to_live: 5,
        ..BotConfig::default()
    }
}

fn job(org: &str) -> Job {
    Job::new(Uuid::new_v4(), config(org), CancelSignal::new(), SharedRng::from_seed(11))
}

fn settings(limit: usize, capacity: usize, ttl_unit: Duration) -> DispatcherSettings {
    DispatcherSettings {
        concurrency_limit: limit,
        queue_capacity: capacity,
        ttl_unit,
        ..DispatcherSettings::default()
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_admission_never_exceeds_limit_plus_capacity() {
    let pool = WorkPool::new(3, 4, Arc::new(RecordingRunner::default())).unwrap();

    let mut accepted = 0;
    let mut rejected = 0;
    for i in 0..20 {
        match pool.post_work(job(&format!("job-{}", i))) {
            Ok(()) => accepted += 1,
            Err(_) => rejected += 1,
        }
        assert!(pool.active_routines() + pool.queued_work() <= 7);
        assert!(pool.active_routines() <= 3);
        assert!(pool.queued_work() <= 4);
    }

    assert_eq!(accepted, 7);
    assert_eq!(rejected, 13);
    pool.shutdown();
}

#[test]
fn test_limit_one_capacity_one_saturates_third() {
    let runner = RecordingRunner::default();
    let dispatcher = Dispatcher::new(
        settings(1, 1, Duration::from_secs(60)),
        Arc::new(runner.clone()),
        SharedRng::from_seed(1),
    )
    .unwrap();

    let a = dispatcher.submit(config("A")).unwrap();
    let b = dispatcher.submit(config("B")).unwrap();
    assert_matches!(
        dispatcher.submit(config("C")),
        Err(DispatchError::PoolSaturated { queue_capacity: 1 })
    );

    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.active_count, 1);
    assert_eq!(snapshot.queued_count, 1);
    assert_eq!((snapshot.jobs[0].id, snapshot.jobs[0].state), (a, JobState::Running));
    assert_eq!((snapshot.jobs[1].id, snapshot.jobs[1].state), (b, JobState::Queued));
    dispatcher.shutdown();
}

#[test]
fn test_fifo_start_order() {
    let runner = RecordingRunner::default();
    let dispatcher = Dispatcher::new(
        settings(1, 5, Duration::from_secs(60)),
        Arc::new(runner.clone()),
        SharedRng::from_seed(1),
    )
    .unwrap();

    let ids: Vec<Uuid> = ["A", "B", "C"]
        .iter()
        .map(|org| dispatcher.submit(config(org)).unwrap())
        .collect();

    for (i, id) in ids.iter().enumerate() {
        assert!(wait_until(|| runner.started.lock().unwrap().len() == i + 1));
        dispatcher.request_stop(*id).unwrap();
    }

    assert!(wait_until(|| dispatcher.snapshot().active_count == 0));
    assert_eq!(*runner.started.lock().unwrap(), vec!["A", "B", "C"]);
}

#[test]
fn test_stop_queued_job_skips_its_run() {
    let runner = RecordingRunner::default();
    let dispatcher = Dispatcher::new(
        settings(1, 2, Duration::from_secs(60)),
        Arc::new(runner.clone()),
        SharedRng::from_seed(1),
    )
    .unwrap();

    let a = dispatcher.submit(config("A")).unwrap();
    let b = dispatcher.submit(config("B")).unwrap();
    assert!(wait_until(|| runner.started.lock().unwrap().len() == 1));
    assert_eq!(dispatcher.snapshot().queued_count, 1);

    dispatcher.request_stop(b).unwrap();
    assert_matches!(dispatcher.request_stop(b), Err(DispatchError::UnknownJob(_)));
    dispatcher.request_stop(a).unwrap();

    assert!(wait_until(|| {
        let snapshot = dispatcher.snapshot();
        snapshot.active_count == 0 && snapshot.queued_count == 0 && snapshot.recent.len() == 2
    }));

    assert_eq!(*runner.started.lock().unwrap(), vec!["A"]);
    let recent = dispatcher.snapshot().recent;
    let skipped = recent.iter().find(|summary| summary.id == b).unwrap();
    assert_eq!(skipped.state, JobState::Cancelled);
    assert_eq!(skipped.visits, None);
    assert_eq!(dispatcher.metrics().job_counters().cancelled, 2);
}

#[test]
fn test_double_cancel_fires_once() {
    let dispatcher = Dispatcher::new(
        settings(1, 0, Duration::from_secs(60)),
        Arc::new(TickingRunner { tick: Duration::from_millis(10) }),
        SharedRng::from_seed(1),
    )
    .unwrap();
    let id = dispatcher.submit(config("A")).unwrap();

    assert!(dispatcher.request_stop(id).is_ok());
    assert_matches!(dispatcher.request_stop(id), Err(DispatchError::UnknownJob(dup)) if dup == id);

    assert!(wait_until(|| dispatcher.metrics().job_counters().cancelled == 1));
    assert_eq!(dispatcher.metrics().job_counters().completed, 0);
}

#[test]
fn test_expiry_after_completion_is_harmless() {
    let registry = Arc::new(CancellationRegistry::new());
    let timer = ExpiryTimer::start(Arc::clone(&registry)).unwrap();
    let id = Uuid::new_v4();
    let signal = CancelSignal::new();

    registry.register(id, signal.clone()).unwrap();
    timer.arm(id, Duration::from_millis(20));
    // El job terminó por su cuenta antes del vencimiento
    assert!(registry.remove(id));

    thread::sleep(Duration::from_millis(100));
    assert!(!signal.is_cancelled());
    assert_matches!(registry.cancel(id), Err(DispatchError::UnknownJob(_)));
}

#[test]
fn test_timer_stops_ticking_runner_within_one_tick() {
    let tick = Duration::from_millis(20);
    let dispatcher = Dispatcher::new(
        settings(1, 0, Duration::from_millis(100)),
        Arc::new(TickingRunner { tick }),
        SharedRng::from_seed(1),
    )
    .unwrap();

    let mut short = config("A");
    short.time_to_live = 1;
    let started = Instant::now();
    dispatcher.submit(short).unwrap();

    assert!(wait_until(|| !dispatcher.snapshot().recent.is_empty()));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(100) + tick * 10);

    let outcome = &dispatcher.snapshot().recent[0];
    assert_eq!(outcome.state, JobState::Cancelled);
    assert!(outcome.visits.unwrap() >= 1);
}

#[test]
fn test_explicit_stop_stops_ticking_runner() {
    let tick = Duration::from_millis(20);
    let dispatcher = Dispatcher::new(
        settings(1, 0, Duration::from_secs(60)),
        Arc::new(TickingRunner { tick }),
        SharedRng::from_seed(1),
    )
    .unwrap();
    let id = dispatcher.submit(config("A")).unwrap();
    thread::sleep(tick * 3);

    let stopped_at = Instant::now();
    dispatcher.request_stop(id).unwrap();
    assert!(wait_until(|| dispatcher.snapshot().active_count == 0));
    assert!(stopped_at.elapsed() < tick * 5);
}

#[test]
fn test_stop_unknown_id_leaves_pool_unchanged() {
    let runner = RecordingRunner::default();
    let dispatcher = Dispatcher::new(
        settings(1, 2, Duration::from_secs(60)),
        Arc::new(runner),
        SharedRng::from_seed(1),
    )
    .unwrap();
    dispatcher.submit(config("A")).unwrap();
    dispatcher.submit(config("B")).unwrap();
    let before = dispatcher.snapshot();

    assert_matches!(
        dispatcher.request_stop(Uuid::new_v4()),
        Err(DispatchError::UnknownJob(_))
    );

    let after = dispatcher.snapshot();
    assert_eq!(before.active_count, after.active_count);
    assert_eq!(before.queued_count, after.queued_count);
    assert_eq!(before.jobs, after.jobs);
    dispatcher.shutdown();
}

#[test]
fn test_panicking_runner_does_not_kill_slot() {
    let dispatcher = Dispatcher::new(
        settings(1, 2, Duration::from_secs(60)),
        Arc::new(PanickingRunner),
        SharedRng::from_seed(1),
    )
    .unwrap();

    dispatcher.submit(config("boom")).unwrap();
    dispatcher.submit(config("fine")).unwrap();

    assert!(wait_until(|| dispatcher.snapshot().recent.len() == 2));
    let recent = dispatcher.snapshot().recent;
    assert_eq!(recent[1].state, JobState::Failed);
    assert!(recent[1].error.as_deref().unwrap().contains("scenario blew up"));
    assert_eq!(recent[0].state, JobState::Completed);
    assert!(wait_until(|| dispatcher.metrics().job_counters().failed == 1));
}

#[test]
fn test_independent_dispatchers_coexist() {
    let first = Dispatcher::new(
        settings(1, 0, Duration::from_secs(60)),
        Arc::new(TickingRunner { tick: Duration::from_millis(10) }),
        SharedRng::from_seed(1),
    )
    .unwrap();
    let second = Dispatcher::new(
        settings(1, 0, Duration::from_secs(60)),
        Arc::new(TickingRunner { tick: Duration::from_millis(10) }),
        SharedRng::from_seed(2),
    )
    .unwrap();

    let id = first.submit(config("A")).unwrap();
    assert!(second.submit(config("B")).is_ok());
    assert_matches!(second.request_stop(id), Err(DispatchError::UnknownJob(_)));

    first.shutdown();
    second.shutdown();
}
