//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta y agrega métricas del servidor en tiempo real: peticiones
//! HTTP y el destino final de cada job despachado.

use crate::jobs::{lock, JobState};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Latencias guardadas para calcular percentiles
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    total_requests: u64,
    status_codes: HashMap<u16, u64>,

    /// Ventana de latencias en microsegundos, la más vieja al frente
    latencies: VecDeque<u64>,

    requests_per_route: HashMap<String, u64>,
    active_connections: u64,
    jobs: JobCounters,
}

/// Contadores del ciclo de vida de los jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounters {
    pub submitted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub failed: u64,
}

/// Percentiles de latencia en microsegundos
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub stddev: f64,
    pub samples: usize,
}

/// Snapshot de métricas, tal como se expone en `/metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub active_connections: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub top_routes: Vec<RouteCount>,
    pub latency_us: LatencySummary,
    pub jobs: JobCounters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteCount {
    pub route: String,
    pub count: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(MAX_LATENCY_SAMPLES),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
        }
    }

    /// Registra una petición atendida
    ///
    /// `route` es el patrón que resolvió el router (`/stop/{id}`), no el
    /// path literal, para que los ids no inflen el mapa.
    pub fn record_request(&self, route: &str, status_code: u16, latency: Duration) {
        let mut data = lock(&self.inner);

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCY_SAMPLES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        *data.requests_per_route.entry(route.to_string()).or_insert(0) += 1;
    }

    pub fn connection_opened(&self) {
        lock(&self.inner).active_connections += 1;
    }

    pub fn connection_closed(&self) {
        let mut data = lock(&self.inner);
        data.active_connections = data.active_connections.saturating_sub(1);
    }

    pub fn active_connections(&self) -> u64 {
        lock(&self.inner).active_connections
    }

    /// Un job fue admitido (en un slot o en la cola)
    pub fn record_submitted(&self) {
        lock(&self.inner).jobs.submitted += 1;
    }

    /// Un job fue rechazado por saturación
    pub fn record_rejected(&self) {
        lock(&self.inner).jobs.rejected += 1;
    }

    /// Un job salió del pool con el estado dado
    pub fn record_outcome(&self, state: JobState) {
        let mut data = lock(&self.inner);
        match state {
            JobState::Completed => data.jobs.completed += 1,
            JobState::Cancelled => data.jobs.cancelled += 1,
            JobState::Failed => data.jobs.failed += 1,
            JobState::Queued | JobState::Running => {
                tracing::warn!(state = state.as_str(), "Ignoring non-terminal job outcome");
            }
        }
    }

    pub fn job_counters(&self) -> JobCounters {
        lock(&self.inner).jobs
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = lock(&self.inner);

        let mut routes: Vec<RouteCount> = data
            .requests_per_route
            .iter()
            .map(|(route, count)| RouteCount {
                route: route.clone(),
                count: *count,
            })
            .collect();
        routes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.route.cmp(&b.route)));
        routes.truncate(10);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            total_requests: data.total_requests,
            active_connections: data.active_connections,
            status_codes: data.status_codes.iter().map(|(k, v)| (*k, *v)).collect(),
            top_routes: routes,
            latency_us: summarize(&data.latencies),
            jobs: data.jobs,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(latencies: &VecDeque<u64>) -> LatencySummary {
    if latencies.is_empty() {
        return LatencySummary::default();
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let avg = sorted.iter().sum::<u64>() / len as u64;
    let variance = sorted
        .iter()
        .map(|&x| {
            let diff = x as f64 - avg as f64;
            diff * diff
        })
        .sum::<f64>()
        / len as f64;

    LatencySummary {
        p50: sorted[len * 50 / 100],
        p95: sorted[len * 95 / 100],
        p99: sorted[len * 99 / 100],
        avg,
        stddev: variance.sqrt(),
        samples: len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector() {
        let collector = MetricsCollector::new();

        collector.record_request("/info", 200, Duration::from_millis(10));
        collector.record_request("/info", 200, Duration::from_millis(20));
        collector.record_request("/stop/{id}", 404, Duration::from_millis(5));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.status_codes.get(&200), Some(&2));
        assert_eq!(snapshot.status_codes.get(&404), Some(&1));
        assert_eq!(snapshot.top_routes[0].route, "/info");
    }

    #[test]
    fn test_percentiles() {
        let collector = MetricsCollector::new();
        for i in 1..=100 {
            collector.record_request("/info", 200, Duration::from_micros(i));
        }

        let latency = collector.snapshot().latency_us;
        assert!(latency.p50 > 0);
        assert!(latency.p95 > latency.p50);
        assert!(latency.p99 > latency.p95);
        assert_eq!(latency.samples, 100);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let collector = MetricsCollector::new();
        for i in 0..(MAX_LATENCY_SAMPLES as u64 + 500) {
            collector.record_request("/info", 200, Duration::from_micros(i));
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, MAX_LATENCY_SAMPLES as u64 + 500);
        assert_eq!(snapshot.latency_us.samples, MAX_LATENCY_SAMPLES);
    }

    #[test]
    fn test_active_connections_no_negative() {
        let collector = MetricsCollector::new();

        collector.connection_opened();
        collector.connection_opened();
        assert_eq!(collector.active_connections(), 2);

        collector.connection_closed();
        collector.connection_closed();
        collector.connection_closed();
        assert_eq!(collector.active_connections(), 0);
    }

    #[test]
    fn test_job_counters() {
        let collector = MetricsCollector::new();

        collector.record_submitted();
        collector.record_submitted();
        collector.record_rejected();
        collector.record_outcome(JobState::Completed);
        collector.record_outcome(JobState::Cancelled);
        collector.record_outcome(JobState::Running);

        assert_eq!(
            collector.job_counters(),
            JobCounters {
                submitted: 2,
                rejected: 1,
                completed: 1,
                cancelled: 1,
                failed: 0,
            }
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let collector = MetricsCollector::new();
        collector.record_request("/start", 503, Duration::from_millis(1));
        collector.record_rejected();

        let json = serde_json::to_value(collector.snapshot()).unwrap();
        assert_eq!(json["total_requests"], 1);
        assert_eq!(json["status_codes"]["503"], 1);
        assert_eq!(json["jobs"]["rejected"], 1);
        assert!(json["latency_us"]["p99"].is_u64());
    }
}
