//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Estados de un job dentro del pool y las vistas de solo lectura que
//! se exponen en `/info`.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Estado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Esperando un slot libre en la cola
    Queued,

    /// Ocupando un slot
    Running,

    /// El runner retornó sin que se disparara la señal
    Completed,

    /// El runner retornó después de que se disparara la señal
    Cancelled,

    /// El runner falló o entró en pánico
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
            JobState::Failed => "failed",
        }
    }

    /// Verifica si el job ya salió del pool
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }
}

/// Resumen de un job para diagnóstico
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub state: JobState,

    /// Timestamp (segundos UNIX) de la última transición de estado
    pub since: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobSummary {
    pub fn new(id: Uuid, state: JobState, since: u64) -> Self {
        Self {
            id,
            state,
            since,
            visits: None,
            error: None,
        }
    }
}

/// Foto del pool en un instante dado
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub active_count: usize,
    pub queued_count: usize,
    pub concurrency_limit: usize,
    pub queue_capacity: usize,

    /// Jobs activos primero, luego los encolados en orden de llegada
    pub jobs: Vec<JobSummary>,

    /// Últimos jobs que salieron del pool, del más reciente al más viejo
    pub recent: Vec<JobSummary>,
}

/// Segundos desde UNIX epoch
pub fn unix_now() -> u64 {
    unix_secs(SystemTime::now())
}

pub fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_serialization() {
        let json = serde_json::to_string(&JobState::Running).unwrap();
        assert_eq!(json, "\"running\"");
        assert_eq!(JobState::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn test_summary_skips_empty_fields() {
        let summary = JobSummary::new(Uuid::nil(), JobState::Queued, 10);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["state"], "queued");
        assert_eq!(json["since"], 10);
        assert!(json.get("visits").is_none());
        assert!(json.get("error").is_none());
    }
}
