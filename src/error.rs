//! # Errores del Despachador
//! src/error.rs
//!
//! Taxonomía de errores visibles para quien llama al despachador.
//! Cada variante corresponde a una condición distinta que el cliente HTTP
//! debe poder diferenciar: "reintenta más tarde", "job desconocido",
//! "el trabajo del propio job falló".

use thiserror::Error;
use uuid::Uuid;

/// Errores del sistema de despacho de bots
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Cola llena y todos los slots ocupados
    #[error("Work pool is saturated (queue capacity: {queue_capacity})")]
    PoolSaturated { queue_capacity: usize },

    /// No existe una entrada viva en el registro para ese id
    #[error("Unknown job: {0}")]
    UnknownJob(Uuid),

    /// Colisión en el registro de cancelación
    #[error("Duplicate job id: {0}")]
    DuplicateId(Uuid),

    /// El Scenario Runner terminó de forma anormal
    #[error("Runner failure for job {id}: {message}")]
    RunnerFailure { id: Uuid, message: String },

    /// La configuración del bot no pasó la validación
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No se pudieron levantar los threads del pool o del timer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Indica si el cliente puede reintentar la misma petición más tarde
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::PoolSaturated { .. })
    }

    /// Etiqueta corta para logs
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::PoolSaturated { .. } => "saturated",
            DispatchError::UnknownJob(_) => "unknown_job",
            DispatchError::DuplicateId(_) => "duplicate_id",
            DispatchError::RunnerFailure { .. } => "runner_failure",
            DispatchError::InvalidConfig(_) => "invalid_config",
            DispatchError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
