//! # Escenarios de Bots
//! src/scenario/mod.rs
//!
//! Frontera con el Scenario Runner: lo único que el pool sabe de una
//! corrida es que recibe (configuración, señal de cancelación, rng) y
//! termina, ya sea por completar su trabajo o por observar la señal.
//!
//! - `config`: parámetros de la corrida y su validación
//! - `simulated`: runner por defecto que simula visitas sin red

pub mod config;
pub mod simulated;

pub use config::BotConfig;
pub use simulated::SimulatedVisitRunner;

use crate::jobs::{CancelSignal, SharedRng};
use serde::Serialize;
use thiserror::Error;

/// Contadores que un runner reporta al terminar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Visitas simuladas
    pub visits: u64,
    /// Visitas que terminaron en un click
    pub clicks: u64,
}

/// Fallas propias del trabajo de un runner
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario has no vocabulary to build queries from")]
    EmptyVocabulary,

    #[error("scenario aborted: {0}")]
    Aborted(String),
}

/// Punto de entrada de una corrida
///
/// La cancelación es cooperativa: la implementación debe consultar
/// `cancel` en cada punto de chequeo y retornar pronto cuando se dispare.
pub trait ScenarioRunner: Send + Sync + 'static {
    fn run(
        &self,
        config: &BotConfig,
        cancel: &CancelSignal,
        rng: &SharedRng,
    ) -> Result<RunStats, ScenarioError>;
}
