//! # Estructura de Job
//! src/jobs/job.rs
//!
//! Handle inmutable de una corrida admitida: configuración validada,
//! id único, señal de cancelación y la fuente de aleatoriedad compartida.

use super::cancel::CancelSignal;
use super::rng::SharedRng;
use crate::scenario::BotConfig;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// Una corrida de bot admitida en el pool
pub struct Job {
    id: Uuid,
    config: BotConfig,
    cancel: CancelSignal,
    rng: SharedRng,
    submitted_at: SystemTime,
}

impl Job {
    /// Crea un job; la configuración ya debe venir validada
    pub fn new(id: Uuid, config: BotConfig, cancel: CancelSignal, rng: SharedRng) -> Self {
        Self {
            id,
            config,
            cancel,
            rng,
            submitted_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn cancel(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn rng(&self) -> &SharedRng {
        &self.rng
    }

    pub fn submitted_at(&self) -> SystemTime {
        self.submitted_at
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("org", &self.config.org)
            .field("cancel", &self.cancel)
            .finish()
    }
}
