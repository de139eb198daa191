//! # Registro de Cancelación
//! src/jobs/registry.rs
//!
//! Mapa job id → señal de cancelación. Tres actores pueden querer cancelar
//! un mismo job (el Expiry Timer, un stop explícito y el apagado del pool);
//! como la entrada se quita del mapa antes de disparar la señal, dentro de
//! la misma sección crítica, solo uno de ellos llega a dispararla.

use super::cancel::CancelSignal;
use super::lock;
use crate::error::{DispatchError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Registro thread-safe de señales de cancelación
#[derive(Default)]
pub struct CancellationRegistry {
    signals: Mutex<HashMap<Uuid, CancelSignal>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra la señal de un job recién creado
    pub fn register(&self, id: Uuid, signal: CancelSignal) -> Result<()> {
        let mut signals = lock(&self.signals);
        if signals.contains_key(&id) {
            return Err(DispatchError::DuplicateId(id));
        }
        signals.insert(id, signal);
        Ok(())
    }

    /// Quita la entrada y dispara su señal
    ///
    /// Una segunda llamada con el mismo id retorna `UnknownJob`.
    pub fn cancel(&self, id: Uuid) -> Result<()> {
        let mut signals = lock(&self.signals);
        let signal = signals.remove(&id).ok_or(DispatchError::UnknownJob(id))?;
        signal.fire();
        Ok(())
    }

    /// Quita la entrada sin disparar la señal (el job terminó solo)
    ///
    /// Retorna `false` si otro actor ya la había quitado.
    pub fn remove(&self, id: Uuid) -> bool {
        lock(&self.signals).remove(&id).is_some()
    }

    /// Cancela todo lo registrado; retorna cuántas señales disparó
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<CancelSignal> = lock(&self.signals).drain().map(|(_, s)| s).collect();
        drained.iter().filter(|signal| signal.fire()).count()
    }

    pub fn len(&self) -> usize {
        lock(&self.signals).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
impl CancellationRegistry {
    pub(crate) fn contains(&self, id: Uuid) -> bool {
        lock(&self.signals).contains_key(&id)
    }
}
