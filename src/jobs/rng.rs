//! # Fuente de Aleatoriedad Compartida
//! src/jobs/rng.rs
//!
//! Un único generador para todo el proceso, protegido por un Mutex porque
//! varios slots sacan números de él al mismo tiempo.

use super::lock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::{Arc, Mutex};

/// Generador de números aleatorios seguro para uso concurrente
#[derive(Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    /// Crea un generador determinista (útil en tests)
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Crea un generador sembrado desde el sistema operativo
    pub fn from_entropy() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Entero uniforme en `range`; un rango vacío devuelve su inicio
    pub fn gen_range(&self, range: Range<usize>) -> usize {
        if range.is_empty() {
            return range.start;
        }
        lock(&self.inner).gen_range(range)
    }

    /// `true` con probabilidad `p` (acotada a [0, 1])
    pub fn gen_bool(&self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        lock(&self.inner).gen_bool(p)
    }

    /// Elige un elemento al azar
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.gen_range(0..items.len()))
    }
}
