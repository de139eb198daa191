//! # Señal de Cancelación
//! src/jobs/cancel.rs
//!
//! Señal de un solo disparo que el Scenario Runner consulta para saber
//! cuándo detenerse. Disparar la señal más de una vez es inofensivo:
//! solo la primera llamada cambia el estado y despierta a quien espera.

use super::lock;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Señal de cancelación cooperativa, clonable y compartida entre threads
#[derive(Clone, Default)]
pub struct CancelSignal {
    inner: Arc<SignalState>,
}

#[derive(Default)]
struct SignalState {
    fired: Mutex<bool>,
    condvar: Condvar,
}

impl CancelSignal {
    /// Crea una señal sin disparar
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispara la señal
    ///
    /// Retorna `true` solo para la llamada que efectivamente la disparó.
    pub fn fire(&self) -> bool {
        let mut fired = lock(&self.inner.fired);
        if *fired {
            return false;
        }
        *fired = true;
        self.inner.condvar.notify_all();
        true
    }

    /// Consulta sin bloquear si la señal ya fue disparada
    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.fired)
    }

    /// Espera hasta que la señal se dispare o pase `timeout`
    ///
    /// Retorna `true` si la señal está disparada al salir. Es el punto de
    /// chequeo natural para un runner que trabaja por ticks.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let fired = lock(&self.inner.fired);
        let (fired, _) = self
            .inner
            .condvar
            .wait_timeout_while(fired, timeout, |fired| !*fired)
            .unwrap_or_else(PoisonError::into_inner);
        *fired
    }

    /// Indica si dos handles apuntan a la misma señal
    pub fn same_signal(&self, other: &CancelSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_new_signal_is_not_cancelled() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn test_fire_is_idempotent() {
        let signal = CancelSignal::new();
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        clone.fire();

        assert!(signal.is_cancelled());
        assert!(signal.same_signal(&clone));
        assert!(!signal.same_signal(&CancelSignal::new()));
    }

    #[test]
    fn test_concurrent_fire_only_one_wins() {
        let signal = CancelSignal::new();
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let signal = signal.clone();
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if signal.fire() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_timeout_expires_without_fire() {
        let signal = CancelSignal::new();
        let start = Instant::now();

        assert!(!signal.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_timeout_wakes_on_fire() {
        let signal = CancelSignal::new();
        let firer = signal.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            firer.fire();
        });

        let start = Instant::now();
        assert!(signal.wait_timeout(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
