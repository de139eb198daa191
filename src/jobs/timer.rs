//! # Expiry Timer
//! src/jobs/timer.rs
//!
//! Cancela cada job cuando vence su time-to-live. Un único thread duerme
//! hasta el vencimiento más próximo de un min-heap de deadlines; armar un
//! timer nunca bloquea al que envía el job.
//!
//! Desarmar solo borra el deadline del mapa: la entrada que queda en el
//! heap se descarta cuando llega a la cima. Si el timer vence después de
//! que el job terminó, `cancel` encuentra el registro vacío y eso no es un
//! error.

use super::lock;
use super::registry::CancellationRegistry;
use crate::error::DispatchError;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Entradas obsoletas toleradas en el heap antes de compactarlo
const STALE_SLACK: usize = 64;

/// Servicio de vencimientos por job
pub struct ExpiryTimer {
    shared: Arc<TimerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct TimerShared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
    registry: Arc<CancellationRegistry>,
}

#[derive(Default)]
struct TimerState {
    heap: BinaryHeap<Reverse<(Instant, Uuid)>>,
    deadlines: HashMap<Uuid, Instant>,
    shutdown: bool,
}

impl ExpiryTimer {
    /// Levanta el thread del timer
    pub fn start(registry: Arc<CancellationRegistry>) -> std::io::Result<Self> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState::default()),
            wakeup: Condvar::new(),
            registry,
        });

        let handle = thread::Builder::new()
            .name("expiry-timer".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || timer_loop(&shared)
            })?;

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Programa la cancelación de `id` dentro de `ttl`
    ///
    /// Volver a armar un id reemplaza su deadline anterior.
    /// Un `ttl` que no entra en un `Instant` deja el job sin vencimiento.
    pub fn arm(&self, id: Uuid, ttl: Duration) {
        let Some(deadline) = Instant::now().checked_add(ttl) else {
            tracing::warn!(job_id = %id, ttl_secs = ttl.as_secs(), "TTL out of range, job will not expire");
            self.disarm(id);
            return;
        };
        let mut state = lock(&self.shared.state);
        if state.shutdown {
            return;
        }
        state.deadlines.insert(id, deadline);
        state.heap.push(Reverse((deadline, id)));

        if state.heap.len() > state.deadlines.len() * 2 + STALE_SLACK {
            compact(&mut state);
        }

        self.shared.wakeup.notify_one();
    }

    /// Desarma el timer de `id`; retorna `false` si no estaba armado
    pub fn disarm(&self, id: Uuid) -> bool {
        lock(&self.shared.state).deadlines.remove(&id).is_some()
    }

    /// Cantidad de timers armados
    pub fn armed(&self) -> usize {
        lock(&self.shared.state).deadlines.len()
    }

    /// Detiene el thread; los timers pendientes no se disparan
    pub fn shutdown(&self) {
        {
            let mut state = lock(&self.shared.state);
            state.shutdown = true;
            state.deadlines.clear();
            state.heap.clear();
        }
        self.shared.wakeup.notify_all();

        if let Some(handle) = lock(&self.handle).take() {
            if handle.join().is_err() {
                tracing::error!("Expiry timer thread panicked");
            }
        }
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn timer_loop(shared: &TimerShared) {
    let mut state = lock(&shared.state);

    loop {
        if state.shutdown {
            return;
        }

        let next = state.heap.peek().map(|Reverse((deadline, id))| (*deadline, *id));
        match next {
            None => {
                state = wait(&shared.wakeup, state);
            }
            Some((deadline, id)) => {
                let now = Instant::now();
                if deadline > now {
                    state = shared
                        .wakeup
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                    continue;
                }

                state.heap.pop();
                // Entrada obsoleta: desarmada o re-armada con otro deadline
                if state.deadlines.get(&id) != Some(&deadline) {
                    continue;
                }
                state.deadlines.remove(&id);

                drop(state);
                expire(&shared.registry, id);
                state = lock(&shared.state);
            }
        }
    }
}

fn expire(registry: &CancellationRegistry, id: Uuid) {
    match registry.cancel(id) {
        Ok(()) => tracing::info!(job_id = %id, "Timer timed out, job cancelled"),
        Err(DispatchError::UnknownJob(_)) => {
            tracing::debug!(job_id = %id, "Timer fired for a job that already left the registry")
        }
        Err(e) => tracing::warn!(job_id = %id, error = %e, "Timer failed to cancel job"),
    }
}

fn compact(state: &mut TimerState) {
    state.heap = state
        .deadlines
        .iter()
        .map(|(id, deadline)| Reverse((*deadline, *id)))
        .collect();
}

fn wait<'a>(condvar: &Condvar, guard: MutexGuard<'a, TimerState>) -> MutexGuard<'a, TimerState> {
    condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
}
