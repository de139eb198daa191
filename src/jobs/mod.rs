//! # Sistema de Jobs
//! src/jobs/mod.rs
//!
//! Despacho de corridas de bot: un pool acotado de slots, una cola FIFO,
//! señales de cancelación por job y un timer que cancela al vencer el TTL.
//!
//! ## Endpoints
//!
//! - `POST /start` - Valida la configuración y admite una corrida
//! - `GET|POST /stop/{id}` - Cancela una corrida
//! - `GET /info` - Estado del pool

pub mod cancel;
pub mod dispatcher;
pub mod handlers;
pub mod job;
pub mod pool;
pub mod registry;
pub mod rng;
pub mod timer;
pub mod types;

pub use cancel::CancelSignal;
pub use dispatcher::{Dispatcher, DispatcherSettings};
pub use job::Job;
pub use pool::{CompletionHook, Saturated, WorkPool};
pub use registry::CancellationRegistry;
pub use rng::SharedRng;
pub use timer::ExpiryTimer;
pub use types::{JobState, JobSummary, PoolSnapshot};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Toma el lock aunque otro thread haya entrado en pánico con él tomado
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
