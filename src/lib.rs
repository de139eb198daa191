//! # uabot dispatch
//! src/lib.rs
//!
//! Servidor HTTP que admite corridas de bots de simulación, las ejecuta
//! sobre un pool acotado de slots y las cancela por pedido explícito o al
//! vencer su time-to-live.
//!
//! ## Arquitectura
//!
//! - `http`: parsing y construcción de mensajes HTTP/1.0
//! - `router`: rutas con parámetros de path
//! - `server`: servidor TCP, un thread por conexión
//! - `jobs`: pool de workers, registro de cancelación, Expiry Timer y despachador
//! - `scenario`: configuración de un bot y el runner que la ejecuta
//! - `metrics`: métricas de requests y de jobs
//! - `config`: argumentos CLI y variables de entorno
//! - `logging`: inicialización de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use uabot_dispatch::jobs::{Dispatcher, DispatcherSettings, SharedRng};
//! use uabot_dispatch::scenario::SimulatedVisitRunner;
//! use uabot_dispatch::server::Server;
//!
//! let runner = Arc::new(SimulatedVisitRunner::new(Duration::from_secs(1)));
//! let dispatcher = Dispatcher::new(DispatcherSettings::default(), runner, SharedRng::from_entropy())
//!     .expect("dispatcher");
//! let server = Server::bind("127.0.0.1:8080", Arc::new(dispatcher)).expect("bind");
//! server.run().expect("server");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod router;
pub mod scenario;
pub mod server;

pub use error::{DispatchError, Result};
