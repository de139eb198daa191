//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Métricas del servidor expuestas en `/metrics`:
//! - Contadores de requests por ruta y por código de estado
//! - Latencias (p50, p95, p99)
//! - Conexiones abiertas
//! - Destino de los jobs (completados, cancelados, fallidos, rechazados)

pub mod collector;

pub use collector::{JobCounters, MetricsCollector, MetricsSnapshot};
