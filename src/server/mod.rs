//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP que escucha en un puerto, atiende cada conexión en su
//! propio thread y despacha los requests al router de jobs.

pub mod tcp;

pub use tcp::Server;
