//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing` una sola vez por proceso. `RUST_LOG` tiene
//! prioridad; si no está definida se usa `info`, o `warn` en modo silencioso.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filtro por defecto cuando `RUST_LOG` no está definida
pub fn default_directive(silent: bool) -> &'static str {
    if silent {
        "warn"
    } else {
        "info"
    }
}

/// Instala el subscriber global
///
/// Retorna `false` si ya había uno instalado (por ejemplo, en tests).
pub fn init_tracing(silent: bool, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(silent)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry.with(fmt::layer().json().with_thread_names(true)).try_init()
    } else {
        registry.with(fmt::layer().with_thread_names(true)).try_init()
    };
    installed.is_ok()
}
