//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor de despacho con soporte para argumentos CLI
//! y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./uabot_dispatch --port 8080 \
//!   --queue-length 100 \
//!   --routines-per-cpu 2 \
//!   --silent
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 QUEUE_LENGTH=50 ./uabot_dispatch
//! ```

use clap::Parser;
use std::time::Duration;

pub const MINIMUM_QUEUE_LENGTH: usize = 1;
pub const MAXIMUM_QUEUE_LENGTH: usize = 500;
pub const DEFAULT_QUEUE_LENGTH: usize = 100;

pub const MINIMUM_ROUTINES_PER_CPU: usize = 1;
pub const MAXIMUM_ROUTINES_PER_CPU: usize = 5;
pub const DEFAULT_ROUTINES_PER_CPU: usize = 2;

/// Configuración del servidor de despacho de bots
#[derive(Debug, Clone, Parser)]
#[command(name = "uabot_dispatch")]
#[command(about = "Servidor HTTP que despacha corridas de bots sobre un pool acotado")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    // === Pool ===

    /// Capacidad de la cola de espera, en [1, 500]
    #[arg(long = "queue-length", default_value = "100", env = "QUEUE_LENGTH")]
    pub queue_length: usize,

    /// Corridas simultáneas por CPU, en [1, 5]
    #[arg(long = "routines-per-cpu", default_value = "2", env = "ROUTINES_PER_CPU")]
    pub routines_per_cpu: usize,

    // === Corridas ===

    /// Duración de una unidad de time-to-live, en milisegundos
    #[arg(long = "ttl-unit-ms", default_value = "60000", env = "TTL_UNIT_MS")]
    pub ttl_unit_ms: u64,

    /// Intervalo entre visitas simuladas, en milisegundos
    #[arg(long = "tick-ms", default_value = "1000", env = "TICK_MS")]
    pub tick_ms: u64,

    /// Semilla del generador aleatorio compartido (por defecto, entropía del sistema)
    #[arg(long, env = "BOT_SEED")]
    pub seed: Option<u64>,

    /// Segundos sugeridos en `Retry-After` cuando el pool está saturado
    #[arg(long = "retry-after-secs", default_value = "5", env = "RETRY_AFTER_SECS")]
    pub retry_after_secs: u64,

    // === Logging ===

    /// Solo registra warnings y errores
    #[arg(long, env = "SILENT")]
    pub silent: bool,

    /// Emite los logs como JSON
    #[arg(long = "log-json", env = "LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// Parsea argumentos CLI y variables de entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reemplaza por su valor por defecto los parámetros fuera de rango
    pub fn normalized(mut self) -> Self {
        if !(MINIMUM_QUEUE_LENGTH..=MAXIMUM_QUEUE_LENGTH).contains(&self.queue_length) {
            tracing::warn!(
                queue_length = self.queue_length,
                min = MINIMUM_QUEUE_LENGTH,
                max = MAXIMUM_QUEUE_LENGTH,
                default = DEFAULT_QUEUE_LENGTH,
                "Queue length is out of bounds, using default"
            );
            self.queue_length = DEFAULT_QUEUE_LENGTH;
        }

        if !(MINIMUM_ROUTINES_PER_CPU..=MAXIMUM_ROUTINES_PER_CPU).contains(&self.routines_per_cpu) {
            tracing::warn!(
                routines_per_cpu = self.routines_per_cpu,
                min = MINIMUM_ROUTINES_PER_CPU,
                max = MAXIMUM_ROUTINES_PER_CPU,
                default = DEFAULT_ROUTINES_PER_CPU,
                "Routines per CPU is out of bounds, using default"
            );
            self.routines_per_cpu = DEFAULT_ROUTINES_PER_CPU;
        }

        self
    }

    /// Valida lo que no se puede corregir con un valor por defecto
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_unit_ms == 0 {
            return Err("TTL unit must be > 0".to_string());
        }
        if self.tick_ms == 0 {
            return Err("Tick must be > 0".to_string());
        }
        Ok(())
    }

    /// Corridas simultáneas: routines per CPU × CPUs disponibles
    pub fn concurrency_limit(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.routines_per_cpu.max(1) * cpus
    }

    pub fn ttl_unit(&self) -> Duration {
        Duration::from_millis(self.ttl_unit_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Registra la configuración efectiva
    pub fn log_summary(&self) {
        tracing::info!(address = %self.address(), "Server address");
        tracing::info!(queue_length = self.queue_length, "Queue length");
        tracing::info!(routines_per_cpu = self.routines_per_cpu, "Routines per CPU");
        tracing::info!(workers = self.concurrency_limit(), "Number of workers");
        tracing::info!(
            ttl_unit_ms = self.ttl_unit_ms,
            tick_ms = self.tick_ms,
            seeded = self.seed.is_some(),
            "Run settings"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            queue_length: DEFAULT_QUEUE_LENGTH,
            routines_per_cpu: DEFAULT_ROUTINES_PER_CPU,
            ttl_unit_ms: 60_000,
            tick_ms: 1_000,
            seed: None,
            retry_after_secs: 5,
            silent: false,
            log_json: false,
        }
    }
}
