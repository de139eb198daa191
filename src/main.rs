//! # uabot dispatch - Entry Point
//! src/main.rs
//!
//! Lee la configuración, inicializa el logging, levanta el despachador y
//! atiende conexiones hasta que el proceso termine.

use std::process;
use std::sync::Arc;
use uabot_dispatch::config::Config;
use uabot_dispatch::jobs::{Dispatcher, DispatcherSettings, SharedRng};
use uabot_dispatch::logging;
use uabot_dispatch::scenario::SimulatedVisitRunner;
use uabot_dispatch::server::Server;

fn main() {
    let config = Config::new();
    logging::init_tracing(config.silent, config.log_json);

    let config = config.normalized();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        process::exit(2);
    }
    config.log_summary();

    let rng = match config.seed {
        Some(seed) => SharedRng::from_seed(seed),
        None => SharedRng::from_entropy(),
    };
    let runner = Arc::new(SimulatedVisitRunner::new(config.tick()));

    let dispatcher = match Dispatcher::new(DispatcherSettings::from_config(&config), runner, rng) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start dispatcher");
            process::exit(1);
        }
    };

    let server = match Server::bind(config.address(), Arc::clone(&dispatcher)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(address = %config.address(), error = %e, "Failed to bind");
            process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!(error = %e, "Server stopped");
        dispatcher.shutdown();
        process::exit(1);
    }
}
