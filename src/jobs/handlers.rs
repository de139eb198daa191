//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! Endpoints del despachador:
//! - `POST /start` - body JSON con la configuración del bot
//! - `GET|POST /stop/{id}` - cancela una corrida
//! - `GET /info` - estado del pool
//! - `GET /metrics` - métricas del servidor y de los jobs
//!
//! ## Errores
//!
//! | Error            | Status |
//! |------------------|--------|
//! | `InvalidConfig`  | 400    |
//! | id mal formado   | 400    |
//! | `UnknownJob`     | 404    |
//! | `PoolSaturated`  | 503 + `Retry-After` |
//! | `DuplicateId`    | 500    |

use super::dispatcher::Dispatcher;
use super::types::JobSummary;
use crate::error::DispatchError;
use crate::http::{Method, Request, Response, StatusCode};
use crate::router::{RouteParams, Router};
use crate::scenario::BotConfig;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Estado compartido que reciben los handlers
pub type AppState = Arc<Dispatcher>;

#[derive(Serialize)]
struct StartedBody {
    #[serde(rename = "workerID")]
    worker_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoBody {
    status: &'static str,
    bot_worker_infos: Vec<JobSummary>,
    recent_outcomes: Vec<JobSummary>,
    active_routines: String,
    queued_work: String,
}

/// Rutas del servidor de despacho
pub fn routes() -> Router<AppState> {
    let mut router = Router::new();
    router.register(&[Method::POST], "/start", start_handler);
    router.register(&[Method::GET, Method::POST], "/stop/{id}", stop_handler);
    router.register(&[Method::GET], "/info", info_handler);
    router.register(&[Method::GET], "/metrics", metrics_handler);
    router
}

/// Handler para `POST /start`
///
/// ```json
/// {"workerID": "5f0c2a7e-..."}
/// ```
pub fn start_handler(req: &Request, _params: &RouteParams, dispatcher: &AppState) -> Response {
    let submitted = BotConfig::from_json(req.body()).and_then(|config| dispatcher.submit(config));

    match submitted {
        Ok(id) => Response::json(&StartedBody { worker_id: id }),
        Err(e) => error_response(&e, dispatcher),
    }
}

/// Handler para `/stop/{id}`
pub fn stop_handler(_req: &Request, params: &RouteParams, dispatcher: &AppState) -> Response {
    let raw = params.get("id").unwrap_or_default();
    let id = match Uuid::parse_str(raw) {
        Ok(id) => id,
        Err(_) => {
            return Response::error(
                StatusCode::BadRequest,
                &format!("Invalid worker id: {}", raw),
            );
        }
    };

    match dispatcher.request_stop(id) {
        Ok(()) => Response::json(&serde_json::json!({ "workerID": id, "status": "stopping" })),
        Err(e) => error_response(&e, dispatcher),
    }
}

/// Handler para `GET /info`
pub fn info_handler(_req: &Request, _params: &RouteParams, dispatcher: &AppState) -> Response {
    let snapshot = dispatcher.snapshot();

    Response::json(&InfoBody {
        status: "UP",
        active_routines: format!("{}/{}", snapshot.active_count, snapshot.concurrency_limit),
        queued_work: format!("{}/{}", snapshot.queued_count, snapshot.queue_capacity),
        bot_worker_infos: snapshot.jobs,
        recent_outcomes: snapshot.recent,
    })
}

/// Handler para `GET /metrics`
pub fn metrics_handler(_req: &Request, _params: &RouteParams, dispatcher: &AppState) -> Response {
    let snapshot = dispatcher.snapshot();
    Response::json(&serde_json::json!({
        "server": dispatcher.metrics().snapshot(),
        "pool": {
            "active": snapshot.active_count,
            "queued": snapshot.queued_count,
            "concurrency_limit": snapshot.concurrency_limit,
            "queue_capacity": snapshot.queue_capacity,
        },
    }))
}

fn error_response(error: &DispatchError, dispatcher: &Dispatcher) -> Response {
    tracing::debug!(kind = error.kind(), error = %error, "Request rejected");

    let status = match error {
        DispatchError::InvalidConfig(_) => StatusCode::BadRequest,
        DispatchError::UnknownJob(_) => StatusCode::NotFound,
        DispatchError::PoolSaturated { .. } => StatusCode::ServiceUnavailable,
        DispatchError::DuplicateId(_) | DispatchError::RunnerFailure { .. } | DispatchError::Io(_) => {
            tracing::error!(error = %error, "Internal error while handling request");
            StatusCode::InternalServerError
        }
    };

    let response = Response::error(status, &error.to_string());
    if error.is_retryable() {
        let retry_after = dispatcher.settings().retry_after.as_secs().max(1);
        return response.with_header("Retry-After", &retry_after.to_string());
    }
    response
}
