//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Acepta conexiones y atiende cada una en su propio thread: lee un
//! request completo (head + `Content-Length` bytes de body), lo pasa por el
//! router y escribe la respuesta. Una conexión, un request.

use crate::http::{head_end, Request, Response, StatusCode};
use crate::jobs::handlers::{self, AppState};
use crate::router::Router;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Tamaño máximo de un request (head + body)
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Patrón registrado en métricas para requests que no llegan al router
const UNPARSED_ROUTE: &str = "<unparsed>";

/// Servidor HTTP/1.0 concurrente
pub struct Server {
    listener: TcpListener,
    router: Arc<Router<AppState>>,
    state: AppState,
}

enum ReadOutcome {
    Complete(Vec<u8>),
    Closed,
    TooLarge,
}

impl Server {
    /// Hace bind y registra las rutas del despachador
    pub fn bind(address: impl ToSocketAddrs, state: AppState) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        Ok(Self {
            listener,
            router: Arc::new(handlers::routes()),
            state,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Acepta conexiones hasta que el listener falle
    pub fn run(&self) -> io::Result<()> {
        tracing::info!(address = %self.local_addr()?, "Server listening (one thread per connection)");

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let router = Arc::clone(&self.router);
            let state = Arc::clone(&self.state);
            let metrics = state.metrics().clone();
            metrics.connection_opened();

            let spawned = thread::Builder::new()
                .name("http-conn".to_string())
                .spawn(move || {
                    if let Err(e) = handle_connection(stream, &router, &state) {
                        tracing::warn!(error = %e, "Connection error");
                    }
                    state.metrics().connection_closed();
                });

            if let Err(e) = spawned {
                tracing::error!(error = %e, "Failed to spawn connection thread");
                metrics.connection_closed();
            }
        }

        Ok(())
    }
}

/// Atiende un único request sobre `stream`
pub fn handle_connection(
    mut stream: TcpStream,
    router: &Router<AppState>,
    state: &AppState,
) -> io::Result<()> {
    let start = Instant::now();
    let request_id = Uuid::new_v4().simple().to_string();
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let (mut response, route) = match read_request(&mut stream)? {
        ReadOutcome::Closed => {
            tracing::debug!(%peer, "Connection closed before sending a request");
            return Ok(());
        }
        ReadOutcome::TooLarge => (
            Response::error(StatusCode::PayloadTooLarge, "Request exceeds the size limit"),
            UNPARSED_ROUTE.to_string(),
        ),
        ReadOutcome::Complete(buffer) => match Request::parse(&buffer) {
            Ok(request) => {
                tracing::debug!(
                    %peer,
                    request_id = %request_id,
                    method = request.method().as_str(),
                    path = request.path(),
                    "Request received"
                );
                let (response, route) = router.route(&request, state);
                (response, route.to_string())
            }
            Err(e) => {
                tracing::debug!(%peer, error = %e, "Malformed request");
                (
                    Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e)),
                    UNPARSED_ROUTE.to_string(),
                )
            }
        },
    };

    response.add_header("X-Request-Id", &request_id);
    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    let latency = start.elapsed();
    state
        .metrics()
        .record_request(&route, response.status().as_u16(), latency);
    tracing::info!(
        request_id = %request_id,
        route = %route,
        status = response.status().as_u16(),
        latency_ms = latency.as_secs_f64() * 1000.0,
        "Request served"
    );

    Ok(())
}

/// Lee el head completo y luego el body anunciado en `Content-Length`
fn read_request(stream: &mut TcpStream) -> io::Result<ReadOutcome> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    let mut expected_total: Option<usize> = None;

    loop {
        if let Some(total) = expected_total {
            if buffer.len() >= total {
                return Ok(ReadOutcome::Complete(buffer));
            }
        }

        let read = stream.read(&mut chunk)?;
        if read == 0 {
            return Ok(if buffer.is_empty() {
                ReadOutcome::Closed
            } else {
                ReadOutcome::Complete(buffer)
            });
        }
        buffer.extend_from_slice(&chunk[..read]);

        if buffer.len() > MAX_REQUEST_BYTES {
            return Ok(ReadOutcome::TooLarge);
        }

        if expected_total.is_none() {
            if let Some(end) = head_end(&buffer) {
                let body_len = declared_content_length(&buffer[..end]).unwrap_or(0);
                let total = end.saturating_add(body_len);
                if total > MAX_REQUEST_BYTES {
                    return Ok(ReadOutcome::TooLarge);
                }
                expected_total = Some(total);
            }
        }
    }
}

/// `Content-Length` del head crudo; el parser valida el valor después
fn declared_content_length(head: &[u8]) -> Option<usize> {
    let head = std::str::from_utf8(head).ok()?;
    head.split("\r\n").find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}
