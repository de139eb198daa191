//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Respuestas HTTP/1.0 armadas en memoria y serializadas a bytes para
//! escribirlas en el socket. Todos los bodies del servidor son JSON.
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Length: 52\r\n
//! Content-Type: application/json\r\n
//! \r\n
//! {"workerID":"5f0c..."}
//! ```

use super::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Headers ordenados por nombre para que la salida sea estable
    headers: BTreeMap<String, String>,

    body: Vec<u8>,
}

impl Response {
    /// Respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header; si ya existe se sobrescribe
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body y su `Content-Length`
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.headers
            .insert("Content-Length".to_string(), body.len().to_string());
        self.body = body;
        self
    }

    /// Respuesta JSON con el status dado
    ///
    /// Si el valor no se puede serializar se responde 500.
    pub fn json_with_status<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body_bytes(body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                Self::error(StatusCode::InternalServerError, "Failed to serialize response")
            }
        }
    }

    /// Respuesta JSON exitosa (200 OK)
    pub fn json<T: Serialize>(value: &T) -> Self {
        Self::json_with_status(StatusCode::Ok, value)
    }

    /// Respuesta de error: `{"error": "mensaje"}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body_bytes(body.into_bytes())
    }

    /// Serializa status line, headers y body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);
        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
