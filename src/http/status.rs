//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos que el servidor de despacho puede devolver:
//!
//! - **2xx**: la corrida se admitió, se detuvo o se consultó
//! - **4xx**: configuración inválida, id desconocido, método o body no aceptados
//! - **5xx**: pool saturado o falla interna

/// Códigos de estado HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK
    Ok = 200,

    /// 400 Bad Request - Body malformado, configuración inválida o id mal formado
    BadRequest = 400,

    /// 404 Not Found - Ruta inexistente o job desconocido
    NotFound = 404,

    /// 405 Method Not Allowed - La ruta existe pero no para ese método
    MethodNotAllowed = 405,

    /// 413 Payload Too Large - El request excede el límite de lectura
    PayloadTooLarge = 413,

    /// 500 Internal Server Error
    InternalServerError = 500,

    /// 503 Service Unavailable - Pool saturado
    ServiceUnavailable = 503,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Texto de razón (reason phrase) del RFC
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
