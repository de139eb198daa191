//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Protocolo HTTP/1.0 implementado a mano: parsing de requests con body,
//! respuestas JSON y códigos de estado. Una conexión por request, sin
//! keep-alive ni chunked encoding.

pub mod request;
pub mod response;
pub mod status;

pub use request::{head_end, Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
