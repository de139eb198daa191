//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Parser HTTP/1.0 (acepta también HTTP/1.1 sin keep-alive).
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /start HTTP/1.0\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 312\r\n
//! \r\n
//! {"org": "...", ...}
//! ```
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.0`
//! 2. **Headers**: pares `Name: Value`, sin distinguir mayúsculas en el nombre
//! 3. **Línea vacía**
//! 4. **Body**: exactamente `Content-Length` bytes (o el resto del buffer)

use std::collections::HashMap;
use thiserror::Error;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
}

impl Method {
    fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
        }
    }
}

/// Request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path ya decodificado (ej: "/stop/5f0c...")
    path: String,

    query_params: HashMap<String, String>,

    /// Nombres en minúscula
    headers: HashMap<String, String>,

    version: String,
    body: Vec<u8>,
}

/// Errores de parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty request")]
    EmptyRequest,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Llegaron menos bytes de body que los anunciados
    #[error("Incomplete body: expected {expected} bytes, got {received}")]
    IncompleteBody { expected: usize, received: usize },
}

/// Posición del primer byte después de `\r\n\r\n`, si ya llegó
pub fn head_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
        .map(|pos| pos + HEAD_TERMINATOR.len())
}

impl Request {
    /// Parsea un request completo desde bytes
    ///
    /// ```
    /// use uabot_dispatch::http::Request;
    ///
    /// let raw = b"GET /info?verbose=1 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/info");
    /// assert_eq!(request.query_param("verbose"), Some("1"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let split = head_end(buffer).unwrap_or(buffer.len());
        let head = std::str::from_utf8(&buffer[..split])
            .map_err(|_| ParseError::InvalidRequestLine)?;

        if head.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = head.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::EmptyRequest)?;
        let (method, path, query_params, version) = parse_request_line(request_line)?;
        let headers = parse_headers(lines)?;

        let rest = &buffer[split..];
        let body = match headers.get("content-length") {
            Some(raw) => {
                let expected: usize = raw
                    .parse()
                    .map_err(|_| ParseError::InvalidContentLength(raw.clone()))?;
                if rest.len() < expected {
                    return Err(ParseError::IncompleteBody {
                        expected,
                        received: rest.len(),
                    });
                }
                rest[..expected].to_vec()
            }
            None => rest.to_vec(),
        };

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
            body,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Header por nombre, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// `Content-Length` anunciado en el head, si lo hay
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }
}

type RequestLine = (Method, String, HashMap<String, String>, String);

/// `METHOD /path?query VERSION`
fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::InvalidRequestLine);
    };

    let method = Method::parse(method)?;

    if *version != "HTTP/1.0" && *version != "HTTP/1.1" {
        return Err(ParseError::InvalidHttpVersion(version.to_string()));
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query_string(query)),
        None => (*target, HashMap::new()),
    };

    Ok((method, percent_decode(path), query, version.to_string()))
}

fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| match param.split_once('=') {
            Some((key, value)) => (
                percent_decode(&key.replace('+', " ")),
                percent_decode(&value.replace('+', " ")),
            ),
            None => (percent_decode(param), String::new()),
        })
        .collect()
}

fn parse_headers<'a>(
    lines: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, String>, ParseError> {
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(headers)
}

/// Decodifica secuencias `%XX`; las inválidas quedan tal cual
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
