//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a handlers.
//!
//! ```text
//! Request → Router → Handler(&Request, &RouteParams, &S) → Response
//! ```
//!
//! Los patrones pueden tener segmentos variables: `/stop/{id}` captura el
//! segundo segmento como `id`. Un path que existe con otro método da 405;
//! uno que no coincide con ningún patrón da 404.

use crate::http::{Method, Request, Response, StatusCode};
use std::collections::HashMap;

/// Patrón usado para métricas cuando ninguna ruta coincide
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Un handler recibe el request, los parámetros del path y el estado compartido
pub type Handler<S> = fn(&Request, &RouteParams, &S) -> Response;

/// Segmentos variables capturados de un path
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouteParams {
    values: HashMap<String, String>,
}

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route<S> {
    methods: Vec<Method>,
    pattern: String,
    segments: Vec<Segment>,
    handler: Handler<S>,
}

/// Router genérico sobre el estado que reciben los handlers
pub struct Router<S> {
    routes: Vec<Route<S>>,
}

impl<S> Router<S> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra un patrón para uno o más métodos
    pub fn register(&mut self, methods: &[Method], pattern: &str, handler: Handler<S>) {
        self.routes.push(Route {
            methods: methods.to_vec(),
            pattern: pattern.to_string(),
            segments: parse_pattern(pattern),
            handler,
        });
    }

    /// Ejecuta el handler que corresponde al request
    ///
    /// Retorna también el patrón que resolvió, para las métricas.
    pub fn route(&self, request: &Request, state: &S) -> (Response, &str) {
        let path = request.path();
        let mut path_matched = None;

        for route in &self.routes {
            let Some(params) = match_segments(&route.segments, path) else {
                continue;
            };

            if route.methods.contains(&request.method())
                || (request.method() == Method::HEAD && route.methods.contains(&Method::GET))
            {
                let mut response = (route.handler)(request, &params, state);
                add_common_headers(&mut response);
                return (response, route.pattern.as_str());
            }

            path_matched.get_or_insert(route);
        }

        let mut response = match path_matched {
            Some(route) => {
                let allowed: Vec<&str> = route.methods.iter().map(Method::as_str).collect();
                Response::error(
                    StatusCode::MethodNotAllowed,
                    &format!("Method {} not allowed on {}", request.method().as_str(), path),
                )
                .with_header("Allow", &allowed.join(", "))
            }
            None => Response::error(StatusCode::NotFound, &format!("Route not found: {}", path)),
        };
        add_common_headers(&mut response);

        let pattern = path_matched.map_or(UNMATCHED_ROUTE, |route| route.pattern.as_str());
        (response, pattern)
    }
}

impl<S> Default for Router<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Headers comunes a todas las respuestas
fn add_common_headers(response: &mut Response) {
    response.add_header("Server", "uabot-dispatch/0.1");
    response.add_header("Connection", "close");
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(segment.to_string()),
        })
        .collect()
}

fn match_segments(segments: &[Segment], path: &str) -> Option<RouteParams> {
    let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    if parts.len() != segments.len() {
        return None;
    }

    let mut params = RouteParams::default();
    for (segment, part) in segments.iter().zip(parts) {
        match segment {
            Segment::Literal(literal) if literal == part => {}
            Segment::Literal(_) => return None,
            Segment::Param(name) => {
                params.values.insert(name.clone(), part.to_string());
            }
        }
    }
    Some(params)
}
