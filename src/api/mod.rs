// Admin API module entry
// Health probes and read-only views of the routing tables

mod handlers;
mod response;
mod types;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;

pub use response::{bad_request, error_response, json_response, not_found};

/// Paths served by the admin listener
pub const ENDPOINTS: [&str; 5] = ["/healthz", "/readyz", "/v1/domains", "/v1/route", "/v1/config"];

/// API route handler
///
/// Dispatches to handler functions based on request path and method.
/// Request bodies are never read.
pub async fn handle_api_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();

    let response = match (req.method(), path) {
        (&Method::GET | &Method::HEAD, "/healthz" | "/readyz") => handlers::handle_health(),
        (&Method::GET, "/v1/domains") => handlers::handle_domains(&state),
        (&Method::GET, "/v1/route") => handlers::handle_route(&state, req.uri().query()),
        (&Method::GET, "/v1/config") => handlers::handle_config(&state),
        _ => not_found(),
    };

    tracing::debug!(
        method = %req.method(),
        path,
        status = response.status().as_u16(),
        "admin API request"
    );
    Ok(response)
}
