//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: host rewriting, method and body
//! size validation, route table dispatch and access logging.

use crate::config::AppState;
use crate::handler::proxy::{BoxError, Forwarded};
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{rewrite_uri, Route, RouteDecision, RouteTarget};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, Uri, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// What the static file handlers need to know about a request
pub struct RequestContext<'a> {
    /// Internal (rewritten) path
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    remote_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let start = Instant::now();
    let (parts, body) = req.into_parts();
    let host = request_host(&parts).to_string();

    let decision = state.router.route(&host, parts.uri.path());
    let internal_uri = match decision.rewritten_path() {
        Some(path) => match rewrite_uri(&parts.uri, path) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(error = %e, path, "failed to rebuild rewritten URI");
                return Ok(finish(
                    http::build_status_response(hyper::StatusCode::BAD_REQUEST),
                    &parts,
                    &parts.uri,
                    &host,
                    &decision,
                    remote_addr,
                    start,
                    &state,
                ));
            }
        },
        None => parts.uri.clone(),
    };

    tracing::debug!(
        host = %host,
        path = parts.uri.path(),
        internal = internal_uri.path(),
        ?decision,
        "routed request"
    );

    let response = dispatch(&parts, body, &host, &internal_uri, remote_addr, &state).await;
    Ok(finish(
        response,
        &parts,
        &internal_uri,
        &host,
        &decision,
        remote_addr,
        start,
        &state,
    ))
}

/// Host header, falling back to the request URI's authority
fn request_host(parts: &Parts) -> &str {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(hyper::http::uri::Authority::as_str))
        .unwrap_or("")
}

/// Resolve the internal URI against the route table and serve it
async fn dispatch<B>(
    parts: &Parts,
    body: B,
    host: &str,
    internal_uri: &Uri,
    remote_addr: SocketAddr,
    state: &AppState,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let route = state.routes.find(internal_uri.path());

    // 1. Check HTTP method
    if let Some(resp) = check_http_method(&parts.method, route, state.config.http.enable_cors) {
        return resp;
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(&parts.headers, state.config.http.max_body_size) {
        return resp;
    }

    let Some(route) = route else {
        return http::build_404_response();
    };

    let ctx = RequestContext {
        path: internal_uri.path(),
        is_head: parts.method == Method::HEAD,
        if_none_match: parts
            .headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok()),
    };

    match &route.target {
        RouteTarget::Dir(dir) => {
            static_files::serve_directory(&ctx, dir, &route.prefix, state.routes.index_files())
                .await
        }
        RouteTarget::File(file) => static_files::serve_file(&ctx, file).await,
        RouteTarget::Redirect { target, code } => http::build_redirect_response(target, *code),
        RouteTarget::Proxy(upstream) => {
            let forwarded = Forwarded {
                client_ip: remote_addr.ip(),
                host,
                original_path: parts.uri.path(),
            };
            match state
                .proxy
                .forward(
                    upstream,
                    parts,
                    body,
                    internal_uri,
                    &forwarded,
                    state.config.http.max_body_size,
                )
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        upstream = upstream.authority(),
                        path = internal_uri.path(),
                        "proxy request failed"
                    );
                    http::build_status_response(e.status())
                }
            }
        }
    }
}

/// GET/HEAD always pass, OPTIONS is answered here, anything else only reaches proxy routes
fn check_http_method(
    method: &Method,
    route: Option<&Route>,
    enable_cors: bool,
) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ if route.is_some_and(|r| matches!(r.target, RouteTarget::Proxy(_))) => None,
        _ => {
            tracing::debug!(%method, "method not allowed");
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get(header::CONTENT_LENGTH)?;
    let Ok(size_str) = content_length.to_str() else {
        tracing::warn!("Content-Length header contains non-ASCII characters");
        return None;
    };
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            tracing::warn!(size, max_body_size, "request body too large");
            Some(http::build_413_response())
        }
        Ok(_) => None,
        Err(_) => {
            tracing::warn!(value = size_str, "invalid Content-Length, skipping size check");
            None
        }
    }
}

/// Stamp the `Server` header and write the access log entry
#[allow(clippy::too_many_arguments)]
fn finish(
    mut response: Response<Full<Bytes>>,
    parts: &Parts,
    internal_uri: &Uri,
    host: &str,
    decision: &RouteDecision,
    remote_addr: SocketAddr,
    start: Instant,
    state: &AppState,
) -> Response<Full<Bytes>> {
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(header::SERVER, server);
    }

    if state.access_log_enabled() {
        let mut entry = AccessLogEntry::new(
            remote_addr.ip().to_string(),
            parts.method.to_string(),
            parts.uri.path().to_string(),
        );
        entry.host = host.to_string();
        entry.internal_path = internal_uri.path().to_string();
        entry.query = parts.uri.query().map(ToString::to_string);
        entry.product = decision.product();
        entry.http_version = http_version(parts.version).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.referer = header_string(&parts.headers, &header::REFERER);
        entry.user_agent = header_string(&parts.headers, &header::USER_AGENT);
        entry.request_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    response
}

fn header_string(headers: &HeaderMap, name: &header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
