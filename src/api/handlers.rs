// Admin API handlers

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::collections::HashMap;
use url::form_urlencoded;

use super::response::{bad_request, json_response};
use super::types::{
    ConfigSnapshot, DomainsResponse, ListenerResource, MatchedRoute, RouteResponse,
    ServerEndpoint,
};
use crate::config::AppState;
use crate::http;
use crate::routing::host::normalize_host;

/// Liveness and readiness; state is immutable once built, so both are `ok`
pub fn handle_health() -> Response<Full<Bytes>> {
    http::build_text_response(StatusCode::OK, "ok")
}

pub fn handle_domains(state: &AppState) -> Response<Full<Bytes>> {
    let body = DomainsResponse {
        domains: state.router.domains().entries(),
        dev_default: state.config.dev_default(),
    };
    json_response(StatusCode::OK, &body)
}

/// Explain how `host` + `path` would be routed
pub fn handle_route(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    let params: HashMap<String, String> =
        form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

    let Some(host) = params.get("host") else {
        return bad_request("missing query parameter 'host'");
    };
    let Some(path) = params.get("path") else {
        return bad_request("missing query parameter 'path'");
    };
    if !path.starts_with('/') {
        return bad_request("'path' must start with '/'");
    }

    let decision = state.router.route(host, path);
    let internal_path = decision.rewritten_path().unwrap_or(path).to_string();
    let route = state.routes.find(&internal_path).map(|r| MatchedRoute {
        prefix: &r.prefix,
        kind: r.target.kind(),
    });

    let body = RouteResponse {
        host,
        normalized_host: normalize_host(host),
        path,
        internal_path,
        route,
        decision,
    };
    json_response(StatusCode::OK, &body)
}

pub fn handle_config(state: &AppState) -> Response<Full<Bytes>> {
    let server = &state.config.server;
    let body = ConfigSnapshot {
        listener: ListenerResource {
            main_server: ServerEndpoint {
                host: &server.host,
                port: server.port,
            },
            api_server: ServerEndpoint {
                host: &server.api_host,
                port: server.api_port,
            },
        },
        config: &state.config,
    };
    json_response(StatusCode::OK, &body)
}
