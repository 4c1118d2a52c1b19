// API response utility functions module

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::http;

const CT_JSON: &str = "application/json";

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_string_pretty(body) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize API response");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, CT_JSON)
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build API response");
            http::build_500_response()
        })
}

/// `{"error": {"code": .., "message": ..}}` with the given status
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": {
            "code": status.as_u16(),
            "message": message
        }
    });
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, CT_JSON)
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build API error response");
            http::build_500_response()
        })
}

/// 400 Bad Request response
pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// 404 Not Found response listing what the admin API serves
pub fn not_found() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "available_endpoints": super::ENDPOINTS,
    });
    json_response(StatusCode::NOT_FOUND, &body)
}
