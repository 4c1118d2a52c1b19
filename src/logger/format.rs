//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with variables

use chrono::Local;
use serde::Serialize;

use crate::routing::Product;

/// Access log entry for one request, as seen by the client and after rewriting
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    pub time: chrono::DateTime<Local>,
    pub method: String,
    /// Host header as sent by the client
    pub host: String,
    /// Client-visible path
    pub path: String,
    /// Path served internally, equal to `path` when not rewritten
    pub internal_path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Product namespace the request was attributed to
    pub product: Option<Product>,
    pub http_version: String,
    pub status: u16,
    /// Response body size in bytes
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    remote_addr: &'a str,
    time: String,
    method: &'a str,
    host: &'a str,
    path: &'a str,
    internal_path: &'a str,
    query: Option<&'a str>,
    product: Option<Product>,
    http_version: &'a str,
    status: u16,
    body_bytes: usize,
    referer: Option<&'a str>,
    user_agent: Option<&'a str>,
    request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            host: String::new(),
            internal_path: path.clone(),
            path,
            query: None,
            product: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn internal_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.internal_path),
            None => self.internal_path.clone(),
        }
    }

    /// Common Log Format (CLF)
    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.request_uri(),
            self.http_version,
            self.status,
            self.body_bytes,
        )
    }

    /// Combined format: CLF plus `"$http_referer" "$http_user_agent"`
    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\"",
            self.format_common(),
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    fn format_json(&self) -> String {
        let line = JsonLine {
            remote_addr: &self.remote_addr,
            time: self.time.to_rfc3339(),
            method: &self.method,
            host: &self.host,
            path: &self.path,
            internal_path: &self.internal_path,
            query: self.query.as_deref(),
            product: self.product,
            http_version: &self.http_version,
            status: self.status,
            body_bytes: self.body_bytes,
            referer: self.referer.as_deref(),
            user_agent: self.user_agent.as_deref(),
            request_time_us: self.request_time_us,
        };
        serde_json::to_string(&line).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize access log entry");
            String::new()
        })
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables:
    /// - `$remote_addr` - Client IP address
    /// - `$time_local` - Local time in Common Log Format
    /// - `$time_iso8601` - ISO 8601 timestamp
    /// - `$request` - Full request line ("METHOD /path HTTP/version")
    /// - `$request_method` - HTTP method
    /// - `$request_uri` - Client-visible URI with query string
    /// - `$internal_uri` - Rewritten URI with query string
    /// - `$host` - Host header
    /// - `$product` - Product name, `-` when none
    /// - `$status` - Response status code
    /// - `$body_bytes_sent` - Response body size
    /// - `$http_referer` - Referer header
    /// - `$http_user_agent` - User-Agent header
    /// - `$request_time` - Request processing time in seconds (3 decimal places)
    ///
    /// The pattern is scanned once, so values that themselves contain `$name`
    /// (a client path, say) are written verbatim. Unknown variables are kept.
    fn format_custom(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() * 2);
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..len];
            match self.variable(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[len..];
        }
        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> Option<String> {
        let value = match name {
            "remote_addr" => self.remote_addr.clone(),
            "time_local" => self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request" => format!(
                "{} {} HTTP/{}",
                self.method,
                self.request_uri(),
                self.http_version
            ),
            "request_method" => self.method.clone(),
            "request_uri" => self.request_uri(),
            "internal_uri" => self.internal_uri(),
            "host" => self.host.clone(),
            "product" => self.product.map_or("-", Product::name).to_string(),
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "http_referer" => self.referer.as_deref().unwrap_or("-").to_string(),
            "http_user_agent" => self.user_agent.as_deref().unwrap_or("-").to_string(),
            "request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let seconds = self.request_time_us as f64 / 1_000_000.0;
                format!("{seconds:.3}")
            }
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "GET".to_string(),
            "/inception".to_string(),
        );
        entry.host = "movie-recommendation.mindefy.tech".to_string();
        entry.internal_path = "/movies/inception".to_string();
        entry.product = Some(Product::Movies);
        entry.query = Some("tab=similar".to_string());
        entry.status = 200;
        entry.body_bytes = 1234;
        entry.referer = Some("https://portfolio.mindefy.tech".to_string());
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.request_time_us = 12_000;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"GET /inception?tab=similar HTTP/1.1\" 200 1234"));
        assert!(log.ends_with("\"https://portfolio.mindefy.tech\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.contains("GET /inception?tab=similar HTTP/1.1"));
        assert!(log.ends_with("200 1234"));
        assert!(!log.contains("Mozilla"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["path"], "/inception");
        assert_eq!(value["internal_path"], "/movies/inception");
        assert_eq!(value["product"], "movies");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 1234);
    }

    #[test]
    fn test_format_json_escapes() {
        let mut entry = create_test_entry();
        entry.user_agent = Some("quote\" and \\ slash".to_string());
        entry.product = None;
        let value: serde_json::Value = serde_json::from_str(&entry.format("json")).unwrap();
        assert_eq!(value["user_agent"], "quote\" and \\ slash");
        assert!(value["product"].is_null());
    }

    #[test]
    fn test_format_custom() {
        let log = create_test_entry()
            .format("$host $request_uri -> $internal_uri [$product] $status $request_time");
        assert_eq!(
            log,
            "movie-recommendation.mindefy.tech /inception?tab=similar -> \
             /movies/inception?tab=similar [movies] 200 0.012"
        );
    }

    #[test]
    fn test_format_custom_request_line() {
        let mut entry = create_test_entry();
        entry.product = None;
        let log = entry.format("$request|$request_method|$product");
        assert_eq!(log, "GET /inception?tab=similar HTTP/1.1|GET|-");
    }

    #[test]
    fn test_format_custom_values_not_reexpanded() {
        let mut entry = create_test_entry();
        entry.path = "/$host/$status".to_string();
        entry.query = None;
        let log = entry.format("$request_uri $status $unknown");
        assert_eq!(log, "/$host/$status 200 $unknown");
    }
}
