// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

use crate::routing::Product;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub domains: DomainsConfig,
    #[serde(default)]
    pub dev: DevConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_host: String,
    pub api_port: u16,
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds a connection may stay open; also bounds upstream calls
    pub request_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Hostname and public URL of one product
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProductDomain {
    pub host: String,
    /// Public base URL, `https://{host}` when unset
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProductDomain {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            base_url: None,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.host))
    }
}

/// Product hostnames
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DomainsConfig {
    pub portfolio: ProductDomain,
    pub askdocs: ProductDomain,
    pub movies: ProductDomain,
}

impl DomainsConfig {
    pub const fn get(&self, product: Product) -> &ProductDomain {
        match product {
            Product::Portfolio => &self.portfolio,
            Product::AskDocs => &self.askdocs,
            Product::Movies => &self.movies,
        }
    }
}

impl Default for DomainsConfig {
    fn default() -> Self {
        Self {
            portfolio: ProductDomain::new("portfolio.mindefy.tech"),
            askdocs: ProductDomain::new("ask.mindefy.tech"),
            movies: ProductDomain::new("movie-recommendation.mindefy.tech"),
        }
    }
}

/// Local development behaviour
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DevConfig {
    /// Rewrite `/` on localhost to `default_product`
    #[serde(default = "default_dev_enabled")]
    pub enabled: bool,
    #[serde(default = "default_dev_product")]
    pub default_product: Product,
}

#[allow(clippy::missing_const_for_fn)]
fn default_dev_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_dev_product() -> Product {
    Product::Portfolio
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            enabled: default_dev_enabled(),
            default_product: default_dev_product(),
        }
    }
}

/// Route table configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoutesConfig {
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RouteRule>,
}

fn default_index_files() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            index_files: default_index_files(),
            rules: Vec::new(),
        }
    }
}

/// Path prefix bound to an action
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: String,
    #[serde(flatten)]
    pub action: RouteAction,
}

/// Route action - what to do when a route matches
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteAction {
    /// Serve files from a directory
    Dir { path: String },
    /// Serve a specific file
    File { path: String },
    /// HTTP redirect
    Redirect {
        target: String,
        #[serde(default = "default_redirect_code")]
        code: u16,
    },
    /// Forward to a plain-HTTP upstream
    Proxy { upstream: String },
}

#[allow(clippy::missing_const_for_fn)]
fn default_redirect_code() -> u16 {
    302
}
