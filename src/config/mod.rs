// Configuration module entry point
// Loads, defaults and validates configuration once at startup

mod error;
mod state;
mod types;

use std::net::SocketAddr;

pub use error::ConfigError;
pub use state::AppState;
pub use types::{
    Config, DevConfig, DomainsConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    ProductDomain, RouteAction, RouteRule, RoutesConfig, ServerConfig,
};

use crate::routing::Product;

/// Environment variable prefix, e.g. `MINDEFY__SERVER__PORT=8080`
const ENV_PREFIX: &str = "MINDEFY";

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// Layers: built-in defaults, then the file if present, then environment.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let defaults = DomainsConfig::default();
        let settings = ::config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.api_host", "127.0.0.1")?
            .set_default("server.api_port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.request_timeout", 30)?
            .set_default("http.server_name", "mindefy-router")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("domains.portfolio.host", defaults.portfolio.host)?
            .set_default("domains.askdocs.host", defaults.askdocs.host)?
            .set_default("domains.movies.host", defaults.movies.host)?
            .add_source(::config::File::with_name(config_path).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that cannot be expressed in the type system
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.get_socket_addr()?;
        self.get_api_socket_addr()?;
        validate_domains(&self.domains)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("server", &self.server.host, self.server.port)
    }

    pub fn get_api_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("api", &self.server.api_host, self.server.api_port)
    }

    /// Product served at `/` on localhost, if the fallback is on
    pub const fn dev_default(&self) -> Option<Product> {
        if self.dev.enabled {
            Some(self.dev.default_product)
        } else {
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                api_host: "127.0.0.1".to_string(),
                api_port: 8000,
                workers: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: true,
                access_log_format: "combined".to_string(),
                access_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive: true,
                request_timeout: 30,
                max_connections: None,
            },
            http: HttpConfig {
                server_name: "mindefy-router".to_string(),
                enable_cors: false,
                max_body_size: 10_485_760,
            },
            domains: DomainsConfig::default(),
            dev: DevConfig::default(),
            routes: RoutesConfig::default(),
        }
    }
}

fn parse_addr(field: &'static str, host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let value = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    value
        .parse()
        .map_err(|source| ConfigError::InvalidAddress {
            field,
            value,
            source,
        })
}

fn validate_domains(domains: &DomainsConfig) -> Result<(), ConfigError> {
    for (i, &product) in Product::ALL.iter().enumerate() {
        let domain = domains.get(product);
        validate_host(product, &domain.host)?;

        let url = domain.base_url();
        if !is_http_url(&url) {
            return Err(ConfigError::InvalidBaseUrl { product, url });
        }

        if let Some(&first) = Product::ALL[..i]
            .iter()
            .find(|&&other| domains.get(other).host == domain.host)
        {
            return Err(ConfigError::DuplicateHost {
                first,
                second: product,
                host: domain.host.clone(),
            });
        }
    }
    Ok(())
}

/// Hosts are compared against normalized request hosts, so they must
/// already be in normalized form
fn validate_host(product: Product, host: &str) -> Result<(), ConfigError> {
    let owned = || host.to_string();
    if host.trim().is_empty() {
        return Err(ConfigError::EmptyHost { product });
    }
    if host.contains(':') {
        return Err(ConfigError::HostWithPort {
            product,
            host: owned(),
        });
    }
    if host.starts_with("www.") {
        return Err(ConfigError::HostWithWww {
            product,
            host: owned(),
        });
    }
    if host.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(ConfigError::HostNotLowercase {
            product,
            host: owned(),
        });
    }
    Ok(())
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| {
        matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty())
    })
}
