// Configuration error types

use thiserror::Error;

use crate::routing::Product;

/// Startup configuration failure
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid {field} address '{value}': {source}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("{product} host must not be empty")]
    EmptyHost { product: Product },

    #[error("{product} host '{host}' must not contain a port")]
    HostWithPort { product: Product, host: String },

    #[error("{product} host '{host}' must not start with 'www.'")]
    HostWithWww { product: Product, host: String },

    #[error("{product} host '{host}' must be lowercase")]
    HostNotLowercase { product: Product, host: String },

    #[error("{first} and {second} share host '{host}'")]
    DuplicateHost {
        first: Product,
        second: Product,
        host: String,
    },

    #[error("{product} base URL '{url}' is not an absolute http(s) URL")]
    InvalidBaseUrl { product: Product, url: String },

    #[error("route prefix '{prefix}' must start with '/'")]
    InvalidRoutePrefix { prefix: String },

    #[error("duplicate route prefix '{prefix}'")]
    DuplicateRoutePrefix { prefix: String },

    #[error("redirect for '{prefix}' uses non-redirect status {code}")]
    InvalidRedirectCode { prefix: String, code: u16 },

    #[error("redirect target '{target}' for '{prefix}' is not a valid Location value")]
    InvalidRedirectTarget { prefix: String, target: String },

    #[error("proxy upstream '{upstream}' for '{prefix}' is invalid: {reason}")]
    InvalidUpstream {
        prefix: String,
        upstream: String,
        reason: String,
    },
}
