// Admin API response types

use serde::Serialize;

use crate::config::Config;
use crate::routing::{DomainEntry, Product, RouteDecision};

/// `GET /v1/domains`
#[derive(Debug, Serialize)]
pub struct DomainsResponse<'a> {
    pub domains: &'a [DomainEntry],
    /// Product served at `/` on localhost
    pub dev_default: Option<Product>,
}

/// `GET /v1/route`
#[derive(Debug, Serialize)]
pub struct RouteResponse<'a> {
    pub host: &'a str,
    pub normalized_host: String,
    pub path: &'a str,
    pub decision: RouteDecision,
    /// Path the route table sees after the decision
    pub internal_path: String,
    /// Route table entry serving `internal_path`, if any
    pub route: Option<MatchedRoute<'a>>,
}

#[derive(Debug, Serialize)]
pub struct MatchedRoute<'a> {
    pub prefix: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// `GET /v1/config`
#[derive(Debug, Serialize)]
pub struct ConfigSnapshot<'a> {
    pub listener: ListenerResource<'a>,
    pub config: &'a Config,
}

#[derive(Debug, Serialize)]
pub struct ListenerResource<'a> {
    pub main_server: ServerEndpoint<'a>,
    pub api_server: ServerEndpoint<'a>,
}

#[derive(Debug, Serialize)]
pub struct ServerEndpoint<'a> {
    pub host: &'a str,
    pub port: u16,
}
