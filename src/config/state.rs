// Application state module
// Immutable per-process context handed to every request handler

use std::time::Duration;

use super::error::ConfigError;
use super::types::Config;
use crate::handler::proxy::ProxyClient;
use crate::routing::{DomainTable, HostRouter, RouteTable};

/// Application state
///
/// Built once from validated configuration and shared through `Arc`;
/// nothing in here changes while the server runs.
pub struct AppState {
    pub config: Config,
    pub router: HostRouter,
    pub routes: RouteTable,
    pub proxy: ProxyClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let router = HostRouter::new(DomainTable::from(&config.domains), config.dev_default());
        let routes = RouteTable::from_rules(&config.routes.rules, &config.routes.index_files)?;
        let proxy = ProxyClient::new(Duration::from_secs(config.performance.request_timeout));

        Ok(Self {
            config,
            router,
            routes,
            proxy,
        })
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
