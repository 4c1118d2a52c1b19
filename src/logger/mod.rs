//! Logger module
//!
//! Diagnostics go through `tracing`; the subscriber's filter comes from
//! `RUST_LOG` when set, otherwise from `logging.level`. Access log lines are
//! formatted here and written by [`writer`].

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Initialize diagnostics and the access log writer
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    // A subscriber installed earlier (tests, embedding) takes precedence
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    writer::init(config.access_log_file.as_deref())
}

pub fn log_server_start(addr: &SocketAddr, api_addr: &SocketAddr, config: &Config) {
    tracing::info!(%addr, "router listening");
    tracing::info!(addr = %api_addr, "admin API listening");
    for entry in [
        &config.domains.portfolio,
        &config.domains.askdocs,
        &config.domains.movies,
    ] {
        tracing::debug!(host = %entry.host, base_url = %entry.base_url(), "product domain");
    }
    if let Some(product) = config.dev_default() {
        tracing::info!(%product, "localhost serves / from the dev default product");
    }
    if let Some(workers) = config.server.workers {
        tracing::info!(workers, "worker threads");
    }
    if let Some(ref path) = config.logging.access_log_file {
        tracing::info!(path = %path, "access log file");
    }
}

/// Write one formatted access log line
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(writer) => writer.write(&line),
        None => println!("{line}"),
    }
}
