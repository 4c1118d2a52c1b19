// Server loop module
// Accept loop shared by the app and admin listeners; stops on shutdown and
// drains in-flight connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;

use super::connection::{accept_connection, ServerKind};
use crate::config::AppState;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration for server loop behavior
#[derive(Debug, Clone, Copy)]
pub struct ServerLoopConfig {
    pub kind: ServerKind,
    pub check_connection_limits: bool,
}

/// Accept connections until shutdown is requested, then wait up to
/// `performance.request_timeout` for active connections to finish.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    config: ServerLoopConfig,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let local_addr = listener.local_addr()?;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            config.kind,
                            config.check_connection_limits,
                            shutdown.clone(),
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            addr = %local_addr,
                            kind = ?config.kind,
                            error = %e,
                            "failed to accept connection"
                        );
                    }
                }
            }

            _ = shutdown.changed() => break,
        }
    }

    drop(listener);
    tracing::info!(
        addr = %local_addr,
        kind = ?config.kind,
        "listener closed, draining connections"
    );

    let grace = Duration::from_secs(state.config.performance.request_timeout);
    let remaining = drain(&active_connections, grace).await;
    if remaining > 0 {
        tracing::warn!(kind = ?config.kind, remaining, "connections still open after grace period");
    }
    Ok(())
}

/// Wait until no connections are active or `grace` has elapsed.
///
/// Returns the number of connections still open.
async fn drain(active_connections: &AtomicUsize, grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 || Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
