// Connection handling module
// Accepts a single TCP connection and serves it on its own task

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::api;
use crate::config::AppState;
use crate::handler;

/// Which request handler a listener serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    /// Public traffic with host rewriting
    App,
    /// Admin API
    Api,
}

/// Accept and process a connection, enforcing the connection limit.
///
/// Returns `false` when the connection was rejected.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    kind: ServerKind,
    check_limits: bool,
    shutdown: watch::Receiver<bool>,
) -> bool {
    // Increment first, then check, so concurrent accepts can't both slip under the limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if check_limits {
        if let Some(max_conn) = state.config.performance.max_connections {
            if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
                conn_counter.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!(
                    %peer_addr,
                    active = prev_count,
                    max_conn,
                    "max connections reached, rejecting"
                );
                drop(stream);
                return false;
            }
        }
    }

    tracing::trace!(%peer_addr, ?kind, "connection accepted");

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        kind,
        shutdown,
    );
    true
}

/// Serve one HTTP/1.1 connection.
///
/// The whole connection is bounded by `performance.request_timeout`; on
/// shutdown the in-flight request finishes and keep-alive is disabled.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    kind: ServerKind,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let timeout_duration = Duration::from_secs(state.config.performance.request_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive);

        let service_state = Arc::clone(&state);
        let service = service_fn(move |req: Request<Incoming>| {
            let state = Arc::clone(&service_state);
            async move {
                match kind {
                    ServerKind::App => handler::handle_request(req, peer_addr, state).await,
                    ServerKind::Api => api::handle_api_request(req, state).await,
                }
            }
        });

        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);

        let served = tokio::time::timeout(timeout_duration, async {
            let mut draining = false;
            loop {
                tokio::select! {
                    res = conn.as_mut() => break res,
                    _ = shutdown.changed(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }
        })
        .await;

        match served {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(%peer_addr, error = %e, "connection error"),
            Err(_) => tracing::debug!(
                %peer_addr,
                ?kind,
                timeout_secs = timeout_duration.as_secs(),
                "connection timed out"
            ),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
