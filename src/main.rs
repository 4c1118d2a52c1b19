use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use mindefy_router::config::{AppState, Config};
use mindefy_router::logger;
use mindefy_router::server::{
    create_reusable_listener, shutdown_signal, start_server_loop, ServerKind, ServerLoopConfig,
    Shutdown,
};

/// Config file base name, resolved by extension (`config.toml`, ...)
const DEFAULT_CONFIG: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = Config::load_from(&config_path)?;

    // Thread count from `server.workers`, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg.logging)?;

    let app_addr = cfg.get_socket_addr()?;
    let api_addr = cfg.get_api_socket_addr()?;
    let state = Arc::new(AppState::new(cfg)?);

    let app_listener = create_reusable_listener(app_addr)?;
    let api_listener = create_reusable_listener(api_addr)?;
    logger::log_server_start(&app_addr, &api_addr, &state.config);

    let shutdown = Shutdown::new();
    let app_server = tokio::spawn(start_server_loop(
        app_listener,
        Arc::clone(&state),
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            kind: ServerKind::App,
            check_connection_limits: true,
        },
        shutdown.subscribe(),
    ));
    let api_server = tokio::spawn(start_server_loop(
        api_listener,
        state,
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            kind: ServerKind::Api,
            check_connection_limits: false,
        },
        shutdown.subscribe(),
    ));

    let signal = shutdown_signal().await?;
    tracing::info!(signal, "shutdown requested");
    shutdown.trigger();

    let (app_result, api_result) = tokio::join!(app_server, api_server);
    app_result??;
    api_result??;

    tracing::info!("server stopped");
    Ok(())
}
