use std::sync::Arc;

mod api;
mod config;
mod face;
mod handler;
mod http;
mod logger;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;

    logger::init(&cfg.logging)?;
    let request_logger = logger::Logger::new(&cfg.logging)?;

    // Worker count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        tracing::info!("using {workers} worker threads");
    } else {
        tracing::info!("using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg, request_logger))
}

async fn async_main(
    cfg: config::Config,
    request_logger: logger::Logger,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    request_logger.server_start(&addr, &cfg);
    let state = Arc::new(config::AppState::new(&cfg, request_logger));

    server::start_signal_handler(Arc::clone(&state.shutdown));

    // Connection tasks use spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state))
        .await;

    tracing::info!("server stopped");
    Ok(())
}
