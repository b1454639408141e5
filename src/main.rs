mod api;
mod app;
mod config;
mod error;
mod input_map;
mod pool;
mod scheduler;
mod session;
mod virtual_controller;

use std::sync::Arc;

use app::BridgeApp;
use config::BridgeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BridgeConfig::load();
    log::info!(
        "Starting {} with {} controller(s) on the {:?} backend",
        config.name, config.controllers, config.backend
    );

    // A pool that cannot come up is fatal; the listener is never bound
    let app = Arc::new(BridgeApp::new(&config)?);

    let result = api::run_server(config.port, Arc::clone(&app), shutdown_signal()).await;

    app.shutdown();
    result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
