//! Entry point: parse settings, start the stores, serve until Ctrl+C, then
//! shut the stores down.

use anyhow::Context;
use clap::Parser;
use resource_framework::PermissionGate;
use resource_framework::tracing::setup_tracing;
use resource_service::api::{self, Authenticator};
use resource_service::config::ServerConfig;
use resource_service::lifecycle::ResourceSystem;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    config.validate().context("invalid configuration")?;

    setup_tracing(&config.log_level);

    let auth = Authenticator::from_config(&config)?;
    let system = ResourceSystem::new(config.channel_capacity, PermissionGate::default());
    let app = api::router(&system, auth);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    system.shutdown().await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("Ctrl+C handler unavailable, running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
