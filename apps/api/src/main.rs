//! DPC API gateway entry point
//!
//! Serves the public and admin routers on separate listeners. A shutdown
//! signal drains both.

use anyhow::Context;
use dpc_api::{
    api::{admin_router, public_router},
    logging, AppState, Config,
};
use std::net::SocketAddr;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to read .env file");
        }
    }

    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _telemetry_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging/telemetry")?;

    let public_addr = config
        .public_server
        .socket_addr()
        .context("Failed to determine public socket address")?;
    let admin_addr = config
        .admin_server
        .socket_addr()
        .context("Failed to determine admin socket address")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.logging.deployment_environment,
        attribution_url = %config.attribution.url,
        auth_mode = ?config.auth.mode,
        "Starting DPC API"
    );

    let state = AppState::new(config).context("Failed to initialize application state")?;
    let public_app = public_router(state.clone());
    let admin_app = admin_router(state);

    let public_listener = tokio::net::TcpListener::bind(public_addr)
        .await
        .with_context(|| format!("Failed to bind public listener on {public_addr}"))?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("Failed to bind admin listener on {admin_addr}"))?;

    tracing::info!("Public API listening on http://{}/v2", public_addr);
    tracing::info!("Admin API listening on http://{}/v2", admin_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let public = axum::serve(
        public_listener,
        public_app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin = axum::serve(
        admin_listener,
        admin_app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    tokio::try_join!(
        async { public.await.context("Public listener terminated unexpectedly") },
        async { admin.await.context("Admin listener terminated unexpectedly") },
    )?;

    tracing::info!("DPC API shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Wait for SIGTERM or SIGINT.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("SIGINT received, starting graceful shutdown..."),
        _ = sigterm.recv() => tracing::info!("SIGTERM received, starting graceful shutdown..."),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
