use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod engine;
mod error;
mod image_store;
mod matcher;
mod routes;
mod state;

use config::Config;
use db::MySqlUserRepository;
use image_store::ImageStore;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal; the environment alone is enough.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "faceverifyd starting");

    let config = Config::from_env();

    let images = ImageStore::new(&config.image_dir);
    images
        .ensure_dir()
        .await
        .with_context(|| format!("creating image directory {}", config.image_dir.display()))?;
    tracing::info!(path = %images.root().display(), "image store ready");

    let pool = db::create_pool(&config.database)
        .await
        .context("connecting to MySQL")?;

    let engine = engine::spawn_engine(&config.model_dir).context("starting face engine")?;

    let state = AppState::new(
        Arc::new(MySqlUserRepository::new(pool.clone())),
        Arc::new(engine),
        images,
        config.match_tolerance,
    );
    let app = routes::build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        tolerance = config.match_tolerance,
        "faceverifyd ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("faceverifyd shut down");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
