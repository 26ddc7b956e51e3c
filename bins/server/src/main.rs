//! Finplat API Server
//!
//! Main entry point for the Finplat workflow service.

mod persistence;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finplat_api::{AppState, create_router};
use finplat_shared::{AppConfig, AppError};

use crate::persistence::{load_engine, save_snapshot, spawn_snapshot_writer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finplat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().map_err(AppError::from)?;
    match &config.workflow.owner {
        Some(owner) => info!(owner = %owner, "Owner authority configured"),
        None => warn!("No owner configured; only registered Admins can administer users"),
    }

    // Restore or create the engine
    let snapshot_path = config.persistence.snapshot_path.as_deref().map(Path::new);
    let engine = load_engine(&config.workflow, snapshot_path)?;
    let state = AppState::new(engine);

    // Persist after every commit; the first write fails fast on an unwritable path
    let writer = match snapshot_path {
        Some(path) => {
            save_snapshot(&state.engine.snapshot(), path)?;
            info!(path = %path.display(), "Snapshot persistence enabled");
            Some(spawn_snapshot_writer(Arc::clone(&state.engine), path.to_path_buf()))
        }
        None => {
            warn!("No snapshot path configured; state is lost on exit");
            None
        }
    };

    // Create router
    let app = create_router(state.clone()).layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = writer {
        writer.shutdown().await;
    }
    if let Some(path) = snapshot_path {
        save_snapshot(&state.engine.snapshot(), path)?;
        info!(path = %path.display(), "Final snapshot saved");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
