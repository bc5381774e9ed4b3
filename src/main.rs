// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runnerdash API Server
//!
//! Watches a folder for TCX activity files, stores them in SQLite and
//! serves the dashboard API.

use runnerdash::{
    config::Config,
    db::SqliteDb,
    services::{ActivityIngestor, ActivityWatcher},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let config = Config::from_env()?;

    // Initialize structured JSON logging
    init_logging(config.debug);
    tracing::info!(
        port = config.port,
        base_path = %config.base_path.display(),
        "Starting Runnerdash API"
    );

    // Open SQLite database (runs migrations)
    let db = SqliteDb::open(&config.db_file)?;
    if db.is_first_run().await? {
        tracing::info!("No profile configured yet, POST /setup to create one");
    }

    let ingestor = ActivityIngestor::new(db.clone());

    // Watch the activity folder; files already there are ingested first
    let watcher = ActivityWatcher::start(&config.watch_dir(), ingestor.clone()).await?;

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        ingestor,
    });

    // Build router
    let app = runnerdash::routes::create_router(state);

    // Start server
    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    watcher.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging(debug: bool) {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let crate_level = if debug { "runnerdash=debug" } else { "runnerdash=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let filter = match crate_level.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };

    tracing_subscriber::registry().with(filter).with(format).init();
}
