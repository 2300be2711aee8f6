//! CDM lookup server.
//!
//! Serves search and statistics over an OMOP CDM warehouse.

use std::sync::Arc;

use clap::Parser;
use cdm_lookup_persistence::cache::{RefreshScheduler, ReferenceCache};
use cdm_lookup_rest::{ServerConfig, create_app_with_config, init_logging};
use tracing::{info, warn};

#[cfg(feature = "sqlite")]
use cdm_lookup_persistence::store::sqlite::{SqliteStore, SqliteStoreConfig};

/// Opens the SQLite warehouse named by the server configuration.
#[cfg(feature = "sqlite")]
fn create_sqlite_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    info!(database = %config.database_url, "Opening SQLite warehouse");

    let store_config = SqliteStoreConfig {
        max_connections: config.max_connections,
        read_only: !config.init_fixture_schema,
        ..Default::default()
    };
    let store = SqliteStore::with_config(&config.database_url, store_config)?;

    if config.init_fixture_schema {
        warn!("Creating fixture schema; this is meant for development databases");
        store.init_fixture_schema()?;
    }
    store.health_check()?;

    Ok(store)
}

/// Starts the Axum HTTP server and runs until Ctrl-C.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        database = %config.database_url,
        refresh_interval_secs = config.refresh_interval,
        "Starting CDM lookup server"
    );

    start_sqlite(config).await
}

/// Starts the server over a SQLite warehouse.
#[cfg(feature = "sqlite")]
async fn start_sqlite(config: ServerConfig) -> anyhow::Result<()> {
    let store = Arc::new(create_sqlite_store(&config)?);
    let cache = Arc::new(ReferenceCache::new());

    let scheduler = RefreshScheduler::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        config.refresh_period(),
    );
    let scheduler = tokio::task::spawn_blocking(move || {
        scheduler.run_once();
        scheduler
    })
    .await?;
    let refresh = scheduler.spawn();

    let app = create_app_with_config(store, cache, config.clone());
    let result = serve(app, &config).await;

    refresh.abort();
    info!("Server stopped");
    result
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
async fn start_sqlite(_config: ServerConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "The sqlite backend requires the 'sqlite' feature. \
         Build with: cargo build -p cdm-lookup-server --features sqlite"
    )
}
