//! # cdm-lookup-rest - HTTP API for OMOP CDM lookups
//!
//! This crate exposes the search and statistics operations of
//! `cdm-lookup-persistence` over HTTP using [axum](https://docs.rs/axum).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cdm_lookup_persistence::cache::ReferenceCache;
//! use cdm_lookup_persistence::store::sqlite::SqliteStore;
//! use cdm_lookup_rest::{create_app_with_config, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteStore::open("cdm.db")?);
//!     let cache = Arc::new(ReferenceCache::new());
//!     cache.refresh_all(store.as_ref());
//!
//!     let app = create_app_with_config(store, cache, ServerConfig::default());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:5050").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Parameters |
//! |----------|------------|
//! | `GET /search/condition` | `person_id`, `visit_id`, `condition`, `date`, `page`, `page_size` |
//! | `GET /search/drug` | `person_id`, `visit_id`, `drug`, `date`, `page`, `page_size` |
//! | `GET /search/person` | `birth`, `gender`, `race`, `ethnicity`, `page`, `page_size` |
//! | `GET /search/visit` | `person_id`, `visit_type`, `date`, `page`, `page_size` |
//! | `GET /search/death` | `person_id`, `date`, `page`, `page_size` |
//! | `GET /search/concept` | `keyword`, `page`, `page_size` |
//! | `GET /statistic/person/...` | `person_count`, `{gender,race,ethnicity}_count[/value]`, `death_count` |
//! | `GET /statistic/visit/...` | `{visit_type,gender,race,ethnicity}_count[/value]`, `age_count[/age]` |
//! | `GET /health` | |
//!
//! Date ranges are written `YYYY-MM-DD~YYYY-MM-DD` and include both ends.
//!
//! ## Responses
//!
//! Every API response is an envelope `{ "status": ..., "data": ... }`:
//!
//! | Status | HTTP | Meaning |
//! |--------|------|---------|
//! | `SUCCESS` | 200 | `data` holds the result |
//! | `INVALID_DATA` | 400 | A parameter was malformed or a category value unknown |
//! | `DATABASE_ERROR` | 500 | The database query failed |
//! | `STATUS_ERROR` | 500 | Any other failure |
//!
//! Unknown paths, wrong methods and request timeouts also answer with a
//! `STATUS_ERROR` envelope, under `404`, `405` and `408` respectively.
//!
//! ## Configuration
//!
//! See [`ServerConfig`]; every option can be set by flag or `CDM_LOOKUP_*`
//! environment variable.

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use responses::{Envelope, ResponseStatus};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use cdm_lookup_persistence::cache::ReferenceCache;
use cdm_lookup_persistence::store::DataStore;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application with default configuration.
///
/// For more control, use [`create_app_with_config`].
pub fn create_app<D>(store: Arc<D>, cache: Arc<ReferenceCache>) -> Router
where
    D: DataStore + 'static,
{
    create_app_with_config(store, cache, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// The cache is shared, not copied: snapshots published into it by a
/// [`RefreshScheduler`](cdm_lookup_persistence::cache::RefreshScheduler) are
/// visible to the next request.
pub fn create_app_with_config<D>(
    store: Arc<D>,
    cache: Arc<ReferenceCache>,
    config: ServerConfig,
) -> Router
where
    D: DataStore + 'static,
{
    info!(
        "Creating REST API server with backend: {}",
        store.backend_name()
    );

    let request_timeout = config.request_timeout_duration();
    let enable_cors = config.enable_cors;
    let cors = build_cors_layer(&config);

    let state = AppState::new(store, cache, config);
    let router = routing::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::envelope_bare_errors))
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    let router = if enable_cors {
        router.layer(cors)
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([http::Method::GET])
        .allow_headers(Any);

    if config.cors_origins == "*" {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` overrides
/// `level` when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cdm_lookup_rest={level},cdm_lookup_persistence={level},cdm_lookup={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
