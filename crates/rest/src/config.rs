//! Server configuration for the CDM lookup API.
//!
//! This module provides the configuration type for the server, supporting
//! command line flags, environment variables and programmatic construction.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CDM_LOOKUP_PORT` | 5050 | Server port |
//! | `CDM_LOOKUP_HOST` | 0.0.0.0 | Host to bind |
//! | `CDM_LOOKUP_LOG_LEVEL` | info | Log level |
//! | `CDM_LOOKUP_DATABASE_URL` | cdm.db | Warehouse database path (`:memory:` for in-memory) |
//! | `CDM_LOOKUP_MAX_CONNECTIONS` | 10 | Connection pool size |
//! | `CDM_LOOKUP_REFRESH_INTERVAL` | 3600 | Reference cache refresh period (seconds) |
//! | `CDM_LOOKUP_DEFAULT_PAGE_SIZE` | 10 | Page size when `page_size` is omitted |
//! | `CDM_LOOKUP_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `CDM_LOOKUP_ENABLE_CORS` | true | Enable CORS |
//! | `CDM_LOOKUP_CORS_ORIGINS` | * | Allowed origins |
//!
//! # Example
//!
//! ```rust
//! use cdm_lookup_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     enable_cors: false,
//!     ..Default::default()
//! };
//! assert_eq!(config.socket_addr(), "0.0.0.0:3000");
//! ```

use std::time::Duration;

use clap::Parser;

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "cdm-lookup")]
#[command(about = "Read-only search and statistics API over an OMOP-CDM warehouse")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "CDM_LOOKUP_PORT", default_value = "5050")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "CDM_LOOKUP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "CDM_LOOKUP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Warehouse database path.
    #[arg(long, env = "CDM_LOOKUP_DATABASE_URL", default_value = "cdm.db")]
    pub database_url: String,

    /// Maximum pooled database connections.
    #[arg(long, env = "CDM_LOOKUP_MAX_CONNECTIONS", default_value = "10")]
    pub max_connections: u32,

    /// Reference cache refresh interval in seconds.
    #[arg(long, env = "CDM_LOOKUP_REFRESH_INTERVAL", default_value = "3600")]
    pub refresh_interval: u64,

    /// Page size used when a request omits `page_size`.
    #[arg(long, env = "CDM_LOOKUP_DEFAULT_PAGE_SIZE", default_value = "10")]
    pub default_page_size: u64,

    /// Request timeout in seconds.
    #[arg(long, env = "CDM_LOOKUP_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "CDM_LOOKUP_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "CDM_LOOKUP_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Create the warehouse tables if missing. Development databases only.
    #[arg(long, env = "CDM_LOOKUP_INIT_FIXTURE_SCHEMA", default_value = "false")]
    pub init_fixture_schema: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5050,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
            database_url: "cdm.db".to_string(),
            max_connections: 10,
            refresh_interval: 3600,
            default_page_size: 10,
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            init_fixture_schema: false,
        }
    }
}

impl ServerConfig {
    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the reference cache refresh period.
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    /// Returns the request timeout.
    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_connections == 0 {
            errors.push("Max connections cannot be 0".to_string());
        }

        if self.refresh_interval == 0 {
            errors.push("Refresh interval cannot be 0".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            database_url: ":memory:".to_string(),
            max_connections: 4,
            refresh_interval: 3600,
            default_page_size: 10,
            request_timeout: 5,
            enable_cors: false,
            cors_origins: "*".to_string(),
            init_fixture_schema: true,
        }
    }
}
