//! Application state shared by all request handlers.

use std::sync::Arc;

use cdm_lookup_persistence::cache::ReferenceCache;
use cdm_lookup_persistence::service::LookupService;
use cdm_lookup_persistence::store::DataStore;

use crate::config::ServerConfig;

/// Shared application state.
///
/// Holds the data store, the reference cache the refresh scheduler publishes
/// into, and the server configuration.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use cdm_lookup_persistence::cache::ReferenceCache;
/// use cdm_lookup_persistence::store::sqlite::SqliteStore;
/// use cdm_lookup_rest::{AppState, ServerConfig};
///
/// let store = Arc::new(SqliteStore::in_memory()?);
/// let state = AppState::new(store, Arc::new(ReferenceCache::new()), ServerConfig::default());
/// ```
pub struct AppState<D> {
    /// The data store.
    store: Arc<D>,

    /// Reference-data snapshots.
    cache: Arc<ReferenceCache>,

    /// Server configuration.
    config: Arc<ServerConfig>,
}

// Manually implement Clone since D is wrapped in Arc and doesn't need to be Clone
impl<D> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: DataStore> AppState<D> {
    /// Creates a new AppState.
    pub fn new(store: Arc<D>, cache: Arc<ReferenceCache>, config: ServerConfig) -> Self {
        Self {
            store,
            cache,
            config: Arc::new(config),
        }
    }

    /// Returns a reference to the data store.
    pub fn store(&self) -> &D {
        &self.store
    }

    /// Returns the reference cache.
    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the page size used when a request omits one.
    pub fn default_page_size(&self) -> u64 {
        self.config.default_page_size
    }

    /// Returns a lookup service sharing this state's store and cache.
    pub fn service(&self) -> LookupService<D> {
        LookupService::new(Arc::clone(&self.store), Arc::clone(&self.cache))
    }
}
