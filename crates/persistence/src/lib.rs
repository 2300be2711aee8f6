//! CDM Lookup Persistence Layer
//!
//! Read-only access to an OMOP-CDM clinical-data warehouse: pooled storage
//! sessions, a periodically refreshed reference-data cache and a filter query
//! builder shared by every search and statistics operation.
//!
//! # Features
//!
//! - `sqlite` (default) - SQLite store backed by an `r2d2` connection pool,
//!   with in-memory and file modes
//!
//! # Architecture
//!
//! - [`store`] - [`DataStore`](store::DataStore) and [`Session`](store::Session)
//!   traits plus the SQLite implementation and fixture schema
//! - [`cache`] - [`ReferenceCache`](cache::ReferenceCache) snapshots for the
//!   six reference entities and the [`RefreshScheduler`](cache::scheduler::RefreshScheduler)
//! - [`query`] - [`FilterQueryBuilder`](query::FilterQueryBuilder), predicates,
//!   pagination and the per-entity filter sets
//! - [`projection`] - JSON projections of result rows
//! - [`aggregate`] - category and age-bucket count queries
//! - [`service`] - [`LookupService`](service::LookupService), which runs queries
//!   on checked-out sessions
//! - [`error`] - error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use cdm_lookup_persistence::cache::ReferenceCache;
//! use cdm_lookup_persistence::query::{ConditionFilter, Page};
//! use cdm_lookup_persistence::service::LookupService;
//! use cdm_lookup_persistence::store::sqlite::SqliteStore;
//!
//! let store = Arc::new(SqliteStore::open("cdm.db")?);
//! let cache = Arc::new(ReferenceCache::new());
//! cache.refresh_all(store.as_ref());
//!
//! let service = LookupService::new(store, cache);
//! let filter = ConditionFilter {
//!     condition: Some("Essential hypertension".to_string()),
//!     ..Default::default()
//! };
//! let page = service.search(&filter, Page::default())?;
//! println!("{} conditions", page.items.len());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod projection;
pub mod query;
pub mod service;
pub mod store;

pub use error::{StorageError, StorageResult};
