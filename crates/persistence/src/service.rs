//! Query execution against a [`DataStore`].

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheView, ReferenceCache};
use crate::error::{RowError, StorageResult};
use crate::query::{EntitySearch, Page, SqlFragment};
use crate::store::{DataStore, Row, Session};

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub page: Page,
}

/// Runs searches and counts, one pooled session per call.
pub struct LookupService<D: DataStore> {
    store: Arc<D>,
    cache: Arc<ReferenceCache>,
}

impl<D: DataStore> Clone for LookupService<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<D: DataStore> LookupService<D> {
    pub fn new(store: Arc<D>, cache: Arc<ReferenceCache>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<D> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    /// Runs a filtered, paginated search.
    ///
    /// Filter resolution and projection use the same cache view.
    pub fn search<F: EntitySearch>(
        &self,
        filter: &F,
        page: Page,
    ) -> StorageResult<ResultPage<F::Item>> {
        let view = self.cache.view();
        self.search_with_view(filter, page, &view)
    }

    /// Runs a search against an explicit cache view.
    pub fn search_with_view<F: EntitySearch>(
        &self,
        filter: &F,
        page: Page,
        view: &CacheView,
    ) -> StorageResult<ResultPage<F::Item>> {
        let fragment = filter.build(view, page);
        tracing::debug!(
            entity = %F::ENTITY,
            sql = %fragment.sql,
            params = fragment.params.len(),
            "Running search"
        );

        let rows = self.run(&fragment)?;
        let items = F::project(&rows, view)?;
        Ok(ResultPage { items, page })
    }

    /// Runs a count query and returns its `count` column.
    pub fn count(&self, fragment: &SqlFragment) -> StorageResult<u64> {
        tracing::debug!(sql = %fragment.sql, "Running count");
        let rows = self.run(fragment)?;
        let count = match rows.first() {
            Some(row) => row.i64("count")?,
            None => 0,
        };
        u64::try_from(count).map_err(|_| {
            RowError::UnexpectedType {
                column: "count".to_string(),
                expected: "a non-negative integer",
            }
            .into()
        })
    }

    fn run(&self, fragment: &SqlFragment) -> StorageResult<Vec<Row>> {
        let mut session = self.store.session()?;
        session.query(&fragment.sql, &fragment.params)
    }
}
