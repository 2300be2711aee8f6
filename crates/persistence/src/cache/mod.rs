//! Reference-data cache.
//!
//! Holds one [`Snapshot`] per [`ReferenceEntity`]. A refresh builds a complete
//! new snapshot from the warehouse and publishes it by swapping a pointer, so a
//! reader sees either the old or the new snapshot and never a mixture. A
//! refresh that fails leaves the previous snapshot in place.
//!
//! ```
//! use cdm_lookup_persistence::cache::{ReferenceCache, ReferenceEntity};
//!
//! let cache = ReferenceCache::new();
//! assert_eq!(cache.resolve(ReferenceEntity::Gender, "MALE"), None);
//! assert!(cache.labels(ReferenceEntity::Ethnicity).is_empty());
//! ```

mod entity;
mod snapshot;

pub mod scheduler;

use std::sync::Arc;

use parking_lot::RwLock;

pub use entity::ReferenceEntity;
pub use scheduler::{DEFAULT_REFRESH_INTERVAL, RefreshScheduler};
pub use snapshot::{CodeMapping, LabelSet, Snapshot};

use crate::error::{RowError, StorageError, StorageResult};
use crate::query::SqlParam;
use crate::store::{DataStore, Session};

/// Current snapshots for all reference entities.
#[derive(Debug)]
pub struct ReferenceCache {
    slots: [RwLock<Snapshot>; 6],
}

impl ReferenceCache {
    /// Creates a cache with empty snapshots.
    pub fn new() -> Self {
        Self {
            slots: ReferenceEntity::ALL.map(|entity| RwLock::new(empty_snapshot(entity))),
        }
    }

    /// Returns the current snapshot for an entity.
    pub fn snapshot(&self, entity: ReferenceEntity) -> Snapshot {
        self.slots[entity.index()].read().clone()
    }

    /// Captures the current snapshots of all entities.
    ///
    /// A request works against one view so that filter resolution and row
    /// projection agree even if a refresh publishes in between.
    pub fn view(&self) -> CacheView {
        CacheView {
            snapshots: ReferenceEntity::ALL.map(|entity| self.snapshot(entity)),
        }
    }

    /// Replaces the snapshot for an entity.
    ///
    /// Coded entities only accept [`Snapshot::Codes`] and Ethnicity only
    /// accepts [`Snapshot::Labels`]; a mismatched snapshot is ignored.
    pub fn publish(&self, entity: ReferenceEntity, snapshot: Snapshot) {
        let matches_kind = matches!(
            (&snapshot, entity.has_codes()),
            (Snapshot::Codes(_), true) | (Snapshot::Labels(_), false)
        );
        if !matches_kind {
            tracing::warn!(entity = %entity, "Ignoring snapshot of the wrong kind");
            return;
        }
        *self.slots[entity.index()].write() = snapshot;
    }

    /// Looks up the code for a label.
    pub fn resolve(&self, entity: ReferenceEntity, label: &str) -> Option<i64> {
        self.snapshot(entity).resolve(label)
    }

    /// Looks up the label for a code.
    pub fn reverse_resolve(&self, entity: ReferenceEntity, code: i64) -> Option<String> {
        self.snapshot(entity).reverse_resolve(code).map(str::to_string)
    }

    /// Returns the sorted label list for an entity.
    pub fn labels(&self, entity: ReferenceEntity) -> Vec<String> {
        self.snapshot(entity).labels()
    }

    /// Reloads one entity from the store and publishes the result.
    ///
    /// Returns the number of labels in the new snapshot. On error nothing is
    /// published.
    pub fn refresh<D: DataStore>(&self, store: &D, entity: ReferenceEntity) -> StorageResult<usize> {
        let mut session = store.session()?;
        let query = entity.refresh_query();

        let snapshot = match entity.domain_tag() {
            Some(tag) => {
                let rows = session.query(&query, &[SqlParam::string(tag)])?;
                let pairs = rows
                    .iter()
                    .map(|row| Ok((row.i64("code")?, row.str("label")?.to_string())))
                    .collect::<Result<Vec<_>, RowError>>()?;
                Snapshot::Codes(Arc::new(CodeMapping::from_pairs(pairs)))
            }
            None => {
                let rows = session.query(&query, &[])?;
                let labels = rows
                    .iter()
                    .filter_map(|row| row.opt_str("label").transpose())
                    .map(|label| label.map(str::to_string))
                    .collect::<Result<LabelSet, RowError>>()?;
                Snapshot::Labels(Arc::new(labels))
            }
        };

        let count = snapshot.len();
        self.publish(entity, snapshot);
        tracing::debug!(entity = %entity, count, "Reference snapshot published");
        Ok(count)
    }

    /// Refreshes every entity in declaration order.
    ///
    /// A failing entity keeps its previous snapshot and does not stop the
    /// remaining ones.
    pub fn refresh_all<D: DataStore>(&self, store: &D) -> RefreshReport {
        let outcomes = ReferenceEntity::ALL
            .iter()
            .map(|&entity| {
                let result = self.refresh(store, entity);
                if let Err(err) = &result {
                    tracing::warn!(
                        entity = %entity,
                        error = %err,
                        "Reference refresh failed, keeping previous snapshot"
                    );
                }
                RefreshOutcome { entity, result }
            })
            .collect();
        RefreshReport { outcomes }
    }
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_snapshot(entity: ReferenceEntity) -> Snapshot {
    if entity.has_codes() {
        Snapshot::Codes(Arc::new(CodeMapping::new()))
    } else {
        Snapshot::Labels(Arc::new(LabelSet::new()))
    }
}

/// Snapshots of all entities captured at one moment.
#[derive(Debug, Clone)]
pub struct CacheView {
    snapshots: [Snapshot; 6],
}

impl CacheView {
    /// Returns the snapshot for an entity.
    pub fn get(&self, entity: ReferenceEntity) -> &Snapshot {
        &self.snapshots[entity.index()]
    }
}

/// Result of refreshing one entity.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub entity: ReferenceEntity,
    pub result: Result<usize, StorageError>,
}

/// Per-entity results of [`ReferenceCache::refresh_all`].
#[derive(Debug)]
pub struct RefreshReport {
    pub outcomes: Vec<RefreshOutcome>,
}

impl RefreshReport {
    /// Returns true when every entity refreshed.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    /// Returns the entities that failed to refresh.
    pub fn failed(&self) -> Vec<ReferenceEntity> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .map(|outcome| outcome.entity)
            .collect()
    }
}
