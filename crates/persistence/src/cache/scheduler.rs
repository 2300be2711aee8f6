//! Periodic reference-cache refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{RefreshReport, ReferenceCache};
use crate::store::DataStore;

/// Default refresh period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Drives [`ReferenceCache::refresh_all`] on a fixed interval.
pub struct RefreshScheduler<D: DataStore> {
    store: Arc<D>,
    cache: Arc<ReferenceCache>,
    interval: Duration,
}

impl<D: DataStore + 'static> RefreshScheduler<D> {
    /// Creates a scheduler.
    pub fn new(store: Arc<D>, cache: Arc<ReferenceCache>, interval: Duration) -> Self {
        Self {
            store,
            cache,
            interval,
        }
    }

    /// Refreshes every entity once on the calling thread.
    ///
    /// Used at startup before the service accepts traffic.
    pub fn run_once(&self) -> RefreshReport {
        let report = self.cache.refresh_all(self.store.as_ref());
        log_report(&report);
        report
    }

    /// Spawns the periodic refresh loop.
    ///
    /// The first tick fires one interval from now. Each cycle runs on the
    /// blocking pool so request workers are never held up by a refresh.
    /// Abort the returned handle to stop the loop.
    pub fn spawn(self) -> JoinHandle<()> {
        let period = self.interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let store = Arc::clone(&self.store);
                let cache = Arc::clone(&self.cache);
                match tokio::task::spawn_blocking(move || cache.refresh_all(store.as_ref())).await {
                    Ok(report) => log_report(&report),
                    Err(err) => tracing::warn!(error = %err, "Reference refresh task failed"),
                }
            }
        })
    }
}

fn log_report(report: &RefreshReport) {
    if report.is_complete() {
        tracing::info!(entities = report.outcomes.len(), "Reference cache refreshed");
    } else {
        let failed: Vec<&str> = report.failed().iter().map(|e| e.as_str()).collect();
        tracing::warn!(failed = ?failed, "Reference cache partially refreshed");
    }
}
