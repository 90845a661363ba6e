//! Memory Pressure Monitor
//!
//! Background task that periodically checks cache memory and evicts
//! low-priority entries when usage crosses the threshold.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheAnalytics;

/// Spawns a background task that relieves memory pressure on an interval.
///
/// Each tick asks `analytics` whether memory use is at or above
/// `threshold_percent` and, if so, evicts low-priority entries. Backend
/// failures only mean a tick does nothing.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let monitor = spawn_pressure_monitor(analytics.clone(), 60, 80.0);
/// // Later, during shutdown:
/// monitor.abort();
/// ```
pub fn spawn_pressure_monitor(
    analytics: Arc<CacheAnalytics>,
    interval_secs: u64,
    threshold_percent: f64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            threshold_percent, "Starting cache pressure monitor"
        );

        loop {
            tokio::time::sleep(interval).await;

            let evicted = analytics.relieve_pressure(threshold_percent).await;
            if evicted > 0 {
                info!(evicted, "Pressure monitor evicted cache entries");
            } else {
                debug!("Pressure monitor: nothing to evict");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{
        CacheBackend, CacheCategory, CacheClient, CacheStore, ClientOptions, KeyBuilder,
        MemoryBackend, StoreOptions,
    };

    fn analytics_over(backend: Arc<MemoryBackend>) -> Arc<CacheAnalytics> {
        let backend: Arc<dyn CacheBackend> = backend;
        let client = Arc::new(CacheClient::with_backend(backend, ClientOptions::default()));
        let store = Arc::new(CacheStore::new(client, StoreOptions::default()));
        Arc::new(CacheAnalytics::new(store, KeyBuilder::new("ns", "v1")))
    }

    async fn fill(backend: &MemoryBackend, count: usize) {
        let keys = KeyBuilder::new("ns", "v1");
        for i in 0..count {
            backend
                .set_ex(&keys.for_id(CacheCategory::Search, i), "[1,2,3]", 60 + i as u64)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_monitor_evicts_under_pressure() {
        // 8 entries of 21 bytes against a 1000 byte ceiling: 16.8% used
        let backend = Arc::new(MemoryBackend::new().with_max_memory(1000));
        fill(&backend, 8).await;

        let handle = spawn_pressure_monitor(analytics_over(backend.clone()), 1, 10.0);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.abort();

        assert_eq!(backend.len().await, 6);
    }

    #[tokio::test]
    async fn test_monitor_leaves_cache_below_threshold() {
        let backend = Arc::new(MemoryBackend::new().with_max_memory(1000));
        fill(&backend, 8).await;

        let handle = spawn_pressure_monitor(analytics_over(backend.clone()), 1, 50.0);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.abort();

        assert_eq!(backend.len().await, 8);
    }

    #[tokio::test]
    async fn test_monitor_can_be_aborted() {
        let analytics = analytics_over(Arc::new(MemoryBackend::new()));
        let handle = spawn_pressure_monitor(analytics, 1, 80.0);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
