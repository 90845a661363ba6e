//! Cache Store Module
//!
//! Typed, fail-open operations over the shared backend. Every call is bounded
//! by a timeout and every failure turns into a miss, `false` or a zero count;
//! callers only ever lose performance, never correctness.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::backend::CacheBackend;
use super::client::CacheClient;
use super::stats::{OperationCounters, OperationStats};
use crate::error::{CacheError, Result};

/// Tuning for a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Timeout applied to every backend call
    pub op_timeout: Duration,
    /// `COUNT` hint passed to each SCAN step
    pub scan_batch_size: usize,
    /// SCAN round-trips allowed per invalidation before giving up
    pub max_scan_iterations: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_millis(1000),
            scan_batch_size: 100,
            max_scan_iterations: 1000,
        }
    }
}

// == Cache Store ==
/// Fail-open JSON cache over a [`CacheClient`].
#[derive(Debug)]
pub struct CacheStore {
    client: Arc<CacheClient>,
    options: StoreOptions,
    counters: OperationCounters,
}

impl CacheStore {
    // == Constructor ==
    pub fn new(client: Arc<CacheClient>, options: StoreOptions) -> Self {
        Self {
            client,
            options,
            counters: OperationCounters::new(),
        }
    }

    pub fn client(&self) -> &Arc<CacheClient> {
        &self.client
    }

    // == Get ==
    /// Cached value for `key`; `None` on miss, undecodable entry, or backend trouble.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let Some(raw) = self.call("get", |b| async move { b.get(key).await }).await.flatten() else {
            self.counters.record_miss();
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.counters.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                self.counters.record_miss();
                self.counters.record_error();
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` as JSON for `ttl_seconds` (at least one second).
    ///
    /// Returns whether the value was stored.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_seconds: u64) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Cannot serialize value for cache");
                self.counters.record_error();
                self.counters.record_set(false);
                return false;
            }
        };

        let ttl = ttl_seconds.max(1);
        let stored = self
            .call("set", |b| {
                let raw = &raw;
                async move { b.set_ex(key, raw, ttl).await }
            })
            .await
            .is_some();

        self.counters.record_set(stored);
        stored
    }

    // == Delete ==
    /// Deletes `key`, returning how many keys were removed (0 or 1).
    pub async fn delete(&self, key: &str) -> u64 {
        self.delete_many(&[key.to_string()]).await
    }

    /// Deletes `keys` in one pipelined call.
    pub async fn delete_many(&self, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        let deleted = self
            .call("delete", |b| async move { b.del(keys).await })
            .await
            .unwrap_or(0);
        self.counters.record_deletes(deleted);
        deleted
    }

    // == Invalidate Pattern ==
    /// Deletes every key matching the glob `pattern`.
    ///
    /// Walks the keyspace with SCAN and deletes each batch as it arrives. Stops
    /// early, keeping what was already deleted, when a call fails or the
    /// iteration cap is reached; remaining entries still expire through TTL.
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let mut cursor = 0u64;
        let mut deleted = 0u64;
        let mut iterations = 0usize;

        loop {
            if iterations >= self.options.max_scan_iterations {
                warn!(
                    pattern,
                    iterations,
                    deleted,
                    "Pattern invalidation hit the iteration cap, stopping early"
                );
                break;
            }
            iterations += 1;

            let count = self.options.scan_batch_size;
            let Some((next, keys)) = self
                .call("scan", |b| async move { b.scan(cursor, pattern, count).await })
                .await
            else {
                warn!(pattern, deleted, "Pattern invalidation aborted");
                break;
            };

            if !keys.is_empty() {
                let Some(removed) = self.call("delete", |b| {
                    let keys = &keys;
                    async move { b.del(keys).await }
                })
                .await
                else {
                    warn!(pattern, deleted, "Pattern invalidation aborted");
                    break;
                };
                deleted += removed;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        self.counters.record_deletes(deleted);
        if deleted > 0 {
            info!(pattern, deleted, "Invalidated cache entries");
        } else {
            debug!(pattern, "No cache entries matched");
        }
        deleted
    }

    // == Get Multiple ==
    /// Values for `keys` in one round-trip; every key maps to `None` on failure.
    pub async fn get_multiple<T: DeserializeOwned>(
        &self,
        keys: &[String],
    ) -> HashMap<String, Option<T>> {
        if keys.is_empty() {
            return HashMap::new();
        }

        let raw = self
            .call("mget", |b| async move { b.mget(keys).await })
            .await
            .filter(|values| values.len() == keys.len())
            .unwrap_or_else(|| vec![None; keys.len()]);

        keys.iter()
            .zip(raw)
            .map(|(key, raw)| {
                let value = raw.and_then(|raw| match serde_json::from_str(&raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                        self.counters.record_error();
                        None
                    }
                });
                if value.is_some() {
                    self.counters.record_hit();
                } else {
                    self.counters.record_miss();
                }
                (key.clone(), value)
            })
            .collect()
    }

    // == Exists / TTL ==
    pub async fn exists(&self, key: &str) -> bool {
        self.call("exists", |b| async move { b.exists(key).await })
            .await
            .unwrap_or(false)
    }

    /// Remaining seconds; `-1` without expiry, `-2` when absent or unavailable.
    pub async fn ttl(&self, key: &str) -> i64 {
        self.call("ttl", |b| async move { b.ttl(key).await })
            .await
            .unwrap_or(-2)
    }

    // == Cache Aside ==
    /// Cached value for `key`, or the result of `compute` stored for `ttl_seconds`.
    ///
    /// Only `compute` errors reach the caller.
    pub async fn get_or_set_with<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, &value, ttl_seconds).await;
        Ok(value)
    }

    // == Introspection ==
    /// Every key matching `pattern`, bounded by the iteration cap; `None` on failure.
    pub(crate) async fn scan_keys(&self, pattern: &str) -> Option<Vec<String>> {
        let mut cursor = 0u64;
        let mut found = Vec::new();

        for _ in 0..self.options.max_scan_iterations {
            let count = self.options.scan_batch_size;
            let (next, keys) = self
                .call("scan", |b| async move { b.scan(cursor, pattern, count).await })
                .await?;
            found.extend(keys);
            cursor = next;
            if cursor == 0 {
                return Some(found);
            }
        }

        warn!(pattern, found = found.len(), "Key scan hit the iteration cap");
        Some(found)
    }

    pub(crate) async fn ttl_many(&self, keys: &[String]) -> Option<Vec<i64>> {
        if keys.is_empty() {
            return Some(Vec::new());
        }
        self.call("ttl_many", |b| async move { b.ttl_many(keys).await })
            .await
    }

    pub(crate) async fn info(&self, section: &str) -> Option<String> {
        self.call("info", |b| async move { b.info(section).await })
            .await
    }

    pub(crate) async fn dbsize(&self) -> Option<u64> {
        self.call("dbsize", |b| async move { b.dbsize().await })
            .await
    }

    // == Stats ==
    /// Counters for calls made through this store.
    pub fn operation_stats(&self) -> OperationStats {
        self.counters.snapshot()
    }

    /// Runs one backend call under the timeout, absorbing any failure.
    ///
    /// Connection trouble marks the client unavailable; a success marks it
    /// available again.
    async fn call<T, F, Fut>(&self, op: &'static str, f: F) -> Option<T>
    where
        F: FnOnce(Arc<dyn CacheBackend>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let backend = self.client.backend().await?;
        let timeout = self.options.op_timeout;

        let outcome = match tokio::time::timeout(timeout, f(backend)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(timeout)),
        };

        match outcome {
            Ok(value) => {
                self.client.mark_available();
                Some(value)
            }
            Err(e) => {
                self.counters.record_error();
                if e.is_unavailable() {
                    self.client.mark_unavailable(&e);
                } else {
                    warn!(op, error = %e, "Cache operation failed");
                }
                None
            }
        }
    }
}
