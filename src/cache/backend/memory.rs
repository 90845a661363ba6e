//! In-process backend with Redis semantics.
//!
//! Expired entries are dropped lazily on access and before every scan. SCAN
//! cursors follow insertion order, so deleting keys mid-scan never makes the
//! walk skip survivors. A non-zero `max_memory` rejects writes that would
//! exceed it, like Redis with `maxmemory-policy noeviction`. The backend can
//! be switched offline to exercise outage handling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::CacheBackend;
use crate::cache::entry::CacheEntry;
use crate::cache::pattern::glob_match;
use crate::cache::stats::format_bytes;
use crate::error::{CacheError, Result};

/// Stored entry plus its insertion sequence, which serves as the SCAN cursor.
#[derive(Debug)]
struct Slot {
    seq: u64,
    entry: CacheEntry,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, Slot>,
    last_seq: u64,
    keyspace_hits: u64,
    keyspace_misses: u64,
    expired_keys: u64,
}

impl MemoryState {
    /// Live entry for `key`, removing it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&CacheEntry> {
        if self.entries.get(key).is_some_and(|slot| slot.entry.is_expired()) {
            self.entries.remove(key);
            self.expired_keys += 1;
        }
        self.entries.get(key).map(|slot| &slot.entry)
    }

    /// Inserts or overwrites; an overwritten key keeps its scan position.
    fn insert(&mut self, key: &str, entry: CacheEntry) {
        if let Some(slot) = self.entries.get_mut(key) {
            slot.entry = entry;
            return;
        }
        self.last_seq += 1;
        let seq = self.last_seq;
        self.entries.insert(key.to_string(), Slot { seq, entry });
    }

    fn purge_expired(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.entry.is_expired());
        self.expired_keys += (before - self.entries.len()) as u64;
    }

    fn used_memory(&self) -> u64 {
        self.entries
            .iter()
            .map(|(key, slot)| slot.entry.footprint(key))
            .sum()
    }
}

/// In-memory [`CacheBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    max_memory: u64,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps total key+value bytes; 0 means unlimited.
    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory = bytes;
        self
    }

    /// Simulates the backend going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable(
                "memory backend is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        let mut state = self.state.lock().await;

        let value = state.live(key).map(|entry| entry.value.clone());
        if value.is_some() {
            state.keyspace_hits += 1;
        } else {
            state.keyspace_misses += 1;
        }
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock().await;

        if self.max_memory > 0 {
            let replaced = state.live(key).map(|e| e.footprint(key)).unwrap_or(0);
            let projected = state.used_memory() - replaced + (key.len() + value.len()) as u64;
            if projected > self.max_memory {
                return Err(CacheError::Backend(
                    "OOM command not allowed when used memory > 'maxmemory'".to_string(),
                ));
            }
        }

        state.insert(key, CacheEntry::new(value.to_string(), Some(ttl_seconds.max(1))));
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        self.check()?;
        let mut state = self.state.lock().await;

        let mut deleted = 0;
        for key in keys {
            if state.live(key).is_some() {
                state.entries.remove(key);
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.check()?;
        let mut state = self.state.lock().await;

        Ok(keys
            .iter()
            .map(|key| state.live(key).map(|entry| entry.value.clone()))
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check()?;
        Ok(self.state.lock().await.live(key).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .await
            .live(key)
            .map(CacheEntry::redis_ttl)
            .unwrap_or(-2))
    }

    async fn ttl_many(&self, keys: &[String]) -> Result<Vec<i64>> {
        self.check()?;
        let mut state = self.state.lock().await;

        Ok(keys
            .iter()
            .map(|key| state.live(key).map(CacheEntry::redis_ttl).unwrap_or(-2))
            .collect())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        self.check()?;
        let mut state = self.state.lock().await;
        state.purge_expired();

        // Cursor 0 starts over; otherwise it is the first sequence not yet visited
        let mut pending: Vec<(u64, &String)> = state
            .entries
            .iter()
            .filter(|(_, slot)| slot.seq >= cursor)
            .map(|(key, slot)| (slot.seq, key))
            .collect();
        pending.sort_unstable();

        let take = count.max(1).min(pending.len());
        let keys = pending[..take]
            .iter()
            .filter(|(_, key)| glob_match(pattern, key))
            .map(|(_, key)| key.to_string())
            .collect();
        let next = if take < pending.len() {
            pending[take - 1].0 + 1
        } else {
            0
        };

        Ok((next, keys))
    }

    async fn info(&self, section: &str) -> Result<String> {
        self.check()?;
        let mut state = self.state.lock().await;
        state.purge_expired();

        let used = state.used_memory();
        let memory = format!(
            concat!(
                "# Memory\r\n",
                "used_memory:{}\r\n",
                "used_memory_human:{}\r\n",
                "maxmemory:{}\r\n",
                "maxmemory_human:{}\r\n",
            ),
            used,
            format_bytes(used),
            self.max_memory,
            format_bytes(self.max_memory),
        );
        let stats = format!(
            concat!(
                "# Stats\r\n",
                "keyspace_hits:{}\r\n",
                "keyspace_misses:{}\r\n",
                "expired_keys:{}\r\n",
                "evicted_keys:0\r\n",
            ),
            state.keyspace_hits, state.keyspace_misses, state.expired_keys,
        );

        Ok(match section.to_lowercase().as_str() {
            "memory" => memory,
            "stats" => stats,
            _ => format!("{}\r\n{}", memory, stats),
        })
    }

    async fn dbsize(&self) -> Result<u64> {
        self.check()?;
        let mut state = self.state.lock().await;
        state.purge_expired();
        Ok(state.entries.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}
