//! Cache backends.
//!
//! The store talks to a [`CacheBackend`]; Redis in production, the in-memory
//! backend for local development and tests. Backends report every failure as
//! an error and leave degradation to the store.

mod memory;
mod redis;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

/// Key/value operations the cache store needs, with Redis semantics.
#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    /// Raw value for `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` with an expiry of `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Deletes `keys` in one pipelined round-trip, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Values for `keys`, in order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining seconds; `-1` without expiry, `-2` when absent.
    async fn ttl(&self, key: &str) -> Result<i64>;

    /// [`CacheBackend::ttl`] for many keys in one pipelined round-trip.
    async fn ttl_many(&self, keys: &[String]) -> Result<Vec<i64>>;

    /// One `SCAN cursor MATCH pattern COUNT count` step.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)>;

    /// Raw `INFO section` report.
    async fn info(&self, section: &str) -> Result<String>;

    /// Number of keys in the database.
    async fn dbsize(&self) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}
