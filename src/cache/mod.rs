//! Cache Module
//!
//! Versioned key derivation, a fail-open store over a pluggable backend, and
//! memory analytics with pressure eviction.

mod analytics;
pub mod backend;
mod client;
mod entry;
mod keys;
mod pattern;
mod stats;
mod store;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use analytics::{eviction_quota, parse_info, rank_for_eviction, CacheAnalytics};
pub use backend::{CacheBackend, MemoryBackend, RedisBackend};
pub use client::{CacheClient, ClientOptions};
pub use entry::CacheEntry;
pub use keys::{canonical_json, CacheCategory, KeyBuilder};
pub use pattern::glob_match;
pub use stats::{CacheStats, OperationCounters, OperationStats};
pub use store::{CacheStore, StoreOptions};
pub use ttl::CacheTtl;
