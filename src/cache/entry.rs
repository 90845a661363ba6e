//! Cache Entry Module
//!
//! Entry held by the in-memory backend: a serialized value plus its expiry.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A stored value with optional expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The serialized value
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    pub fn new(value: String, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl_seconds.map(|ttl| now + (ttl * 1000));

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiry.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining TTL in milliseconds, `None` without expiry, `Some(0)` once elapsed.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Remaining TTL using Redis `TTL` conventions: seconds rounded up, `-1`
    /// without expiry.
    pub fn redis_ttl(&self) -> i64 {
        match self.ttl_remaining_ms() {
            Some(ms) => ms.div_ceil(1000) as i64,
            None => -1,
        }
    }

    /// Approximate memory footprint of this entry under `key`.
    pub fn footprint(&self, key: &str) -> u64 {
        (key.len() + self.value.len()) as u64
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
