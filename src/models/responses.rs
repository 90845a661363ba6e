//! Response DTOs for the ops API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, OperationStats};

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy"; a broken cache only degrades performance
    pub status: String,
    pub cache_enabled: bool,
    pub cache_available: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(cache_enabled: bool, cache_available: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            cache_enabled,
            cache_available,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for `GET /cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Backend memory and keyspace
    pub stats: CacheStats,
    /// Calls made through this process
    pub operations: OperationStats,
    /// Backend hit rate
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(stats: CacheStats, operations: OperationStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
            operations,
        }
    }
}

/// Response body for `POST /cache/invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub pattern: String,
    pub deleted: u64,
}

/// Response body for `POST /cache/evict`
#[derive(Debug, Clone, Serialize)]
pub struct EvictResponse {
    pub evicted: u64,
}

/// Response body for `GET /cache/keys/:key`
#[derive(Debug, Clone, Serialize)]
pub struct KeyInfoResponse {
    pub key: String,
    pub exists: bool,
    /// Seconds left; -1 without expiry, -2 when absent
    pub ttl: i64,
}

/// Response body for `DELETE /cache/keys/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            keyspace_hits: 80,
            keyspace_misses: 20,
            ..CacheStats::default()
        };
        let resp = StatsResponse::new(stats, OperationStats::default());
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(true, false);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["cache_enabled"], true);
        assert_eq!(json["cache_available"], false);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_key_info_serialize() {
        let resp = KeyInfoResponse {
            key: "ns:v1:advocate:1".to_string(),
            exists: false,
            ttl: -2,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"ttl\":-2"));
    }
}
