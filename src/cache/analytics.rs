//! Memory analytics and pressure eviction.
//!
//! Stats come from the backend's `INFO` report. Eviction is cooperative and
//! best-effort: it removes the quarter of unprotected keys closest to expiry,
//! and only runs when someone asks (the pressure monitor task, an operator, a
//! bulk warm-up).

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::keys::KeyBuilder;
use super::stats::{format_bytes, CacheStats};
use super::store::CacheStore;

static INFO_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([a-z0-9_]+):([^\r\n]*)\r?$").expect("INFO line regex is valid")
});

/// Parses every `field:value` line of an `INFO` report.
pub fn parse_info(report: &str) -> HashMap<String, String> {
    INFO_LINE
        .captures_iter(report)
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
        .collect()
}

/// How many of `eligible` keys one eviction pass removes: a quarter, rounded up.
pub fn eviction_quota(eligible: usize) -> usize {
    eligible.div_ceil(4)
}

/// Orders `keys` for eviction, soonest to expire first.
///
/// `ttls` follows Redis `TTL` conventions: keys without expiry (`-1`) go last,
/// keys that are already gone (`-2`) are dropped.
pub fn rank_for_eviction(keys: Vec<String>, ttls: &[i64]) -> Vec<String> {
    let mut ranked: Vec<(i64, String)> = keys
        .into_iter()
        .zip(ttls.iter().copied())
        .filter(|(_, ttl)| *ttl != -2)
        .map(|(key, ttl)| (if ttl < 0 { i64::MAX } else { ttl }, key))
        .collect();
    ranked.sort();
    ranked.into_iter().map(|(_, key)| key).collect()
}

/// Memory introspection and low-priority eviction over a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheAnalytics {
    store: Arc<CacheStore>,
    keys: KeyBuilder,
}

impl CacheAnalytics {
    pub fn new(store: Arc<CacheStore>, keys: KeyBuilder) -> Self {
        Self { store, keys }
    }

    /// Current memory and keyspace figures; all zero when the backend cannot be read.
    pub async fn get_stats(&self) -> CacheStats {
        let (memory, stats, key_count) = tokio::join!(
            self.store.info("memory"),
            self.store.info("stats"),
            self.store.dbsize(),
        );

        let Some(memory) = memory else {
            debug!("Cache stats unavailable, reporting zeroes");
            return CacheStats::default();
        };

        let mut fields = parse_info(&memory);
        if let Some(stats) = stats {
            fields.extend(parse_info(&stats));
        }
        let number = |name: &str| -> u64 {
            fields
                .get(name)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };

        let used_memory = number("used_memory");
        let max_memory = number("maxmemory");
        let memory_usage_percent = if max_memory > 0 {
            used_memory as f64 / max_memory as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            used_memory,
            used_memory_human: fields
                .get("used_memory_human")
                .cloned()
                .unwrap_or_else(|| format_bytes(used_memory)),
            max_memory,
            memory_usage_percent,
            key_count: key_count.unwrap_or(0),
            keyspace_hits: number("keyspace_hits"),
            keyspace_misses: number("keyspace_misses"),
            evicted_keys: number("evicted_keys"),
            connected: true,
        }
    }

    /// Whether memory use has reached `threshold_percent` of the ceiling.
    ///
    /// Always false without a ceiling (`maxmemory` 0) or without stats.
    pub async fn is_memory_high(&self, threshold_percent: f64) -> bool {
        let stats = self.get_stats().await;
        stats.max_memory > 0 && stats.memory_usage_percent >= threshold_percent
    }

    /// Deletes the quarter of unprotected namespace keys closest to expiry.
    ///
    /// Protected categories are never candidates. Returns how many keys were
    /// deleted; 0 when the backend cannot be read.
    pub async fn evict_low_priority(&self) -> u64 {
        let pattern = self.keys.namespace_pattern();
        let Some(scanned) = self.store.scan_keys(&pattern).await else {
            return 0;
        };
        let scanned_count = scanned.len();

        let candidates: Vec<String> = scanned
            .into_iter()
            .filter(|key| !self.keys.is_protected(key))
            .collect();
        if candidates.is_empty() {
            debug!(scanned = scanned_count, "No low-priority keys to evict");
            return 0;
        }

        let Some(ttls) = self.store.ttl_many(&candidates).await else {
            return 0;
        };
        let ranked = rank_for_eviction(candidates, &ttls);
        let quota = eviction_quota(ranked.len());
        let victims: Vec<String> = ranked.into_iter().take(quota).collect();

        let evicted = self.store.delete_many(&victims).await;
        info!(
            scanned = scanned_count,
            planned = victims.len(),
            evicted,
            "Evicted low-priority cache entries"
        );
        evicted
    }

    /// Runs [`CacheAnalytics::evict_low_priority`] only when memory is high.
    pub async fn relieve_pressure(&self, threshold_percent: f64) -> u64 {
        if !self.is_memory_high(threshold_percent).await {
            return 0;
        }

        warn!(threshold_percent, "Cache memory above threshold, evicting");
        self.evict_low_priority().await
    }
}
