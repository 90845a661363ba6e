//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{ClientOptions, KeyBuilder, StoreOptions};

/// Deployment environment, used to gate operator-only endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend connection string; `None` disables caching
    pub redis_url: Option<String>,
    /// Key namespace
    pub namespace: String,
    /// Key version token
    pub key_version: String,
    /// Hex characters kept from the parameter digest
    pub key_digest_len: usize,
    /// Per-call backend timeout in milliseconds
    pub op_timeout_ms: u64,
    /// SCAN COUNT hint
    pub scan_batch_size: usize,
    /// Cap on SCAN round-trips during pattern invalidation
    pub max_scan_iterations: usize,
    /// Seconds to wait before probing an unavailable backend again
    pub retry_cooldown_secs: u64,
    /// Memory usage percent considered high
    pub memory_threshold_percent: f64,
    /// Pressure monitor period in seconds, 0 disables it
    pub pressure_check_interval: u64,
    /// Ops API port
    pub server_port: u16,
    /// Deployment environment
    pub environment: Environment,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Backend connection string (default: unset, caching disabled)
    /// - `CACHE_NAMESPACE` - Key namespace (default: advocates)
    /// - `CACHE_VERSION` - Key version token (default: v1)
    /// - `CACHE_KEY_DIGEST_LEN` - Digest hex length (default: 8)
    /// - `CACHE_OP_TIMEOUT_MS` - Per-call timeout (default: 1000)
    /// - `CACHE_SCAN_BATCH_SIZE` - SCAN COUNT (default: 100)
    /// - `CACHE_MAX_SCAN_ITERATIONS` - Invalidation cap (default: 1000)
    /// - `CACHE_RETRY_COOLDOWN_SECS` - Reconnect cooldown (default: 30)
    /// - `CACHE_MEMORY_THRESHOLD_PERCENT` - Pressure threshold (default: 80)
    /// - `CACHE_PRESSURE_CHECK_INTERVAL_SECS` - Monitor period (default: 0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `APP_ENV` - development, test or production (default: development)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            namespace: env::var("CACHE_NAMESPACE").unwrap_or(defaults.namespace),
            key_version: env::var("CACHE_VERSION").unwrap_or(defaults.key_version),
            key_digest_len: env_or("CACHE_KEY_DIGEST_LEN", defaults.key_digest_len),
            op_timeout_ms: env_or("CACHE_OP_TIMEOUT_MS", defaults.op_timeout_ms),
            scan_batch_size: env_or("CACHE_SCAN_BATCH_SIZE", defaults.scan_batch_size),
            max_scan_iterations: env_or("CACHE_MAX_SCAN_ITERATIONS", defaults.max_scan_iterations),
            retry_cooldown_secs: env_or("CACHE_RETRY_COOLDOWN_SECS", defaults.retry_cooldown_secs),
            memory_threshold_percent: env_or(
                "CACHE_MEMORY_THRESHOLD_PERCENT",
                defaults.memory_threshold_percent,
            ),
            pressure_check_interval: env_or(
                "CACHE_PRESSURE_CHECK_INTERVAL_SECS",
                defaults.pressure_check_interval,
            ),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            environment: env_or("APP_ENV", defaults.environment),
        }
    }

    /// Key builder for the configured namespace and version.
    pub fn key_builder(&self) -> KeyBuilder {
        KeyBuilder::new(&self.namespace, &self.key_version).with_digest_len(self.key_digest_len)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_millis(self.op_timeout_ms.max(1)),
            retry_cooldown: Duration::from_secs(self.retry_cooldown_secs),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            op_timeout: Duration::from_millis(self.op_timeout_ms.max(1)),
            scan_batch_size: self.scan_batch_size.max(1),
            max_scan_iterations: self.max_scan_iterations.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            namespace: "advocates".to_string(),
            key_version: "v1".to_string(),
            key_digest_len: 8,
            op_timeout_ms: 1000,
            scan_batch_size: 100,
            max_scan_iterations: 1000,
            retry_cooldown_secs: 30,
            memory_threshold_percent: 80.0,
            pressure_check_interval: 0,
            server_port: 3000,
            environment: Environment::Development,
        }
    }
}

/// Parses an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.redis_url.is_none());
        assert_eq!(config.namespace, "advocates");
        assert_eq!(config.key_version, "v1");
        assert_eq!(config.key_digest_len, 8);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.pressure_check_interval, 0);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("REDIS_URL");
        env::remove_var("CACHE_NAMESPACE");
        env::remove_var("CACHE_OP_TIMEOUT_MS");
        env::remove_var("APP_ENV");

        let config = Config::from_env();
        assert!(config.redis_url.is_none());
        assert_eq!(config.namespace, "advocates");
        assert_eq!(config.op_timeout_ms, 1000);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("Production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_store_options_never_zero() {
        let config = Config {
            scan_batch_size: 0,
            max_scan_iterations: 0,
            op_timeout_ms: 0,
            ..Config::default()
        };
        let options = config.store_options();
        assert_eq!(options.scan_batch_size, 1);
        assert_eq!(options.max_scan_iterations, 1);
        assert!(options.op_timeout > Duration::ZERO);
    }

    #[test]
    fn test_key_builder_uses_namespace_and_version() {
        let config = Config {
            namespace: "ns".to_string(),
            key_version: "v2".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.key_builder().version_pattern(),
            "ns:v2:*"
        );
    }
}
