//! API Handlers
//!
//! HTTP request handlers for each ops endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::{CacheAnalytics, CacheClient, CacheStore, KeyBuilder};
use crate::config::{Config, Environment};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, EvictResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
    KeyInfoResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The store and analytics share one client; nothing here needs a lock
/// because the client guards its own connection.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<CacheStore>,
    pub analytics: Arc<CacheAnalytics>,
    pub keys: KeyBuilder,
    pub environment: Environment,
}

impl AppState {
    /// Creates a new AppState around an existing store.
    pub fn new(store: Arc<CacheStore>, keys: KeyBuilder, environment: Environment) -> Self {
        let analytics = Arc::new(CacheAnalytics::new(store.clone(), keys.clone()));
        Self {
            store,
            analytics,
            keys,
            environment,
        }
    }

    /// Creates a new AppState from configuration and connects eagerly.
    ///
    /// A backend that cannot be reached leaves the state usable; the cache
    /// stays in its degraded mode until the retry cooldown lets a probe through.
    pub async fn from_config(config: &Config) -> Self {
        let client = Arc::new(CacheClient::new(
            config.redis_url.clone(),
            config.client_options(),
        ));
        client.initialize().await;

        let store = Arc::new(CacheStore::new(client, config.store_options()));
        Self::new(store, config.key_builder(), config.environment)
    }

    pub fn client(&self) -> &Arc<CacheClient> {
        self.store.client()
    }

    fn check_key(&self, key: &str) -> Result<()> {
        if self.keys.owns_pattern(key) {
            Ok(())
        } else {
            Err(CacheError::InvalidRequest(format!(
                "Key must start with '{}:'",
                self.keys.namespace()
            )))
        }
    }
}

/// Handler for GET /health
///
/// The service stays healthy while the cache is down; the flags report it.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let client = state.client();
    let enabled = client.is_enabled().await;
    Json(HealthResponse::healthy(enabled, enabled && client.is_available()))
}

/// Handler for GET /cache/stats
///
/// Not exposed in production.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    if state.environment.is_production() {
        return Err(CacheError::NotFound("Not found".to_string()));
    }

    let stats = state.analytics.get_stats().await;
    Ok(Json(StatsResponse::new(
        stats,
        state.store.operation_stats(),
    )))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let pattern = req.resolve(&state.keys)?;
    let deleted = state.store.invalidate_pattern(&pattern).await;

    info!(pattern = %pattern, deleted, "Invalidation requested");
    Ok(Json(InvalidateResponse { pattern, deleted }))
}

/// Handler for POST /cache/evict
///
/// Evicts low-priority entries regardless of the current memory level.
pub async fn evict_handler(State(state): State<AppState>) -> Json<EvictResponse> {
    let evicted = state.analytics.evict_low_priority().await;
    Json(EvictResponse { evicted })
}

/// Handler for GET /cache/keys/:key
pub async fn key_info_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<KeyInfoResponse>> {
    state.check_key(&key)?;

    let (exists, ttl) = tokio::join!(state.store.exists(&key), state.store.ttl(&key));
    Ok(Json(KeyInfoResponse { key, exists, ttl }))
}

/// Handler for DELETE /cache/keys/:key
pub async fn delete_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.check_key(&key)?;

    let deleted = state.store.delete(&key).await;
    Ok(Json(DeleteResponse { key, deleted }))
}
