//! API Routes
//!
//! Configures the Axum router with all ops endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_key_handler, evict_handler, health_handler, invalidate_handler, key_info_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check with cache flags
/// - `GET /cache/stats` - Memory, keyspace and operation counters
/// - `POST /cache/invalidate` - Delete keys by pattern or category
/// - `POST /cache/evict` - Evict low-priority entries
/// - `GET /cache/keys/:key` - Existence and TTL of one key
/// - `DELETE /cache/keys/:key` - Delete one key
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/cache/evict", post(evict_handler))
        .route(
            "/cache/keys/:key",
            get(key_info_handler).delete(delete_key_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
