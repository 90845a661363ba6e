//! API Module
//!
//! HTTP handlers and routing for the cache ops API.
//!
//! # Endpoints
//! - `GET /health` - Health check with cache flags
//! - `GET /cache/stats` - Cache statistics (hidden in production)
//! - `POST /cache/invalidate` - Pattern or category invalidation
//! - `POST /cache/evict` - Low-priority eviction
//! - `GET /cache/keys/:key` - Key existence and TTL
//! - `DELETE /cache/keys/:key` - Delete a key

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
