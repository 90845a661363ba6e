//! Advocate Cache - a fail-open Redis cache layer for the advocate directory
//!
//! Versioned, parameter-hashed keys, TTL tiers, pattern invalidation and
//! memory-pressure eviction, plus a small ops API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use tasks::spawn_pressure_monitor;
