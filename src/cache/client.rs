//! Shared backend handle with an explicit lifecycle.
//!
//! The client is built once and injected wherever the cache is used. It
//! connects lazily (or eagerly through [`CacheClient::initialize`]), keeps an
//! availability flag that the store flips on connection failures, and stops
//! handing out the backend after [`CacheClient::shutdown`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::backend::{CacheBackend, MemoryBackend, RedisBackend};
use super::entry::current_timestamp_ms;
use crate::error::{CacheError, Result};

const MEMORY_SCHEME: &str = "memory://";

/// Connection behaviour of a [`CacheClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Upper bound on establishing a connection
    pub connect_timeout: Duration,
    /// How long an unavailable backend is skipped before it is probed again
    pub retry_cooldown: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            retry_cooldown: Duration::from_secs(30),
        }
    }
}

/// Lazily connected, shareable cache backend handle.
#[derive(Debug)]
pub struct CacheClient {
    url: Option<String>,
    options: ClientOptions,
    backend: RwLock<Option<Arc<dyn CacheBackend>>>,
    available: AtomicBool,
    /// Unix ms of the last failure, 0 when none
    last_failure_ms: AtomicU64,
    shut_down: AtomicBool,
}

impl CacheClient {
    /// Client for `url`; `None` disables caching.
    pub fn new(url: Option<String>, options: ClientOptions) -> Self {
        Self {
            url,
            options,
            backend: RwLock::new(None),
            available: AtomicBool::new(true),
            last_failure_ms: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Client that never connects and always reports a miss.
    pub fn disabled() -> Self {
        Self::new(None, ClientOptions::default())
    }

    /// Client around an already constructed backend.
    pub fn with_backend(backend: Arc<dyn CacheBackend>, options: ClientOptions) -> Self {
        Self {
            backend: RwLock::new(Some(backend)),
            ..Self::new(None, options)
        }
    }

    /// True when a backend is configured or injected.
    pub async fn is_enabled(&self) -> bool {
        !self.shut_down.load(Ordering::SeqCst)
            && (self.url.is_some() || self.backend.read().await.is_some())
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Connects now instead of on first use and checks the backend answers.
    ///
    /// Returns whether the cache is usable. A failure is logged and leaves the
    /// client in its unavailable state; it never aborts startup.
    pub async fn initialize(&self) -> bool {
        if !self.is_enabled().await {
            info!("Cache disabled: no backend configured");
            return false;
        }

        let Some(backend) = self.connect_if_needed().await else {
            return false;
        };

        match backend.ping().await {
            Ok(()) => {
                self.mark_available();
                info!("Cache backend ready");
                true
            }
            Err(e) => {
                self.mark_unavailable(&e);
                false
            }
        }
    }

    /// Drops the backend handle; later calls behave as if caching is disabled.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        if self.backend.write().await.take().is_some() {
            info!("Cache backend connection closed");
        }
    }

    /// Backend to use for the next call, or `None` to skip the cache.
    ///
    /// While unavailable, returns `None` until the retry cooldown has passed,
    /// then lets a single probe through.
    pub async fn backend(&self) -> Option<Arc<dyn CacheBackend>> {
        if self.shut_down.load(Ordering::SeqCst) {
            return None;
        }

        if !self.is_available() && !self.claim_probe() {
            return None;
        }

        self.connect_if_needed().await
    }

    /// Flags the backend unavailable; logs only on the transition.
    pub fn mark_unavailable(&self, err: &CacheError) {
        self.last_failure_ms.store(current_timestamp_ms(), Ordering::SeqCst);
        if self.available.swap(false, Ordering::SeqCst) {
            warn!(error = %err, "Cache backend unavailable, serving without cache");
        }
    }

    /// Flags the backend available again; logs only on the transition.
    pub fn mark_available(&self) {
        if !self.available.swap(true, Ordering::SeqCst) {
            info!("Cache backend available again");
        }
    }

    /// Takes the probe slot once the cooldown has elapsed, restarting the
    /// cooldown so concurrent callers keep skipping the backend.
    fn claim_probe(&self) -> bool {
        let now = current_timestamp_ms();
        let last = self.last_failure_ms.load(Ordering::SeqCst);
        let cooldown = self.options.retry_cooldown.as_millis() as u64;

        if now.saturating_sub(last) < cooldown {
            return false;
        }
        self.last_failure_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn connect_if_needed(&self) -> Option<Arc<dyn CacheBackend>> {
        if let Some(backend) = self.backend.read().await.as_ref() {
            return Some(Arc::clone(backend));
        }

        let url = self.url.as_deref()?;
        let mut slot = self.backend.write().await;
        // Another caller may have connected while we waited for the lock
        if let Some(backend) = slot.as_ref() {
            return Some(Arc::clone(backend));
        }

        match self.open(url).await {
            Ok(backend) => {
                debug!("Cache backend connected");
                self.mark_available();
                *slot = Some(Arc::clone(&backend));
                Some(backend)
            }
            Err(e) => {
                self.mark_unavailable(&e);
                None
            }
        }
    }

    async fn open(&self, url: &str) -> Result<Arc<dyn CacheBackend>> {
        if url.starts_with(MEMORY_SCHEME) {
            return Ok(Arc::new(MemoryBackend::new()));
        }

        let timeout = self.options.connect_timeout;
        match tokio::time::timeout(timeout, RedisBackend::connect(url)).await {
            Ok(Ok(backend)) => Ok(Arc::new(backend)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CacheError::Timeout(timeout)),
        }
    }
}
