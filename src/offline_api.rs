//! Offline-Aware API Calls
//!
//! Combines a cache lookup, a live fetch and the deferred queue into one
//! read policy: serve from cache when possible, refresh when online, and
//! queue a refresh when offline.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{OfflineError, Result};
use crate::manager::OfflineManager;

// == Call Options ==
/// Per-call options for [`OfflineApi::call`].
#[derive(Debug, Clone)]
pub struct CallOptions<T> {
    /// TTL applied when the result is cached
    pub ttl: Option<Duration>,
    /// Skip the initial cache lookup
    pub force_refresh: bool,
    /// Returned when offline with nothing cached
    pub fallback_data: Option<T>,
}

impl<T> Default for CallOptions<T> {
    fn default() -> Self {
        Self {
            ttl: None,
            force_refresh: false,
            fallback_data: None,
        }
    }
}

impl<T> CallOptions<T> {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback_data = Some(fallback);
        self
    }
}

// == Offline API ==
/// Offline-aware caller built on an [`OfflineManager`].
#[derive(Debug, Clone)]
pub struct OfflineApi {
    manager: OfflineManager,
}

impl OfflineApi {
    pub fn new(manager: OfflineManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &OfflineManager {
        &self.manager
    }

    // == Call ==
    /// Reads `key` through the cache, falling back to `fetch`.
    ///
    /// 1. Unless `force_refresh`, a cached value is returned without fetching.
    /// 2. Online: `fetch` runs; success is cached with `ttl` and returned. On
    ///    failure a cached value is returned if one exists, else the error.
    /// 3. Offline: a cached value is returned and `fetch` is queued to refresh
    ///    it on the next sync pass. With nothing cached, `fallback_data` is
    ///    returned, else [`OfflineError::OfflineNoCache`]. Nothing is queued
    ///    in that case.
    pub async fn call<T, F, Fut>(&self, key: &str, fetch: F, options: CallOptions<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let CallOptions {
            ttl,
            force_refresh,
            fallback_data,
        } = options;

        if !force_refresh {
            if let Some(cached) = self.cached::<T>(key) {
                debug!("Serving '{}' from cache", key);
                return Ok(cached);
            }
        }

        if self.manager.is_online() {
            return match fetch().await {
                Ok(data) => {
                    self.manager.set_cache(key, serde_json::to_value(&data)?, ttl);
                    Ok(data)
                }
                Err(e) => match self.cached::<T>(key) {
                    Some(cached) => {
                        warn!("Fetch for '{}' failed, serving cached copy: {:#}", key, e);
                        Ok(cached)
                    }
                    None => Err(OfflineError::Request(e)),
                },
            };
        }

        match self.cached::<T>(key) {
            Some(cached) => {
                self.queue_refresh(key, fetch, ttl);
                Ok(cached)
            }
            None => fallback_data.ok_or_else(|| OfflineError::OfflineNoCache(key.to_string())),
        }
    }

    /// Queues `fetch` so that its result replaces the cached entry once it runs.
    fn queue_refresh<T, F, Fut>(&self, key: &str, fetch: F, ttl: Option<Duration>)
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let id = format!("api-{}-{}", key, self.manager.now_ms());
        let manager = self.manager.downgrade();
        let cache_key = key.to_string();

        // Nobody awaits the refresh; its outcome only lands in the cache.
        let _ = self.manager.queue_request(id, move || async move {
            let value = serde_json::to_value(fetch().await?)?;
            if let Some(manager) = manager.upgrade() {
                manager.set_cache(&cache_key, value.clone(), ttl);
            }
            Ok::<_, anyhow::Error>(value)
        });
        debug!("Queued refresh of '{}' for when connectivity returns", key);
    }

    /// Cached value for `key` as `T`. A value that no longer deserializes is
    /// treated as absent and counted as a miss.
    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.manager.get_cache_as(key)
    }
}
