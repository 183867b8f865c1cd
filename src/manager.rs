//! Offline Manager
//!
//! The service object tying together the expiring cache, the deferred request
//! queue and the connectivity signal, plus the background tasks that drive
//! them.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStore};
use crate::clock::Clock;
use crate::config::Config;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::queue::{PendingResult, RequestQueue, SyncReport};
use crate::storage::{Storage, DEFAULT_STORAGE_KEY};
use crate::tasks::{spawn_cleanup_task, spawn_probe_task, spawn_sync_task};

/// Shortest period accepted for any background task.
pub const MIN_TASK_INTERVAL: Duration = Duration::from_millis(100);

// == Manager Options ==
/// Settings for the background tasks started by [`OfflineManager::create`].
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Storage slot holding the serialized cache
    pub storage_key: String,
    /// Period of the sync pass
    pub sync_interval: Duration,
    /// Period of the expired-entry sweep, None = no sweep task
    pub cleanup_interval: Option<Duration>,
    /// TCP probe used as connectivity source, None = externally driven
    pub probe: Option<ProbeOptions>,
}

/// TCP reachability probe settings.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub addr: SocketAddr,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            sync_interval: Duration::from_secs(30),
            cleanup_interval: None,
            probe: None,
        }
    }
}

impl From<&Config> for ManagerOptions {
    fn from(config: &Config) -> Self {
        Self {
            storage_key: config.storage_key.clone(),
            sync_interval: Duration::from_secs(config.sync_interval),
            cleanup_interval: (config.cleanup_interval > 0)
                .then(|| Duration::from_secs(config.cleanup_interval)),
            probe: config.probe_addr.map(|addr| ProbeOptions {
                addr,
                interval: Duration::from_secs(config.probe_interval),
                timeout: Duration::from_secs(config.probe_interval.clamp(1, 5)),
            }),
        }
    }
}

// == Offline Manager ==
/// Offline cache service. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OfflineManager {
    inner: Arc<Inner>,
}

/// Non-owning handle used by background tasks.
#[derive(Clone)]
pub struct WeakOfflineManager {
    inner: Weak<Inner>,
}

struct Inner {
    store: Mutex<CacheStore>,
    queue: RequestQueue,
    connectivity: ConnectivityMonitor,
    clock: Arc<dyn Clock>,
    /// Serializes sync passes
    sync_guard: tokio::sync::Mutex<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl OfflineManager {
    // == Constructor ==
    /// Creates a manager without background tasks.
    ///
    /// The cache is loaded from `storage_key` in `storage`. Sync passes only
    /// happen through [`OfflineManager::sync_pending_requests`].
    pub fn new(
        storage: Arc<dyn Storage>,
        storage_key: &str,
        clock: Arc<dyn Clock>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let store = CacheStore::open(storage, storage_key, clock.clone());

        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                queue: RequestQueue::new(),
                connectivity,
                clock,
                sync_guard: tokio::sync::Mutex::new(()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    // == Create ==
    /// Creates a manager and starts its background tasks.
    ///
    /// Must be called from within a tokio runtime. Pair with
    /// [`OfflineManager::destroy`].
    pub fn create(
        options: &ManagerOptions,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let manager = Self::new(storage, &options.storage_key, clock, connectivity);

        let sync_interval = task_interval("sync", options.sync_interval);
        let mut handles = vec![spawn_sync_task(manager.downgrade(), sync_interval)];
        if let Some(interval) = options.cleanup_interval {
            let interval = task_interval("cleanup", interval);
            handles.push(spawn_cleanup_task(manager.downgrade(), interval));
        }
        if let Some(probe) = &options.probe {
            handles.push(spawn_probe_task(
                manager.downgrade(),
                probe.addr,
                task_interval("connectivity", probe.interval),
                probe.timeout,
            ));
        }
        manager.tasks().extend(handles);

        info!(
            "Offline manager started: sync every {:?}, {} pending, {} cached",
            sync_interval,
            manager.pending_request_count(),
            manager.store().len()
        );
        manager
    }

    // == Destroy ==
    /// Stops the background tasks and drops every request still queued.
    ///
    /// Handles of dropped requests resolve to `RequestDropped`. The cache
    /// itself stays readable.
    pub fn destroy(&self) {
        let handles: Vec<_> = self.tasks().drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        let dropped = self.inner.queue.drop_all();
        info!(
            "Offline manager stopped: {} tasks aborted, {} queued requests dropped",
            handles.len(),
            dropped
        );
    }

    pub fn downgrade(&self) -> WeakOfflineManager {
        WeakOfflineManager {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // == Cache Operations ==
    /// Inserts or overwrites `key`. See [`CacheStore::set`].
    pub fn set_cache(&self, key: &str, data: Value, ttl: Option<Duration>) {
        self.store().set(key, data, ttl);
    }

    /// Returns the live value for `key`, purging it if expired.
    pub fn get_cache(&self, key: &str) -> Option<Value> {
        self.store().get(key)
    }

    /// Returns the live entry for `key`, including its expiry.
    pub fn get_cache_entry(&self, key: &str) -> Option<CacheEntry> {
        self.store().get_entry(key)
    }

    /// Returns the live value for `key` decoded as `T`. A value of another
    /// shape is treated as a miss.
    pub fn get_cache_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.store().get_as(key)
    }

    /// Removes expired entries, returning how many were removed.
    pub fn clear_expired_cache(&self) -> usize {
        self.store().clear_expired()
    }

    /// Drops every entry and the persisted slot.
    pub fn clear_cache(&self) {
        self.store().clear();
        info!("Offline cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        self.store().stats()
    }

    // == Queue Operations ==
    /// Queues `operation` for the next sync pass that runs while online.
    ///
    /// `id` is informational; repeated ids are not deduplicated. The returned
    /// handle resolves once the operation has run.
    pub fn queue_request<F, Fut>(&self, id: impl Into<String>, operation: F) -> PendingResult
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.inner
            .queue
            .enqueue(id, self.inner.clock.now_ms(), operation)
    }

    pub fn pending_request_count(&self) -> usize {
        self.inner.queue.len()
    }

    // == Sync Pass ==
    /// Runs one sync pass: if online and anything is queued, executes a
    /// snapshot of the queue in FIFO order.
    pub async fn sync_pending_requests(&self) -> SyncReport {
        let _guard = self.inner.sync_guard.lock().await;

        if !self.inner.connectivity.is_online() {
            debug!("Sync skipped: offline");
            return SyncReport::default();
        }
        if self.inner.queue.is_empty() {
            return SyncReport::default();
        }

        let report = self.inner.queue.drain().await;
        info!(
            "Sync pass complete: {} executed, {} succeeded, {} failed",
            report.executed, report.succeeded, report.failed
        );
        report
    }

    // == Connectivity ==
    pub fn connectivity(&self) -> ConnectivityState {
        self.inner.connectivity.state()
    }

    pub fn is_online(&self) -> bool {
        self.inner.connectivity.is_online()
    }

    /// Subscribes to connectivity changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.inner.connectivity.subscribe()
    }

    /// Reports the host online. Returns true on an offline to online transition.
    pub fn set_online(&self) -> bool {
        let changed = self.inner.connectivity.set_online();
        if changed && !self.inner.queue.is_empty() {
            info!(
                "Back online: {} queued requests will sync on the next pass",
                self.pending_request_count()
            );
        }
        changed
    }

    /// Reports the host offline. Returns true on an online to offline transition.
    pub fn set_offline(&self) -> bool {
        self.inner.connectivity.set_offline()
    }

    pub fn set_connection_type(&self, descriptor: Option<&str>) {
        self.inner.connectivity.set_connection_type(descriptor);
    }

    /// Current time from the injected clock, in Unix milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    fn store(&self) -> MutexGuard<'_, CacheStore> {
        self.inner.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for OfflineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineManager")
            .field("store", &*self.store())
            .field("pending", &self.pending_request_count())
            .field("connectivity", &self.connectivity())
            .finish()
    }
}

/// Raises `interval` to [`MIN_TASK_INTERVAL`] so a zero period cannot spin.
fn task_interval(task: &str, interval: Duration) -> Duration {
    if interval < MIN_TASK_INTERVAL {
        warn!(
            "{} interval {:?} is below {:?}, using the minimum",
            task, interval, MIN_TASK_INTERVAL
        );
        return MIN_TASK_INTERVAL;
    }
    interval
}

impl WeakOfflineManager {
    /// Returns the manager if it is still alive.
    pub fn upgrade(&self) -> Option<OfflineManager> {
        self.inner.upgrade().map(|inner| OfflineManager { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::OfflineError;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn manager(online: bool) -> (OfflineManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let connectivity = ConnectivityMonitor::new(online, clock.clone());
        let manager = OfflineManager::new(
            Arc::new(MemoryStorage::new()),
            DEFAULT_STORAGE_KEY,
            clock.clone(),
            connectivity,
        );
        (manager, clock)
    }

    #[tokio::test]
    async fn test_sync_skipped_while_offline() {
        let (manager, _) = manager(false);
        let _ = manager.queue_request("r", || async { Ok(json!(1)) });

        assert_eq!(manager.sync_pending_requests().await, SyncReport::default());
        assert_eq!(manager.pending_request_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_runs_when_online() {
        let (manager, _) = manager(false);
        let handle = manager.queue_request("r", || async { Ok(json!("done")) });

        manager.set_online();
        let report = manager.sync_pending_requests().await;

        assert_eq!(report.executed, 1);
        assert_eq!(manager.pending_request_count(), 0);
        assert_eq!(handle.await.unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn test_destroy_drops_queue() {
        let (manager, _) = manager(false);
        let handle = manager.queue_request("r", || async { Ok(json!(1)) });

        manager.destroy();
        assert_eq!(manager.pending_request_count(), 0);
        assert!(matches!(handle.await, Err(OfflineError::RequestDropped)));
    }

    #[test]
    fn test_cache_passthrough() {
        let (manager, clock) = manager(true);

        manager.set_cache("k", json!({"v": 1}), Some(Duration::from_millis(10)));
        assert_eq!(manager.get_cache("k"), Some(json!({"v": 1})));

        clock.advance(Duration::from_millis(10));
        assert_eq!(manager.clear_expired_cache(), 1);
        assert!(manager.get_cache("k").is_none());
    }

    #[test]
    fn test_weak_handle_expires_with_manager() {
        let (manager, _) = manager(true);
        let weak = manager.downgrade();
        assert!(weak.upgrade().is_some());

        drop(manager);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            cleanup_interval: 0,
            sync_interval: 5,
            ..Config::default()
        };
        let options = ManagerOptions::from(&config);

        assert_eq!(options.sync_interval, Duration::from_secs(5));
        assert!(options.cleanup_interval.is_none());
        assert!(options.probe.is_none());
        assert_eq!(options.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_task_interval_floor() {
        assert_eq!(task_interval("sync", Duration::ZERO), MIN_TASK_INTERVAL);
        assert_eq!(task_interval("sync", Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_with_zero_intervals_does_not_spin() {
        let clock = Arc::new(ManualClock::new(0));
        let options = ManagerOptions {
            sync_interval: Duration::ZERO,
            cleanup_interval: Some(Duration::ZERO),
            ..ManagerOptions::default()
        };
        let manager = OfflineManager::create(
            &options,
            Arc::new(MemoryStorage::new()),
            clock.clone(),
            ConnectivityMonitor::new(true, clock),
        );
        let handle = manager.queue_request("r", || async { Ok(json!(1)) });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.pending_request_count(), 1);

        tokio::time::sleep(MIN_TASK_INTERVAL).await;
        assert_eq!(manager.pending_request_count(), 0);
        assert_eq!(handle.await.unwrap(), json!(1));

        manager.destroy();
    }

    #[test]
    fn test_get_cache_entry_and_typed_read() {
        let (manager, clock) = manager(true);
        manager.set_cache("k", json!(["a"]), Some(Duration::from_millis(100)));

        clock.advance(Duration::from_millis(40));
        let entry = manager.get_cache_entry("k").unwrap();
        assert_eq!(entry.ttl_remaining(manager.now_ms()), Some(Duration::from_millis(60)));

        assert_eq!(manager.get_cache_as::<Vec<String>>("k"), Some(vec!["a".to_string()]));
        assert!(manager.get_cache_as::<u32>("k").is_none());
        assert_eq!(manager.stats().misses, 1);
    }
}
