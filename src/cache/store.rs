//! Cache Store Module
//!
//! Main cache engine: a HashMap of expiring entries mirrored to persistent
//! storage on every mutation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::Clock;
use crate::storage::{Storage, StorageError};

// == Cache Store ==
/// Expiring key-value cache persisted as a single storage slot.
///
/// The in-memory map is authoritative. Storage failures are logged and
/// counted but never returned to callers.
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Read and purge statistics
    stats: CacheStats,
    /// Persistent backend
    storage: Arc<dyn Storage>,
    /// Slot name in `storage`
    storage_key: String,
    /// Time source for timestamps and expiry
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("storage_key", &self.storage_key)
            .field("stats", &self.stats)
            .finish()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Opens a cache over `storage`, loading whatever `storage_key` holds.
    ///
    /// A missing slot yields an empty cache. An unreadable or corrupt slot is
    /// logged and also yields an empty cache. Expired entries are loaded as-is
    /// and purged lazily.
    ///
    /// # Arguments
    /// * `storage` - Persistent backend
    /// * `storage_key` - Slot holding the serialized cache
    /// * `clock` - Time source
    pub fn open(
        storage: Arc<dyn Storage>,
        storage_key: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let storage_key = storage_key.into();
        let entries = match load_entries(storage.as_ref(), &storage_key) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load offline cache from '{}': {}", storage_key, e);
                HashMap::new()
            }
        };
        debug!("Loaded {} cached entries from '{}'", entries.len(), storage_key);

        let mut stats = CacheStats::new();
        stats.set_total_entries(entries.len());

        Self {
            entries,
            stats,
            storage,
            storage_key,
            clock,
        }
    }

    // == Set ==
    /// Stores `data` under `key`, replacing any previous entry.
    ///
    /// With a TTL the entry expires at `now + ttl`; without one it never
    /// expires on its own. The full cache is written to storage immediately.
    pub fn set(&mut self, key: &str, data: Value, ttl: Option<Duration>) {
        let entry = CacheEntry::new(key, data, ttl, self.clock.now_ms());
        self.entries.insert(key.to_string(), entry);
        self.stats.set_total_entries(self.entries.len());
        self.persist();
    }

    // == Get ==
    /// Returns the value for `key`, or None if absent or expired.
    ///
    /// An expired entry is removed and storage is rewritten.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.get_entry(key).map(|entry| entry.data)
    }

    // == Get Entry ==
    /// Returns a copy of the live entry for `key`, with the same purge and
    /// stats behaviour as [`CacheStore::get`].
    pub fn get_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.live_entry(key)?.clone();
        self.stats.record_hit();
        Some(entry)
    }

    // == Get Typed ==
    /// Returns the value for `key` decoded as `T`.
    ///
    /// A value that does not decode as `T` is left in place but counted as a
    /// miss, since the caller cannot use it.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let data = self.live_entry(key)?.data.clone();
        match serde_json::from_value(data) {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!("Cached value for '{}' has an unexpected shape: {}", key, e);
                self.stats.record_miss();
                None
            }
        }
    }

    /// Looks up `key`, purging it if expired. Records misses but not hits.
    fn live_entry(&mut self, key: &str) -> Option<&CacheEntry> {
        let now = self.clock.now_ms();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_expired(1);
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            debug!("Purged expired cache entry '{}'", key);
            self.persist();
            return None;
        }

        self.entries.get(key)
    }

    // == Clear Expired ==
    /// Removes all expired entries and persists the result.
    ///
    /// Returns the number of entries removed.
    pub fn clear_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();

        self.stats.record_expired(removed);
        self.stats.set_total_entries(self.entries.len());
        self.persist();
        removed
    }

    // == Clear ==
    /// Drops every entry and removes the persisted slot.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
        if let Err(e) = self.storage.remove(&self.storage_key) {
            warn!("Failed to remove offline cache '{}': {}", self.storage_key, e);
            self.stats.record_persist_failure();
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Persist ==
    fn persist(&mut self) {
        let result = serde_json::to_string(&self.entries)
            .map_err(StorageError::from)
            .and_then(|payload| self.storage.set(&self.storage_key, &payload));

        if let Err(e) = result {
            warn!("Failed to save offline cache '{}': {}", self.storage_key, e);
            self.stats.record_persist_failure();
        }
    }
}

fn load_entries(
    storage: &dyn Storage,
    storage_key: &str,
) -> Result<HashMap<String, CacheEntry>, StorageError> {
    match storage.get(storage_key)? {
        Some(payload) => Ok(serde_json::from_str(&payload)?),
        None => Ok(HashMap::new()),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{MemoryStorage, DEFAULT_STORAGE_KEY};
    use serde_json::json;

    /// Storage whose writes always fail.
    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".to_string()))
        }
    }

    fn new_store() -> (CacheStore, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(0));
        let store = CacheStore::open(storage.clone(), DEFAULT_STORAGE_KEY, clock.clone());
        (store, storage, clock)
    }

    fn persisted(storage: &MemoryStorage) -> Option<serde_json::Value> {
        storage
            .get(DEFAULT_STORAGE_KEY)
            .unwrap()
            .map(|s| serde_json::from_str(&s).unwrap())
    }

    #[test]
    fn test_store_new() {
        let (store, storage, _) = new_store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert!(persisted(&storage).is_none());
    }

    #[test]
    fn test_store_set_and_get() {
        let (mut store, _, _) = new_store();

        store.set("key1", json!({"orders": 12}), None);
        assert_eq!(store.get("key1"), Some(json!({"orders": 12})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let (mut store, _, _) = new_store();
        assert!(store.get("nonexistent").is_none());
    }

    #[test]
    fn test_store_set_flushes_to_storage() {
        let (mut store, storage, _) = new_store();

        store.set("key1", json!("value1"), Some(Duration::from_millis(500)));

        let dump = persisted(&storage).unwrap();
        assert_eq!(dump["key1"]["data"], "value1");
        assert_eq!(dump["key1"]["expiresAt"], 500);
    }

    #[test]
    fn test_store_overwrite() {
        let (mut store, _, clock) = new_store();

        store.set("key1", json!("value1"), Some(Duration::from_millis(10)));
        clock.advance(Duration::from_millis(5));
        store.set("key1", json!("value2"), None);
        clock.advance(Duration::from_millis(100));

        assert_eq!(store.get("key1"), Some(json!("value2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration_purges_lazily() {
        let (mut store, storage, clock) = new_store();

        store.set("dash-metrics", json!([1, 2, 3]), Some(Duration::from_millis(5_000)));

        clock.set(1_000);
        assert_eq!(store.get("dash-metrics"), Some(json!([1, 2, 3])));

        clock.set(6_000);
        assert_eq!(store.len(), 1, "purge only happens on access");
        assert!(store.get("dash-metrics").is_none());
        assert_eq!(store.len(), 0);
        assert!(persisted(&storage).unwrap().get("dash-metrics").is_none());
        assert_eq!(store.stats().expired, 1);
    }

    #[test]
    fn test_store_clear_expired() {
        let (mut store, storage, clock) = new_store();

        store.set("short", json!(1), Some(Duration::from_millis(100)));
        store.set("long", json!(2), Some(Duration::from_millis(10_000)));
        store.set("forever", json!(3), None);

        clock.set(100);
        let removed = store.clear_expired();

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 2);
        let dump = persisted(&storage).unwrap();
        assert!(dump.get("short").is_none());
        assert!(dump.get("long").is_some());
        assert!(dump.get("forever").is_some());
    }

    #[test]
    fn test_store_clear_removes_slot() {
        let (mut store, storage, _) = new_store();

        store.set("a", json!(1), None);
        store.set("b", json!(2), None);
        store.clear();

        assert!(store.get("a").is_none());
        assert!(store.get("b").is_none());
        assert!(persisted(&storage).is_none());
    }

    #[test]
    fn test_store_loads_existing_slot() {
        let storage = Arc::new(MemoryStorage::with_slot(
            DEFAULT_STORAGE_KEY,
            r#"{"sellers":{"key":"sellers","data":["acme"],"timestamp":1}}"#,
        ));
        let clock = Arc::new(ManualClock::new(10));
        let mut store = CacheStore::open(storage, DEFAULT_STORAGE_KEY, clock);

        assert_eq!(store.get("sellers"), Some(json!(["acme"])));
    }

    #[test]
    fn test_store_corrupt_slot_starts_empty() {
        let storage = Arc::new(MemoryStorage::with_slot(DEFAULT_STORAGE_KEY, "not json"));
        let clock = Arc::new(ManualClock::new(0));
        let store = CacheStore::open(storage, DEFAULT_STORAGE_KEY, clock);

        assert!(store.is_empty());
    }

    #[test]
    fn test_store_write_failures_are_swallowed() {
        let clock = Arc::new(ManualClock::new(0));
        let mut store = CacheStore::open(Arc::new(ReadOnlyStorage), DEFAULT_STORAGE_KEY, clock);

        store.set("key1", json!("value1"), None);
        assert_eq!(store.get("key1"), Some(json!("value1")));

        store.clear();
        assert!(store.get("key1").is_none());
        assert_eq!(store.stats().persist_failures, 2);
    }

    #[test]
    fn test_store_stats() {
        let (mut store, _, _) = new_store();

        store.set("key1", json!("value1"), None);
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_get_entry_reports_remaining_ttl() {
        let (mut store, _, clock) = new_store();

        store.set("k", json!(1), Some(Duration::from_millis(10)));
        clock.set(4);
        let entry = store.get_entry("k").unwrap();
        assert_eq!(entry.ttl_remaining(clock.now_ms()), Some(Duration::from_millis(6)));

        clock.set(10);
        assert!(store.get_entry("k").is_none());
        assert_eq!(store.len(), 0);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn test_get_as_wrong_shape_counts_as_miss() {
        let (mut store, _, _) = new_store();

        store.set("inventory", json!({"sku": "A1"}), None);
        assert!(store.get_as::<Vec<String>>("inventory").is_none());
        assert_eq!(store.len(), 1, "mismatched value stays cached");

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);

        let value: serde_json::Value = store.get_as("inventory").unwrap();
        assert_eq!(value, json!({"sku": "A1"}));
        assert_eq!(store.stats().hits, 1);
    }
}
