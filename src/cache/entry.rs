//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with its payload and timestamps.
///
/// Serialized as `{"key", "data", "timestamp", "expiresAt"}` inside the
/// persisted cache object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The key this entry is stored under
    pub key: String,
    /// The cached payload
    pub data: Value,
    /// Insertion timestamp (Unix milliseconds)
    #[serde(rename = "timestamp")]
    pub stored_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stored at `now_ms` with an optional TTL.
    ///
    /// # Arguments
    /// * `key` - Key the entry belongs to
    /// * `data` - The value to store
    /// * `ttl` - Optional time-to-live
    /// * `now_ms` - Current Unix time in milliseconds
    pub fn new(key: impl Into<String>, data: Value, ttl: Option<Duration>, now_ms: u64) -> Self {
        let expires_at = ttl.map(|ttl| now_ms.saturating_add(ttl.as_millis() as u64));

        Self {
            key: key.into(),
            data,
            stored_at: now_ms,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to the expiration time.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL at `now_ms`, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self, now_ms: u64) -> Option<Duration> {
        self.expires_at
            .map(|expires| Duration::from_millis(expires.saturating_sub(now_ms)))
    }
}
