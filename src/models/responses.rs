//! Response DTOs for the offline cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheEntry, CacheStats};
use crate::connectivity::ConnectivityState;

/// Response body for GET /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The cached payload
    pub data: Value,
    /// Milliseconds until the entry expires, None = never
    pub ttl_remaining_ms: Option<u64>,
}

impl GetResponse {
    /// Builds the response for `entry` as seen at `now_ms`.
    pub fn from_entry(entry: CacheEntry, now_ms: u64) -> Self {
        let ttl_remaining_ms = entry
            .ttl_remaining(now_ms)
            .map(|remaining| remaining.as_millis() as u64);
        Self {
            key: entry.key,
            data: entry.data,
            ttl_remaining_ms,
        }
    }
}

/// Response body for PUT /cache
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' cached successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for POST /cache/sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    /// Number of expired entries removed
    pub removed: usize,
}

/// Response body for GET /status
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub connectivity: ConnectivityState,
    /// Requests waiting for the next sync pass
    pub pending_requests: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries purged after expiry
    pub expired: u64,
    /// Number of failed storage writes
    pub persist_failures: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Requests waiting for the next sync pass
    pub pending_requests: usize,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, pending_requests: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            persist_failures: stats.persist_failures,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            pending_requests,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
