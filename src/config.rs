//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::storage::DEFAULT_STORAGE_KEY;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Interval in seconds between sync passes
    pub sync_interval: u64,
    /// Interval in seconds between expired-entry sweeps, 0 = disabled
    pub cleanup_interval: u64,
    /// TTL in milliseconds for proxied API responses, None = no expiry
    pub default_ttl_ms: Option<u64>,
    /// Directory for file storage, None = in-memory storage
    pub storage_dir: Option<PathBuf>,
    /// Storage slot holding the serialized cache
    pub storage_key: String,
    /// Base URL of the REST backend served under `/api`
    pub upstream_url: Option<String>,
    /// Address probed to determine connectivity
    pub probe_addr: Option<SocketAddr>,
    /// Interval in seconds between connectivity probes
    pub probe_interval: u64,
    /// Connectivity assumed at startup
    pub start_online: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SYNC_INTERVAL` - Sync pass frequency in seconds (default: 30)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds, 0 disables (default: 60)
    /// - `DEFAULT_TTL_MS` - TTL for proxied responses (default: none)
    /// - `STORAGE_DIR` - Directory for persisted cache (default: in-memory)
    /// - `STORAGE_KEY` - Slot name (default: offline-cache)
    /// - `UPSTREAM_URL` - REST backend base URL (default: none)
    /// - `PROBE_ADDR` - `host:port` probed for connectivity (default: none)
    /// - `PROBE_INTERVAL` - Probe frequency in seconds (default: 10)
    /// - `START_ONLINE` - Initial connectivity (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            sync_interval: parse_var("SYNC_INTERVAL")
                .filter(|&secs| secs > 0)
                .unwrap_or(defaults.sync_interval),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            default_ttl_ms: parse_var("DEFAULT_TTL_MS"),
            storage_dir: non_empty_var("STORAGE_DIR").map(PathBuf::from),
            storage_key: non_empty_var("STORAGE_KEY").unwrap_or(defaults.storage_key),
            upstream_url: non_empty_var("UPSTREAM_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            probe_addr: parse_var("PROBE_ADDR"),
            probe_interval: parse_var("PROBE_INTERVAL")
                .filter(|&secs| secs > 0)
                .unwrap_or(defaults.probe_interval),
            start_online: parse_var("START_ONLINE").unwrap_or(defaults.start_online),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            sync_interval: 30,
            cleanup_interval: 60,
            default_ttl_ms: None,
            storage_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            upstream_url: None,
            probe_addr: None,
            probe_interval: 10,
            start_online: true,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    non_empty_var(name).and_then(|v| v.trim().parse().ok())
}
