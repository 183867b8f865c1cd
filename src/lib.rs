//! Offline Cache - an expiring key-value cache for offline-tolerant clients
//!
//! Keeps a persisted cache of API responses with per-entry TTL, queues
//! requests made while offline and replays them once connectivity returns.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod manager;
pub mod models;
pub mod offline_api;
pub mod queue;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use connectivity::{ConnectionType, ConnectivityMonitor, ConnectivityState};
pub use error::{OfflineError, Result};
pub use manager::{ManagerOptions, OfflineManager};
pub use offline_api::{CallOptions, OfflineApi};
pub use queue::{PendingResult, SyncReport};
