//! Background Tasks Module
//!
//! Periodic tasks owned by an [`OfflineManager`](crate::OfflineManager).
//!
//! # Tasks
//! - Sync: replays queued requests while online
//! - Cleanup: sweeps expired cache entries
//! - Probe: reports connectivity from TCP reachability of a host
//!
//! Every task holds a weak handle and exits once the manager is gone.

mod cleanup;
mod probe;
mod sync;

pub use cleanup::spawn_cleanup_task;
pub use probe::{probe_once, spawn_probe_task};
pub use sync::spawn_sync_task;
