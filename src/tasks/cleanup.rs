//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::WeakOfflineManager;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// Reads already purge expired entries lazily; the sweep keeps entries that
/// are never read again from lingering in storage.
///
/// # Arguments
/// * `manager` - Weak handle to the owning manager
/// * `interval` - Time between sweeps
pub fn spawn_cleanup_task(manager: WeakOfflineManager, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(manager) = manager.upgrade() else {
                break;
            };

            let removed = manager.clear_expired_cache();
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
