//! Sync Task
//!
//! Background task that periodically replays queued requests.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::WeakOfflineManager;

/// Spawns a background task that runs a sync pass every `interval`.
///
/// Each pass checks connectivity and, when online with requests queued,
/// executes a snapshot of the queue. The task ends when the manager is
/// dropped or when its handle is aborted.
///
/// # Arguments
/// * `manager` - Weak handle to the owning manager
/// * `interval` - Time between sync passes
///
/// # Example
/// ```ignore
/// let handle = spawn_sync_task(manager.downgrade(), Duration::from_secs(30));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sync_task(manager: WeakOfflineManager, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting sync task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(manager) = manager.upgrade() else {
                debug!("Sync task stopping: manager dropped");
                break;
            };

            let report = manager.sync_pending_requests().await;
            if report.executed == 0 {
                debug!(
                    "Sync tick: nothing to replay (online={}, pending={})",
                    manager.is_online(),
                    manager.pending_request_count()
                );
            }
        }
    })
}
