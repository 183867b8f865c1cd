//! Connectivity Probe Task
//!
//! Derives online/offline status from whether a TCP connection to a known
//! host can be opened.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::WeakOfflineManager;

/// Attempts one TCP connection to `addr` within `timeout`.
pub async fn probe_once(addr: SocketAddr, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("Probe of {} failed: {}", addr, e);
            false
        }
        Err(_) => {
            debug!("Probe of {} timed out after {:?}", addr, timeout);
            false
        }
    }
}

/// Spawns a task that probes `addr` every `interval` and reports the result
/// to the manager's connectivity signal.
pub fn spawn_probe_task(
    manager: WeakOfflineManager,
    addr: SocketAddr,
    interval: Duration,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting connectivity probe of {} every {:?}", addr, interval);

        loop {
            let reachable = probe_once(addr, timeout).await;

            let Some(manager) = manager.upgrade() else {
                break;
            };
            if reachable {
                manager.set_online();
            } else {
                manager.set_offline();
            }
            drop(manager);

            tokio::time::sleep(interval).await;
        }
    })
}
