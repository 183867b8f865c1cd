//! Request Queue Module
//!
//! FIFO queue of deferred operations, drained in snapshots by sync passes.

mod pending;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub use pending::{Operation, OperationFuture, PendingRequest, PendingResult};

// == Sync Report ==
/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Operations captured and run by the pass
    pub executed: usize,
    /// Operations that completed successfully
    pub succeeded: usize,
    /// Operations that returned an error
    pub failed: usize,
}

// == Request Queue ==
/// Deferred operations waiting for connectivity.
///
/// Requests are not deduplicated: two requests with the same id are two
/// independent entries.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: Mutex<VecDeque<PendingRequest>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // == Enqueue ==
    /// Appends an operation and returns the handle its outcome will reach.
    pub fn enqueue<F, Fut>(&self, id: impl Into<String>, enqueued_at: u64, operation: F) -> PendingResult
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let (request, handle) = PendingRequest::new(id, enqueued_at, operation);
        debug!("Queued deferred request '{}'", request.id);
        self.lock().push_back(request);
        handle
    }

    /// Number of operations not yet captured by a sync pass.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // == Take Snapshot ==
    /// Removes and returns everything queued so far, oldest first.
    pub fn take_snapshot(&self) -> Vec<PendingRequest> {
        self.lock().drain(..).collect()
    }

    // == Drop All ==
    /// Discards every queued request; their handles resolve to
    /// `RequestDropped`. Returns how many were dropped.
    pub fn drop_all(&self) -> usize {
        let dropped = self.take_snapshot();
        dropped.len()
    }

    // == Drain ==
    /// Runs a snapshot of the queue sequentially in FIFO order.
    ///
    /// Requests enqueued while the pass runs are left for the next pass.
    pub async fn drain(&self) -> SyncReport {
        let snapshot = self.take_snapshot();
        let mut report = SyncReport {
            executed: snapshot.len(),
            ..SyncReport::default()
        };

        for request in snapshot {
            let id = request.id.clone();
            if request.execute().await {
                report.succeeded += 1;
            } else {
                warn!("Deferred request '{}' failed during sync", id);
                report.failed += 1;
            }
        }

        report
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
