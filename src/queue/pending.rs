//! Pending Request Module
//!
//! A deferred operation paired with the channel that delivers its outcome.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{OfflineError, Result};

/// Boxed future produced by a deferred operation.
pub type OperationFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;

/// A zero-argument deferred operation.
pub type Operation = Box<dyn FnOnce() -> OperationFuture + Send>;

// == Pending Request ==
/// An operation waiting for the next sync pass.
pub struct PendingRequest {
    /// Caller-chosen identifier, informational only
    pub id: String,
    /// Enqueue timestamp (Unix milliseconds)
    pub enqueued_at: u64,
    operation: Operation,
    responder: oneshot::Sender<anyhow::Result<Value>>,
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

impl PendingRequest {
    /// Wraps `operation` and returns it together with the handle its result
    /// will be delivered to.
    pub fn new<F, Fut>(id: impl Into<String>, enqueued_at: u64, operation: F) -> (Self, PendingResult)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let (responder, receiver) = oneshot::channel();
        let request = Self {
            id: id.into(),
            enqueued_at,
            operation: Box::new(move || Box::pin(operation()) as OperationFuture),
            responder,
        };
        (request, PendingResult { receiver })
    }

    // == Execute ==
    /// Runs the operation once and hands its outcome to the waiting handle.
    ///
    /// Returns whether the operation succeeded. A handle that was dropped in
    /// the meantime is not an error.
    pub async fn execute(self) -> bool {
        let outcome = (self.operation)().await;
        let succeeded = outcome.is_ok();
        let _ = self.responder.send(outcome);
        succeeded
    }
}

// == Pending Result ==
/// Handle to the eventual outcome of a queued operation.
///
/// Resolves with the operation's value, [`OfflineError::Request`] with its
/// error, or [`OfflineError::RequestDropped`] if the request was discarded
/// before it ran.
#[derive(Debug)]
#[must_use = "the queued operation still runs, but its outcome is lost"]
pub struct PendingResult {
    receiver: oneshot::Receiver<anyhow::Result<Value>>,
}

impl Future for PendingResult {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| match received {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OfflineError::Request(e)),
            Err(_) => Err(OfflineError::RequestDropped),
        })
    }
}
