//! Fetch task handles
//!
//! Each transfer runs on its own tokio task. The [`FetchHandle`] is the only way
//! to reach that task; dropping it aborts the transfer, so replacing the handle
//! held by the loader always cancels the previous fetch.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::transport::{FetchError, Transport};
use crate::descriptor::UrlProps;

/// Identifier of one started transfer
pub type FetchId = u64;

/// Terminal notification of a transfer
#[derive(Debug)]
pub struct FetchCompletion {
    pub id: FetchId,
    /// Bytes written on success
    pub result: Result<u64, FetchError>,
}

/// Starts transfers and routes their completions to one receiver
pub struct AsyncFetcher {
    transport: Arc<dyn Transport>,
    completions: mpsc::UnboundedSender<FetchCompletion>,
    next_id: FetchId,
}

impl AsyncFetcher {
    /// Create a fetcher and the receiver its completions are delivered to
    pub fn new(transport: Arc<dyn Transport>) -> (Self, mpsc::UnboundedReceiver<FetchCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = Self {
            transport,
            completions: tx,
            next_id: 1,
        };
        (fetcher, rx)
    }

    /// Spawn a transfer of `url` into `destination`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, url: &str, destination: PathBuf, props: UrlProps) -> FetchHandle {
        let id = self.next_id;
        self.next_id += 1;

        let transport = Arc::clone(&self.transport);
        let completions = self.completions.clone();
        let url = url.to_string();

        let task = tokio::spawn(async move {
            let transfer = transport.download(&url, &props, &destination);
            let result = match AssertUnwindSafe(transfer).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Task("transport panicked".to_string())),
            };

            if let Err(e) = &result {
                tracing::debug!(fetch_id = id, url = %url, error = %e, "Transfer failed");
            }

            // A closed channel means the owning loader is gone; nothing to notify.
            let _ = completions.send(FetchCompletion { id, result });
        });

        tracing::debug!(fetch_id = id, "Started transfer");
        FetchHandle { id, task }
    }
}

/// Exclusive handle to an in-flight transfer
#[derive(Debug)]
pub struct FetchHandle {
    id: FetchId,
    task: JoinHandle<()>,
}

impl FetchHandle {
    pub fn id(&self) -> FetchId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the transfer to stop
    ///
    /// Best effort: the task stops at its next suspension point. No completion
    /// is delivered for a transfer aborted before it finished.
    pub fn cancel(self) {
        tracing::debug!(fetch_id = self.id, "Cancelling transfer");
        // Drop aborts the task.
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
