use tokio::{sync::mpsc, task::JoinHandle};

use crate::models::Viewer;

/// Buffered updates per subscriber before the producer waits.
pub const UPDATE_BUFFER: usize = 8;

/// ViewerSubscription
///
/// Handle to a stream of current-user updates. `None` updates mean the viewer is gone
/// (logged out or deleted). The producing task is aborted when the handle is dropped, so
/// tearing down the consumer tears down the subscription.
#[derive(Debug)]
pub struct ViewerSubscription {
    updates: mpsc::Receiver<Option<Viewer>>,
    task: JoinHandle<()>,
}

impl ViewerSubscription {
    pub fn new(updates: mpsc::Receiver<Option<Viewer>>, task: JoinHandle<()>) -> Self {
        Self { updates, task }
    }

    /// Next update, or `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<Option<Viewer>> {
        self.updates.recv().await
    }

    /// Abort handle of the producer, for observing teardown.
    pub fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.task.abort_handle()
    }
}

impl Drop for ViewerSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
