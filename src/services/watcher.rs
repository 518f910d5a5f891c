//! Bounded polling for documents that are created empty.
//!
//! A new note usually exists on disk before its first content lands. The
//! watcher re-reads it on a fixed cadence until something other than
//! whitespace shows up, and gives up once the ceiling has elapsed.

use crate::services::storage::StorageAdapter;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Time between two reads of a new document.
pub const DEFAULT_POLL_CADENCE: Duration = Duration::from_millis(250);

/// Shortest accepted poll cadence.
pub const MIN_POLL_CADENCE: Duration = Duration::from_millis(10);

/// Time after which the watcher stops waiting for content.
pub const DEFAULT_POLL_CEILING: Duration = Duration::from_secs(10);

/// How a content watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchResult {
    /// The document now has this content
    Content(String),
    /// The ceiling elapsed without content
    TimedOut,
    /// The watch was cancelled or its handle dropped
    Cancelled,
}

/// Polling configuration for new documents.
#[derive(Debug, Clone, Copy)]
pub struct ContentWatcher {
    cadence: Duration,
    ceiling: Duration,
}

impl ContentWatcher {
    /// Cadences below [`MIN_POLL_CADENCE`] are raised to it.
    pub fn new(cadence: Duration, ceiling: Duration) -> Self {
        let cadence = if cadence < MIN_POLL_CADENCE {
            tracing::warn!(
                "Poll cadence {:?} below {:?}, using {:?}",
                cadence,
                MIN_POLL_CADENCE,
                MIN_POLL_CADENCE
            );
            MIN_POLL_CADENCE
        } else {
            cadence
        };
        Self { cadence, ceiling }
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Poll `path` until it has content, the ceiling passes, or `cancel_rx`
    /// fires.
    ///
    /// Read errors count as "no content yet": the document may still be in
    /// the middle of being created.
    pub async fn wait_for_content(
        &self,
        storage: &dyn StorageAdapter,
        path: &Utf8Path,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> WatchResult {
        let deadline = Instant::now() + self.ceiling;
        let mut ticker = tokio::time::interval(self.cadence);

        loop {
            tokio::select! {
                biased;
                _ = cancel_rx.changed() => {
                    tracing::debug!("Stopped waiting for content of {}", path);
                    return WatchResult::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            match storage.read(path).await {
                Ok(content) if !content.trim().is_empty() => {
                    tracing::debug!("Content arrived for {}", path);
                    return WatchResult::Content(content);
                }
                Ok(_) => {}
                Err(e) => tracing::trace!("{} not readable yet: {}", path, e),
            }

            if Instant::now() >= deadline {
                tracing::debug!(
                    "Gave up waiting for content of {} after {:?}",
                    path,
                    self.ceiling
                );
                return WatchResult::TimedOut;
            }
        }
    }

    /// Run [`wait_for_content`](Self::wait_for_content) on a background task.
    pub fn spawn(&self, storage: Arc<dyn StorageAdapter>, path: Utf8PathBuf) -> WatchHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let watcher = *self;

        let task = tokio::spawn(async move {
            watcher
                .wait_for_content(storage.as_ref(), &path, cancel_rx)
                .await
        });

        WatchHandle { cancel_tx, task }
    }
}

impl Default for ContentWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_CADENCE, DEFAULT_POLL_CEILING)
    }
}

/// Handle to a spawned content watch.
///
/// Dropping the handle cancels the watch.
pub struct WatchHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<WatchResult>,
}

impl WatchHandle {
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the watch to end.
    pub async fn wait(self) -> WatchResult {
        let WatchHandle { cancel_tx, task } = self;
        let result = task.await.unwrap_or(WatchResult::Cancelled);
        drop(cancel_tx);
        result
    }
}
