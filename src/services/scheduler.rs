//! Debounced rename scheduling.
//!
//! Edits arrive far faster than renames should happen. The scheduler holds a
//! rename back until `check_interval` has passed without another request for
//! the same document, then runs the pipeline once.
//!
//! # States
//!
//! - `Idle`: nothing armed, nothing running
//! - `Armed(path)`: a timer is waiting to rename `path`
//! - `Executing`: a pipeline run is in flight
//!
//! Immediate requests (new documents, batch sweeps) skip the timer and run
//! right away. Eligibility is checked when the request comes in; a document
//! that becomes ineligible after its timer was armed is still renamed.
//!
//! Every run claims its target in a reservation set shared by the scheduler,
//! so concurrent runs deriving the same title end up on distinct paths.
//! Debounced requests for a document that is still waiting for its first
//! content are left to the new-document watch.
//!
//! # Single slot
//!
//! With [`DebounceMode::SingleSlot`] there is one timer slot for all
//! documents. A request for a different document takes over the slot without
//! cancelling the timer already in it: that timer still fires, but later
//! requests can no longer cancel it. [`DebounceMode::PerDocument`] keeps one
//! timer per path instead.

use crate::models::{BatchContext, DebounceMode, RenameSettings};
use crate::services::pipeline::{Eligibility, RenameOutcome, RenamePipeline, check_eligibility};
use crate::services::storage::StorageError;
use crate::services::watcher::{ContentWatcher, WatchResult};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How a rename request should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameMode {
    /// Wait for `check_interval` of quiet first
    Debounced,
    /// Run the pipeline now
    Immediate,
}

/// What a rename request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Filtered out before anything was scheduled
    Ineligible(Eligibility),
    /// A debounce timer is armed
    Armed,
    /// A new-document watch already owns this path
    AwaitingContent,
    /// The pipeline ran
    Completed(RenameOutcome),
}

/// Observable scheduler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Armed(Utf8PathBuf),
    Executing,
}

/// How a new-document watch ended.
#[derive(Debug)]
pub enum NewDocumentOutcome {
    Completed(RequestOutcome),
    /// Content never arrived
    TimedOut,
    Cancelled,
    Failed(StorageError),
}

struct Slot {
    id: u64,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct Timers {
    single: Option<(Utf8PathBuf, Slot)>,
    per_document: IndexMap<Utf8PathBuf, Slot>,
}

impl Timers {
    fn armed_path(&self) -> Option<Utf8PathBuf> {
        self.single
            .as_ref()
            .map(|(path, _)| path.clone())
            .or_else(|| self.per_document.keys().last().cloned())
    }

    fn len(&self) -> usize {
        usize::from(self.single.is_some()) + self.per_document.len()
    }
}

struct SchedulerInner {
    pipeline: Arc<RenamePipeline>,
    timers: Mutex<Timers>,
    next_timer_id: AtomicU64,
    executing: AtomicUsize,
    reservations: BatchContext,
    new_documents: Mutex<HashSet<Utf8PathBuf>>,
}

/// Marks the scheduler as executing until dropped.
struct ExecutionGuard<'a> {
    inner: &'a SchedulerInner,
}

impl<'a> ExecutionGuard<'a> {
    fn enter(inner: &'a SchedulerInner) -> Self {
        if inner.executing.fetch_add(1, Ordering::SeqCst) == 0 {
            inner.pipeline.state().set_executing(true);
        }
        Self { inner }
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if self.inner.executing.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.pipeline.state().set_executing(false);
        }
    }
}

impl SchedulerInner {
    async fn execute(
        &self,
        path: &Utf8Path,
        settings: &RenameSettings,
    ) -> Result<RenameOutcome, StorageError> {
        let _guard = ExecutionGuard::enter(self);
        let outcome = self
            .pipeline
            .run(path, settings, Some(&self.reservations))
            .await?;

        // The rename is visible in storage now.
        if let RenameOutcome::Renamed { to, .. } = &outcome {
            self.reservations.release(to).await;
        }
        Ok(outcome)
    }

    fn awaiting_content(&self, path: &Utf8Path) -> bool {
        self.new_documents.lock().unwrap().contains(path)
    }

    /// Drop the slot for `path` if it still belongs to timer `id`.
    fn disarm(&self, path: &Utf8Path, id: u64) {
        let mut timers = self.timers.lock().unwrap();

        if timers
            .single
            .as_ref()
            .is_some_and(|(_, slot)| slot.id == id)
        {
            timers.single = None;
        }
        if timers.per_document.get(path).is_some_and(|slot| slot.id == id) {
            timers.per_document.shift_remove(path);
        }

        self.pipeline.state().set_armed(timers.armed_path());
    }
}

/// Debounces rename requests and runs the pipeline when they settle.
///
/// Cloning is cheap; clones share timers and execution state.
#[derive(Clone)]
pub struct RenameScheduler {
    inner: Arc<SchedulerInner>,
    content_watcher: ContentWatcher,
}

impl RenameScheduler {
    pub fn new(pipeline: Arc<RenamePipeline>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                pipeline,
                timers: Mutex::new(Timers::default()),
                next_timer_id: AtomicU64::new(0),
                executing: AtomicUsize::new(0),
                reservations: BatchContext::new(),
                new_documents: Mutex::new(HashSet::new()),
            }),
            content_watcher: ContentWatcher::default(),
        }
    }

    /// Use `watcher` for new-document polling.
    pub fn with_content_watcher(mut self, watcher: ContentWatcher) -> Self {
        self.content_watcher = watcher;
        self
    }

    pub fn pipeline(&self) -> &Arc<RenamePipeline> {
        &self.inner.pipeline
    }

    /// Request a rename of `path`.
    ///
    /// Immediate requests return the pipeline's result, including storage
    /// errors. Debounced requests return [`RequestOutcome::Armed`]; failures
    /// of the later run are logged and recorded in the session state.
    pub async fn request(
        &self,
        path: &Utf8Path,
        settings: &RenameSettings,
        mode: RenameMode,
    ) -> Result<RequestOutcome, StorageError> {
        let eligibility = check_eligibility(path, settings);
        if !eligibility.is_eligible() {
            tracing::debug!("Not renaming {}: {:?}", path, eligibility);
            return Ok(RequestOutcome::Ineligible(eligibility));
        }

        match mode {
            RenameMode::Immediate => {
                let outcome = self.inner.execute(path, settings).await?;
                Ok(RequestOutcome::Completed(outcome))
            }
            RenameMode::Debounced if self.inner.awaiting_content(path) => {
                tracing::debug!("{} is waiting for its first content", path);
                Ok(RequestOutcome::AwaitingContent)
            }
            RenameMode::Debounced => {
                self.arm(path, settings);
                Ok(RequestOutcome::Armed)
            }
        }
    }

    fn arm(&self, path: &Utf8Path, settings: &RenameSettings) {
        let id = self.inner.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let delay = settings.check_interval_duration();
        let metrics = self.inner.pipeline.metrics();

        let mut timers = self.inner.timers.lock().unwrap();

        let timer = {
            let inner = Arc::clone(&self.inner);
            let path = path.to_path_buf();
            let settings = settings.clone();

            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                inner.disarm(&path, id);

                if !inner.pipeline.storage().exists(&path).await {
                    tracing::debug!("{} is gone, skipping debounced rename", path);
                    return;
                }

                if let Err(e) = inner.execute(&path, &settings).await {
                    tracing::error!("Debounced rename of {} failed: {}", path, e);
                }
            })
        };
        let slot = Slot { id, timer };

        match settings.debounce_mode {
            DebounceMode::SingleSlot => {
                if let Some((previous_path, previous)) = timers.single.take() {
                    if previous_path == path {
                        previous.timer.abort();
                        metrics.record_debounce_rearm();
                    } else {
                        // The previous timer keeps running but leaves the slot.
                        tracing::debug!(
                            "Debounce slot moved from {} to {}",
                            previous_path,
                            path
                        );
                        metrics.record_orphaned_timer();
                    }
                }
                timers.single = Some((path.to_path_buf(), slot));
            }
            DebounceMode::PerDocument => {
                if let Some(previous) = timers.per_document.shift_remove(path) {
                    previous.timer.abort();
                    metrics.record_debounce_rearm();
                }
                timers.per_document.insert(path.to_path_buf(), slot);
            }
        }

        tracing::trace!("Armed rename of {} in {:?}", path, delay);
        self.inner.pipeline.state().set_armed(timers.armed_path());
    }

    /// Current phase. Executing wins over armed.
    pub fn phase(&self) -> SchedulerPhase {
        if self.is_executing() {
            return SchedulerPhase::Executing;
        }

        match self.inner.timers.lock().unwrap().armed_path() {
            Some(path) => SchedulerPhase::Armed(path),
            None => SchedulerPhase::Idle,
        }
    }

    pub fn is_executing(&self) -> bool {
        self.inner.executing.load(Ordering::SeqCst) > 0
    }

    /// Timers still held in a slot. Orphaned timers are not counted.
    pub fn pending_count(&self) -> usize {
        self.inner.timers.lock().unwrap().len()
    }

    /// Abort every timer still held in a slot.
    pub fn cancel_all(&self) {
        let mut timers = self.inner.timers.lock().unwrap();

        if let Some((_, slot)) = timers.single.take() {
            slot.timer.abort();
        }
        for (_, slot) in timers.per_document.drain(..) {
            slot.timer.abort();
        }

        self.inner.pipeline.state().set_armed(None);
    }

    /// Wait for a newly created document to receive content, then rename it
    /// immediately.
    pub fn watch_new_document(
        &self,
        path: &Utf8Path,
        settings: &RenameSettings,
    ) -> NewDocumentHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let scheduler = self.clone();
        let path = path.to_path_buf();
        let settings = settings.clone();
        let claim = NewDocumentClaim::new(Arc::clone(&self.inner), path.clone());

        let task = tokio::spawn(async move {
            let _claim = claim;
            let storage = Arc::clone(scheduler.pipeline().storage());
            let result = scheduler
                .content_watcher
                .wait_for_content(storage.as_ref(), &path, cancel_rx)
                .await;

            match result {
                WatchResult::Content(_) => {
                    match scheduler
                        .request(&path, &settings, RenameMode::Immediate)
                        .await
                    {
                        Ok(outcome) => NewDocumentOutcome::Completed(outcome),
                        Err(e) => NewDocumentOutcome::Failed(e),
                    }
                }
                WatchResult::TimedOut => NewDocumentOutcome::TimedOut,
                WatchResult::Cancelled => NewDocumentOutcome::Cancelled,
            }
        });

        NewDocumentHandle { cancel_tx, task }
    }
}

/// Marks a path as owned by a new-document watch until dropped.
struct NewDocumentClaim {
    inner: Arc<SchedulerInner>,
    path: Utf8PathBuf,
}

impl NewDocumentClaim {
    fn new(inner: Arc<SchedulerInner>, path: Utf8PathBuf) -> Self {
        inner.new_documents.lock().unwrap().insert(path.clone());
        Self { inner, path }
    }
}

impl Drop for NewDocumentClaim {
    fn drop(&mut self) {
        self.inner.new_documents.lock().unwrap().remove(&self.path);
    }
}

/// Handle to a pending new-document rename.
///
/// Dropping the handle cancels the watch if content has not arrived yet.
pub struct NewDocumentHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<NewDocumentOutcome>,
}

impl NewDocumentHandle {
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> NewDocumentOutcome {
        let NewDocumentHandle { cancel_tx, task } = self;
        let outcome = task.await.unwrap_or(NewDocumentOutcome::Cancelled);
        drop(cancel_tx);
        outcome
    }
}
