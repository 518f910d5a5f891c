use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Number of completed renames kept in [`SessionState::renamed`].
pub const RENAME_HISTORY_LIMIT: usize = 100;

/// Runtime state of a rename session.
///
/// `SessionState` is wrapped in `Arc<RwLock<SessionState>>` by
/// [`crate::state::StateManager`]; mutate it only through the manager so that
/// subscribers receive [`crate::state::StateChange`] events.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    // Scheduler
    pub armed_path: Option<Utf8PathBuf>,
    pub executing: bool,

    // Batch progress
    pub batch_running: bool,
    pub batch_total: usize,
    pub batch_attempted: usize,
    pub batch_completed: usize,

    // Results
    pub renamed: Vec<(Utf8PathBuf, Utf8PathBuf)>,
    pub unchanged: usize,
    pub failed: usize,
}

impl SessionState {
    /// Record a completed rename, dropping the oldest entry past the history limit.
    pub fn push_rename(&mut self, from: Utf8PathBuf, to: Utf8PathBuf) {
        if self.renamed.len() == RENAME_HISTORY_LIMIT {
            self.renamed.remove(0);
        }
        self.renamed.push((from, to));
    }

    /// Most recent rename, if any.
    pub fn last_rename(&self) -> Option<&(Utf8PathBuf, Utf8PathBuf)> {
        self.renamed.last()
    }

    /// Returns (completed, unchanged, failed) for the whole session.
    pub fn rename_stats(&self) -> (usize, usize, usize) {
        (self.renamed.len(), self.unchanged, self.failed)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// State shared by every pipeline invocation of one "rename all" sweep.
///
/// Created empty at the start of the batch and dropped when the batch ends.
/// The scheduler keeps one for its own lifetime so that concurrent immediate
/// renames claim targets the same way.
/// `reserved` holds target paths claimed by renames that may not be visible in
/// storage yet; resolution and insertion happen under the same lock.
#[derive(Debug, Default)]
pub struct BatchContext {
    completed: AtomicUsize,
    reserved: Mutex<HashSet<Utf8PathBuf>>,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Lock the reservation set.
    pub async fn reserved(&self) -> tokio::sync::MutexGuard<'_, HashSet<Utf8PathBuf>> {
        self.reserved.lock().await
    }

    pub async fn is_reserved(&self, path: &Utf8Path) -> bool {
        self.reserved.lock().await.contains(path)
    }

    /// Drop a reservation once the rename behind it is committed or abandoned.
    pub async fn release(&self, path: &Utf8Path) {
        self.reserved.lock().await.remove(path);
    }
}

/// Outcome of a "rename all" sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Documents the pipeline ran for.
    pub attempted: usize,
    /// Documents that were actually renamed.
    pub completed: usize,
    /// Documents whose name already matched their content.
    pub unchanged: usize,
    /// Documents whose rename failed, with the error message.
    pub failed: Vec<(Utf8PathBuf, String)>,
}

impl BatchReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Renamed {} of {} notes",
            self.completed, self.attempted
        );
        if self.unchanged > 0 {
            summary.push_str(&format!(", {} already up to date", self.unchanged));
        }
        if !self.failed.is_empty() {
            summary.push_str(&format!(", {} failed", self.failed.len()));
        }
        summary
    }
}
