// State management module
//
// This module provides the StateManager which wraps SessionState with thread-safe access
// using Arc<RwLock<T>> and emits change events for whoever drives the renames.

use crate::models::{BatchReport, SessionState};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when session state is modified
///
/// A front end subscribes to these instead of polling the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The debounce slot now targets this path (or nothing)
    ArmedChanged {
        path: Option<Utf8PathBuf>,
    },

    /// A pipeline execution started or finished
    ExecutionChanged {
        executing: bool,
    },

    /// A document was renamed
    Renamed {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
    },

    /// A document's name already matched its content
    RenameUnchanged {
        path: Utf8PathBuf,
    },

    /// Storage rejected a read or rename
    RenameFailed {
        path: Utf8PathBuf,
        error: String,
    },

    /// A "rename all" sweep started
    BatchStarted {
        total: usize,
    },

    /// Batch counters moved
    BatchProgress {
        attempted: usize,
        completed: usize,
        total: usize,
    },

    /// A "rename all" sweep finished
    BatchFinished {
        attempted: usize,
        completed: usize,
    },

    /// State has been reset
    StateReset,
}

/// Thread-safe session state with event emission
///
/// - Provides thread-safe access to [`SessionState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// The rename pipeline, scheduler, and batch runner all report through one
/// shared manager.
pub struct StateManager {
    state: Arc<RwLock<SessionState>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            state_tx,
        }
    }

    /// Clone of the current state, safe to use without holding locks.
    pub fn snapshot(&self) -> SessionState {
        self.state.read().unwrap().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let executing = state_manager.read(|state| state.executing);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SessionState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, then emits one event per
    /// detected difference.
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.state.write().unwrap();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = self.detect_changes(&old_state, &state);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(&self, old: &SessionState, new: &SessionState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.armed_path != new.armed_path {
            changes.push(StateChange::ArmedChanged {
                path: new.armed_path.clone(),
            });
        }

        if old.executing != new.executing {
            changes.push(StateChange::ExecutionChanged {
                executing: new.executing,
            });
        }

        if old.batch_running != new.batch_running {
            if new.batch_running {
                changes.push(StateChange::BatchStarted {
                    total: new.batch_total,
                });
            } else {
                changes.push(StateChange::BatchFinished {
                    attempted: new.batch_attempted,
                    completed: new.batch_completed,
                });
            }
        } else if new.batch_running
            && (old.batch_attempted != new.batch_attempted
                || old.batch_completed != new.batch_completed)
        {
            changes.push(StateChange::BatchProgress {
                attempted: new.batch_attempted,
                completed: new.batch_completed,
                total: new.batch_total,
            });
        }

        changes
    }

    fn emit(&self, change: StateChange, changes: &mut Vec<StateChange>) {
        let _ = self.state_tx.send(change.clone());
        changes.push(change);
    }

    // Convenience methods for common state updates

    pub fn set_armed(&self, path: Option<Utf8PathBuf>) -> Vec<StateChange> {
        self.update(|state| state.armed_path = path)
    }

    pub fn set_executing(&self, executing: bool) -> Vec<StateChange> {
        self.update(|state| state.executing = executing)
    }

    /// Record a completed rename
    pub fn record_renamed(&self, from: &Utf8Path, to: &Utf8Path) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.push_rename(from.to_path_buf(), to.to_path_buf());
        });

        self.emit(
            StateChange::Renamed {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            },
            &mut changes,
        );
        changes
    }

    pub fn record_unchanged(&self, path: &Utf8Path) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.unchanged += 1);
        self.emit(
            StateChange::RenameUnchanged {
                path: path.to_path_buf(),
            },
            &mut changes,
        );
        changes
    }

    pub fn record_failed(&self, path: &Utf8Path, error: String) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.failed += 1);
        self.emit(
            StateChange::RenameFailed {
                path: path.to_path_buf(),
                error,
            },
            &mut changes,
        );
        changes
    }

    /// Start a "rename all" sweep over `total` documents
    pub fn start_batch(&self, total: usize) -> Vec<StateChange> {
        self.update(|state| {
            state.batch_running = true;
            state.batch_total = total;
            state.batch_attempted = 0;
            state.batch_completed = 0;
        })
    }

    /// Count one finished pipeline execution of the running sweep
    pub fn record_batch_attempt(&self, completed: bool) -> Vec<StateChange> {
        self.update(|state| {
            state.batch_attempted += 1;
            if completed {
                state.batch_completed += 1;
            }
        })
    }

    pub fn finish_batch(&self, report: &BatchReport) -> Vec<StateChange> {
        self.update(|state| {
            state.batch_running = false;
            state.batch_attempted = report.attempted;
            state.batch_completed = report.completed;
        })
    }

    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.reset());
        self.emit(StateChange::StateReset, &mut changes);
        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armed_change_detected() {
        let manager = StateManager::new();
        let changes = manager.set_armed(Some("a.md".into()));
        assert_eq!(
            changes,
            vec![StateChange::ArmedChanged {
                path: Some("a.md".into())
            }]
        );

        // Same value again is not a change
        assert!(manager.set_armed(Some("a.md".into())).is_empty());
    }

    #[test]
    fn test_batch_lifecycle_events() {
        let manager = StateManager::new();

        let started = manager.start_batch(2);
        assert_eq!(started, vec![StateChange::BatchStarted { total: 2 }]);

        let progress = manager.record_batch_attempt(true);
        assert_eq!(
            progress,
            vec![StateChange::BatchProgress {
                attempted: 1,
                completed: 1,
                total: 2
            }]
        );

        let report = BatchReport {
            attempted: 2,
            completed: 1,
            ..Default::default()
        };
        let finished = manager.finish_batch(&report);
        assert_eq!(
            finished,
            vec![StateChange::BatchFinished {
                attempted: 2,
                completed: 1
            }]
        );
    }

    #[test]
    fn test_record_renamed_updates_history() {
        let manager = StateManager::new();
        let changes = manager.record_renamed(Utf8Path::new("a.md"), Utf8Path::new("b.md"));

        assert!(changes.contains(&StateChange::Renamed {
            from: "a.md".into(),
            to: "b.md".into()
        }));
        assert_eq!(manager.read(|s| s.rename_stats()), (1, 0, 0));
    }

    #[test]
    fn test_reset_emits_event() {
        let manager = StateManager::new();
        manager.record_failed(Utf8Path::new("a.md"), "boom".to_string());
        manager.set_executing(true);

        let changes = manager.reset();
        assert!(changes.contains(&StateChange::StateReset));
        assert!(changes.contains(&StateChange::ExecutionChanged { executing: false }));
        assert_eq!(manager.read(|s| s.failed), 0);
    }
}
