//! Data models for autotitle.
//!
//! - [`RenameSettings`]: the complete configuration value handed to every rename call
//! - [`SessionState`]: runtime state exposed to collaborators through [`StateManager`](crate::state::StateManager)
//! - [`BatchContext`]: per-sweep reservation set and completion counter
//! - [`BatchReport`]: attempted vs. completed counts returned by a "rename all" sweep

pub mod session;
pub mod settings;

pub use session::{BatchContext, BatchReport, SessionState, RENAME_HISTORY_LIMIT};
pub use settings::{DebounceMode, RenameSettings, MAX_CHAR_COUNT, MIN_CHAR_COUNT};
