// autotitle - name markdown notes after their content
//
// This is the library crate containing the rename pipeline and its state.
// The binary crate (main.rs) provides the command line entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{BatchReport, DebounceMode, RenameSettings, SessionState};
pub use services::{
    FsStorage, MemoryStorage, RenameMode, RenameOutcome, RenamePipeline, RenameScheduler,
    Sanitizer, StorageAdapter, StorageError, rename_all,
};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
