//! Services module - the content-to-filename rename pipeline.
//!
//! The services are framework-agnostic: every input is an explicit parameter
//! and storage sits behind the [`StorageAdapter`] trait, so the same code runs
//! against a directory on disk, an in-memory vault, or a mock.
//!
//! # Components
//!
//! - [`Sanitizer`]: pure derivation of a safe title from note content
//! - [`collision`]: picks the first free `Title.md` / `Title (n).md` path
//! - [`RenamePipeline`]: read → derive → resolve → rename for one document
//! - [`RenameScheduler`]: debounces edit-driven requests
//! - [`rename_all`]: concurrent sweep over every eligible document
//! - [`ContentWatcher`]: bounded polling for documents created empty
//! - [`FsStorage`] / [`MemoryStorage`]: storage adapters
//!
//! # Data flow
//!
//! ```text
//! edit event → RenameScheduler (debounce) → StorageAdapter::read → Sanitizer
//!            → collision::resolve (exists + reservations) → StorageAdapter::rename
//! ```
//!
//! # Usage Example
//!
//! ```ignore
//! use autotitle::services::{FsStorage, RenameMode, RenamePipeline, RenameScheduler};
//!
//! let pipeline = Arc::new(RenamePipeline::new(
//!     Arc::new(FsStorage::new("vault")),
//!     state,
//!     metrics,
//! ));
//! let scheduler = RenameScheduler::new(pipeline);
//!
//! scheduler
//!     .request(Utf8Path::new("Inbox/Untitled.md"), &settings, RenameMode::Debounced)
//!     .await?;
//! ```

pub mod batch;
pub mod collision;
pub mod pipeline;
pub mod sanitizer;
pub mod scheduler;
pub mod storage;
pub mod watcher;

pub use batch::rename_all;
pub use collision::{Resolution, resolve};
pub use pipeline::{Eligibility, RenameOutcome, RenamePipeline, check_eligibility};
pub use sanitizer::{FALLBACK_TITLE, Sanitizer};
pub use scheduler::{
    NewDocumentHandle, NewDocumentOutcome, RenameMode, RenameScheduler, RequestOutcome,
    SchedulerPhase,
};
pub use storage::{FsStorage, MemoryStorage, StorageAdapter, StorageError};
pub use watcher::{ContentWatcher, WatchHandle, WatchResult};
