use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest accepted `char_count`.
pub const MIN_CHAR_COUNT: u32 = 10;

/// Largest accepted `char_count`.
pub const MAX_CHAR_COUNT: u32 = 100;

/// How debounced rename requests share timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceMode {
    /// One timer slot for every document. A request for a different document
    /// replaces the slot and leaves the previous timer running, uncancellable.
    #[default]
    SingleSlot,
    /// One timer per document path.
    PerDocument,
}

/// Rename settings from autotitle.yaml
///
/// Handed to the rename pipeline as a complete value on every call; the core
/// never reads settings from anywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameSettings {
    /// Folders whose notes are renamed. Empty means every folder.
    pub include_folders: IndexSet<String>,

    /// Take the title from a leading `#` heading when present.
    pub use_header: bool,

    /// Stop the title at the first line break.
    pub use_first_line: bool,

    /// Skip a leading `---` front matter block.
    pub support_yaml: bool,

    /// Keep emoji and pictographic symbols in titles.
    pub include_emojis: bool,

    /// Maximum number of scanned characters before the title is cut.
    pub char_count: u32,

    /// Debounce delay in milliseconds.
    pub check_interval: u64,

    /// Only rename notes that are still untitled.
    pub skip_named_files: bool,

    pub debounce_mode: DebounceMode,
}

impl Default for RenameSettings {
    fn default() -> Self {
        Self {
            include_folders: IndexSet::new(),
            use_header: true,
            use_first_line: true,
            support_yaml: true,
            include_emojis: false,
            char_count: 50,
            check_interval: 500,
            skip_named_files: false,
            debounce_mode: DebounceMode::SingleSlot,
        }
    }
}

impl RenameSettings {
    /// `char_count` clamped into `[MIN_CHAR_COUNT, MAX_CHAR_COUNT]`.
    pub fn effective_char_count(&self) -> usize {
        self.char_count.clamp(MIN_CHAR_COUNT, MAX_CHAR_COUNT) as usize
    }

    /// Copy of these settings with `char_count` forced into range.
    pub fn clamped(&self) -> Self {
        let mut settings = self.clone();
        let char_count = self.char_count.clamp(MIN_CHAR_COUNT, MAX_CHAR_COUNT);
        if char_count != self.char_count {
            tracing::warn!(
                "char_count {} outside [{}, {}], using {}",
                self.char_count,
                MIN_CHAR_COUNT,
                MAX_CHAR_COUNT,
                char_count
            );
            settings.char_count = char_count;
        }
        settings
    }

    pub fn check_interval_duration(&self) -> Duration {
        Duration::from_millis(self.check_interval)
    }

    /// Check whether notes in `folder` are eligible for renaming.
    ///
    /// `folder` is vault-relative; the vault root may be spelled `""` or `"/"`.
    /// A folder is included when it equals an included folder or sits below one.
    pub fn includes_folder(&self, folder: &str) -> bool {
        if self.include_folders.is_empty() {
            return true;
        }

        let folder = normalize_folder(folder);
        self.include_folders.iter().any(|included| {
            let included = normalize_folder(included);
            included.is_empty()
                || folder == included
                || folder
                    .strip_prefix(included)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

fn normalize_folder(folder: &str) -> &str {
    folder.trim_matches('/')
}
