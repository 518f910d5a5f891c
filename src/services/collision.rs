use crate::services::sanitizer::FALLBACK_TITLE;
use crate::services::storage::{StorageAdapter, MARKDOWN_EXTENSION};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;

/// Result of resolving a derived title against the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The document already carries this name.
    Unchanged,
    /// First free path for the title.
    Target(Utf8PathBuf),
}

/// Check whether a file stem still looks like an untitled note.
pub fn is_untitled(stem: &str) -> bool {
    stem.is_empty() || stem.starts_with(FALLBACK_TITLE)
}

/// Build `base.ext` for counter 1 and `base (n).ext` for higher counters.
pub fn candidate_path(
    directory: &Utf8Path,
    base_name: &str,
    extension: &str,
    counter: u32,
) -> Utf8PathBuf {
    let file_name = if counter <= 1 {
        format!("{}.{}", base_name, extension)
    } else {
        format!("{} ({}).{}", base_name, counter, extension)
    };
    directory.join(file_name)
}

/// Find a free path for `base_name` next to `current`.
///
/// A candidate is taken when storage already has it or when it sits in
/// `reserved`. The counter starts at 2 for the first retry. `reserved` is only
/// read; the caller decides whether to claim the returned path.
///
/// When `current` already equals the first candidate and is not an untitled
/// note, no rename is needed and [`Resolution::Unchanged`] comes back before any
/// storage lookups. The document's own path never collides with itself.
pub async fn resolve<S>(
    storage: &S,
    current: &Utf8Path,
    base_name: &str,
    reserved: &HashSet<Utf8PathBuf>,
) -> Resolution
where
    S: StorageAdapter + ?Sized,
{
    let directory = current.parent().unwrap_or(Utf8Path::new(""));
    let extension = current.extension().unwrap_or(MARKDOWN_EXTENSION);

    let mut counter = 1;
    let mut candidate = candidate_path(directory, base_name, extension, counter);

    let current_stem = current.file_stem().unwrap_or("");
    if candidate == current && !is_untitled(current_stem) {
        tracing::trace!("{} already matches its content", current);
        return Resolution::Unchanged;
    }

    while candidate != current
        && (reserved.contains(&candidate) || storage.exists(&candidate).await)
    {
        counter += 1;
        candidate = candidate_path(directory, base_name, extension, counter);
    }

    if candidate == current {
        Resolution::Unchanged
    } else {
        Resolution::Target(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStorage;

    #[test]
    fn test_candidate_path_format() {
        let dir = Utf8Path::new("Journal");
        assert_eq!(candidate_path(dir, "Note", "md", 1), Utf8PathBuf::from("Journal/Note.md"));
        assert_eq!(
            candidate_path(dir, "Note", "md", 2),
            Utf8PathBuf::from("Journal/Note (2).md")
        );
        assert_eq!(
            candidate_path(Utf8Path::new(""), "Note", "md", 3),
            Utf8PathBuf::from("Note (3).md")
        );
    }

    #[test]
    fn test_is_untitled() {
        assert!(is_untitled(""));
        assert!(is_untitled("Untitled"));
        assert!(is_untitled("Untitled 4"));
        assert!(!is_untitled("Groceries"));
    }

    #[tokio::test]
    async fn test_free_name_is_returned() {
        let storage = MemoryStorage::with_documents([("draft.md", "")]);
        let resolution = resolve(&storage, Utf8Path::new("draft.md"), "Plans", &HashSet::new()).await;
        assert_eq!(resolution, Resolution::Target("Plans.md".into()));
    }

    #[tokio::test]
    async fn test_existing_untitled_gets_counter() {
        let storage = MemoryStorage::with_documents([("Untitled.md", ""), ("Untitled 1.md", "")]);
        let resolution =
            resolve(&storage, Utf8Path::new("Untitled 1.md"), "Untitled", &HashSet::new()).await;
        assert_eq!(resolution, Resolution::Target("Untitled (2).md".into()));
    }

    #[tokio::test]
    async fn test_reserved_paths_are_skipped() {
        let storage = MemoryStorage::with_documents([("a.md", ""), ("Plans.md", "")]);
        let reserved: HashSet<_> = [Utf8PathBuf::from("Plans (2).md")].into_iter().collect();

        let resolution = resolve(&storage, Utf8Path::new("a.md"), "Plans", &reserved).await;
        assert_eq!(resolution, Resolution::Target("Plans (3).md".into()));
        assert_eq!(reserved.len(), 1);
    }

    #[tokio::test]
    async fn test_named_document_already_matching_is_unchanged() {
        let storage = MemoryStorage::with_documents([("Plans.md", "# Plans")]);
        let resolution = resolve(&storage, Utf8Path::new("Plans.md"), "Plans", &HashSet::new()).await;
        assert_eq!(resolution, Resolution::Unchanged);
    }

    #[tokio::test]
    async fn test_untitled_document_does_not_collide_with_itself() {
        let storage = MemoryStorage::with_documents([("Untitled.md", "")]);
        let resolution =
            resolve(&storage, Utf8Path::new("Untitled.md"), "Untitled", &HashSet::new()).await;
        assert_eq!(resolution, Resolution::Unchanged);
    }

    #[tokio::test]
    async fn test_numbered_document_keeps_its_number() {
        let storage = MemoryStorage::with_documents([("Plans.md", ""), ("Plans (2).md", "")]);
        let resolution =
            resolve(&storage, Utf8Path::new("Plans (2).md"), "Plans", &HashSet::new()).await;
        assert_eq!(resolution, Resolution::Unchanged);
    }
}
