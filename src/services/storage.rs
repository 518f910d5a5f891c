//! Storage adapter seam between the rename pipeline and the note vault.
//!
//! Paths handed across this trait are vault-relative UTF-8 paths with `/`
//! separators, e.g. `Journal/2024-01-01.md`.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::sync::RwLock;
use thiserror::Error;
use walkdir::WalkDir;

/// Extension of the documents the pipeline manages.
pub const MARKDOWN_EXTENSION: &str = "md";

/// Errors raised by a storage adapter.
///
/// The pipeline propagates these unchanged to its caller.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Document {0} not found")]
    NotFound(Utf8PathBuf),

    #[error("Cannot rename {from} to {to}: target already exists")]
    TargetExists { from: Utf8PathBuf, to: Utf8PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk vault: {0}")]
    Walk(String),
}

impl StorageError {
    fn io(path: &Utf8Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Access to the documents being renamed.
///
/// `exists` reflects committed state only; renames still in flight are
/// tracked by the caller's reservation set.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Full current content of a document.
    async fn read(&self, path: &Utf8Path) -> Result<String, StorageError>;

    async fn exists(&self, path: &Utf8Path) -> bool;

    /// Move a document to `to`. Fails rather than partially applying.
    async fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), StorageError>;

    /// Every markdown document in the vault.
    async fn list_markdown_documents(&self) -> Result<Vec<Utf8PathBuf>, StorageError>;
}

/// Check whether `path` names a markdown document.
pub fn is_markdown(path: &Utf8Path) -> bool {
    path.extension() == Some(MARKDOWN_EXTENSION)
}

/// Vault stored as a directory tree on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: Utf8PathBuf,
}

impl FsStorage {
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn absolute(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.root.join(path)
    }

    /// Convert an absolute filesystem path back to a vault-relative path.
    pub fn relative(&self, path: &std::path::Path) -> Option<Utf8PathBuf> {
        let path = Utf8Path::from_path(path)?;
        path.strip_prefix(&self.root).ok().map(Utf8Path::to_path_buf)
    }
}

#[async_trait]
impl StorageAdapter for FsStorage {
    async fn read(&self, path: &Utf8Path) -> Result<String, StorageError> {
        tokio::fs::read_to_string(self.absolute(path))
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn exists(&self, path: &Utf8Path) -> bool {
        tokio::fs::try_exists(self.absolute(path))
            .await
            .unwrap_or(false)
    }

    async fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), StorageError> {
        let target = self.absolute(to);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(StorageError::TargetExists {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            });
        }

        tokio::fs::rename(self.absolute(from), &target)
            .await
            .map_err(|e| StorageError::io(from, e))?;

        tracing::debug!("Renamed {} -> {}", from, to);
        Ok(())
    }

    async fn list_markdown_documents(&self) -> Result<Vec<Utf8PathBuf>, StorageError> {
        let root = self.root.clone();

        tokio::task::spawn_blocking(move || {
            let mut documents = Vec::new();

            let walker = WalkDir::new(&root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

            for entry in walker {
                let entry = entry.map_err(|e| StorageError::Walk(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let Some(path) = Utf8Path::from_path(entry.path()) else {
                    tracing::warn!("Skipping non UTF-8 path: {}", entry.path().display());
                    continue;
                };

                if let Ok(relative) = path.strip_prefix(&root) {
                    if is_markdown(relative) {
                        documents.push(relative.to_path_buf());
                    }
                }
            }

            documents.sort();
            Ok(documents)
        })
        .await
        .map_err(|e| StorageError::Walk(e.to_string()))?
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Vault kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RwLock<BTreeMap<Utf8PathBuf, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vault from `(path, content)` pairs.
    pub fn with_documents<I, P, C>(documents: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<Utf8PathBuf>,
        C: Into<String>,
    {
        let storage = Self::new();
        for (path, content) in documents {
            storage.write(path, content);
        }
        storage
    }

    /// Create or overwrite a document.
    pub fn write<P: Into<Utf8PathBuf>, C: Into<String>>(&self, path: P, content: C) {
        self.documents
            .write()
            .unwrap()
            .insert(path.into(), content.into());
    }

    /// Sorted list of every stored path, markdown or not.
    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        self.documents.read().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn read(&self, path: &Utf8Path) -> Result<String, StorageError> {
        self.documents
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }

    async fn exists(&self, path: &Utf8Path) -> bool {
        self.documents.read().unwrap().contains_key(path)
    }

    async fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), StorageError> {
        let mut documents = self.documents.write().unwrap();
        if documents.contains_key(to) {
            return Err(StorageError::TargetExists {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            });
        }

        let content = documents
            .remove(from)
            .ok_or_else(|| StorageError::NotFound(from.to_path_buf()))?;
        documents.insert(to.to_path_buf(), content);
        Ok(())
    }

    async fn list_markdown_documents(&self) -> Result<Vec<Utf8PathBuf>, StorageError> {
        Ok(self
            .documents
            .read()
            .unwrap()
            .keys()
            .filter(|p| is_markdown(p))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fs_vault() -> (TempDir, FsStorage) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, FsStorage::new(root))
    }

    #[tokio::test]
    async fn test_fs_list_skips_hidden_and_non_markdown() {
        let (_temp_dir, storage) = fs_vault();
        let root = storage.root().to_path_buf();
        std::fs::create_dir_all(root.join("Journal")).unwrap();
        std::fs::create_dir_all(root.join(".obsidian")).unwrap();
        std::fs::write(root.join("a.md"), "a").unwrap();
        std::fs::write(root.join("Journal/b.md"), "b").unwrap();
        std::fs::write(root.join(".obsidian/c.md"), "c").unwrap();
        std::fs::write(root.join("image.png"), "png").unwrap();

        let documents = storage.list_markdown_documents().await.unwrap();
        assert_eq!(
            documents,
            vec![Utf8PathBuf::from("Journal/b.md"), Utf8PathBuf::from("a.md")]
        );
    }

    #[tokio::test]
    async fn test_fs_rename_refuses_to_overwrite() {
        let (_temp_dir, storage) = fs_vault();
        std::fs::write(storage.root().join("a.md"), "a").unwrap();
        std::fs::write(storage.root().join("b.md"), "b").unwrap();

        let err = storage
            .rename(Utf8Path::new("a.md"), Utf8Path::new("b.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::TargetExists { .. }));
        assert_eq!(storage.read(Utf8Path::new("b.md")).await.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_fs_read_missing_is_not_found() {
        let (_temp_dir, storage) = fs_vault();
        let err = storage.read(Utf8Path::new("missing.md")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_memory_rename_moves_content() {
        let storage = MemoryStorage::with_documents([("old.md", "content")]);
        storage
            .rename(Utf8Path::new("old.md"), Utf8Path::new("new.md"))
            .await
            .unwrap();

        assert!(!storage.exists(Utf8Path::new("old.md")).await);
        assert_eq!(storage.read(Utf8Path::new("new.md")).await.unwrap(), "content");
    }

    #[test]
    fn test_relative_path_conversion() {
        let storage = FsStorage::new("/vault");
        assert_eq!(
            storage.relative(std::path::Path::new("/vault/Journal/a.md")),
            Some(Utf8PathBuf::from("Journal/a.md"))
        );
        assert_eq!(storage.relative(std::path::Path::new("/elsewhere/a.md")), None);
    }
}
