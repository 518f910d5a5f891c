use crate::metrics::Metrics;
use crate::models::{BatchContext, RenameSettings};
use crate::services::collision::{self, Resolution, is_untitled};
use crate::services::sanitizer::Sanitizer;
use crate::services::storage::{StorageAdapter, StorageError, is_markdown};
use crate::state::StateManager;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Whether a document takes part in automatic renaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Not a markdown document
    NotMarkdown,
    /// Outside every included folder
    FolderExcluded,
    /// Already carries a real name and `skip_named_files` is set
    AlreadyNamed,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Self::Eligible
    }
}

/// Result of one pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { from: Utf8PathBuf, to: Utf8PathBuf },
    /// The name already matched the content; nothing was touched.
    Unchanged,
}

/// Decide whether `path` is eligible under `settings`.
///
/// Evaluated once when a rename is requested, before any debounce timer is
/// armed.
pub fn check_eligibility(path: &Utf8Path, settings: &RenameSettings) -> Eligibility {
    if !is_markdown(path) {
        return Eligibility::NotMarkdown;
    }

    let folder = path.parent().map_or("", Utf8Path::as_str);
    if !settings.includes_folder(folder) {
        return Eligibility::FolderExcluded;
    }

    if settings.skip_named_files && !is_untitled(path.file_stem().unwrap_or("")) {
        return Eligibility::AlreadyNamed;
    }

    Eligibility::Eligible
}

/// Read → derive → resolve → rename for a single document.
///
/// Storage errors are returned to the caller unchanged; nothing is retried.
/// Every outcome is also reported to the shared [`StateManager`] and
/// [`Metrics`].
pub struct RenamePipeline {
    storage: Arc<dyn StorageAdapter>,
    sanitizer: Sanitizer,
    state: Arc<StateManager>,
    metrics: Arc<Metrics>,
}

impl RenamePipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        state: Arc<StateManager>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            storage,
            sanitizer: Sanitizer::new(),
            state,
            metrics,
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn eligibility(&self, path: &Utf8Path, settings: &RenameSettings) -> Eligibility {
        check_eligibility(path, settings)
    }

    /// Run the pipeline once for `path`.
    ///
    /// With a `batch` context the chosen target is claimed in its reservation
    /// set while the set is still locked, so two documents of the same sweep
    /// never resolve to the same path.
    pub async fn run(
        &self,
        path: &Utf8Path,
        settings: &RenameSettings,
        batch: Option<&BatchContext>,
    ) -> Result<RenameOutcome, StorageError> {
        let start = Instant::now();
        let result = self.execute(path, settings, batch).await;
        self.metrics.record_rename_time(start.elapsed());

        match &result {
            Ok(RenameOutcome::Renamed { from, to }) => {
                tracing::info!("Renamed {} -> {}", from, to);
                self.metrics.record_rename_completed();
                self.state.record_renamed(from, to);
            }
            Ok(RenameOutcome::Unchanged) => {
                tracing::debug!("{} already matches its content", path);
                self.metrics.record_rename_unchanged();
                self.state.record_unchanged(path);
            }
            Err(e) => {
                tracing::warn!("Rename of {} failed: {}", path, e);
                self.metrics.record_rename_failed();
                self.state.record_failed(path, e.to_string());
            }
        }

        result
    }

    async fn execute(
        &self,
        path: &Utf8Path,
        settings: &RenameSettings,
        batch: Option<&BatchContext>,
    ) -> Result<RenameOutcome, StorageError> {
        let content = self.storage.read(path).await?;
        let title = self.sanitizer.derive(&content, settings);
        tracing::debug!("Derived title {:?} for {}", title, path);

        let resolution = match batch {
            Some(ctx) => {
                let mut reserved = ctx.reserved().await;
                let resolution =
                    collision::resolve(self.storage.as_ref(), path, &title, &reserved).await;
                if let Resolution::Target(target) = &resolution {
                    reserved.insert(target.clone());
                }
                resolution
            }
            None => {
                collision::resolve(self.storage.as_ref(), path, &title, &HashSet::new()).await
            }
        };

        let target = match resolution {
            Resolution::Unchanged => return Ok(RenameOutcome::Unchanged),
            Resolution::Target(target) => target,
        };

        if let Err(e) = self.storage.rename(path, &target).await {
            if let Some(ctx) = batch {
                ctx.release(&target).await;
            }
            return Err(e);
        }

        if let Some(ctx) = batch {
            ctx.record_completed();
        }

        Ok(RenameOutcome::Renamed {
            from: path.to_path_buf(),
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStorage;

    fn pipeline(storage: Arc<MemoryStorage>) -> RenamePipeline {
        RenamePipeline::new(
            storage,
            Arc::new(StateManager::new()),
            Arc::new(Metrics::new()),
        )
    }

    #[test]
    fn test_eligibility_rules() {
        let mut settings = RenameSettings::default();
        assert_eq!(
            check_eligibility(Utf8Path::new("image.png"), &settings),
            Eligibility::NotMarkdown
        );
        assert!(check_eligibility(Utf8Path::new("Groceries.md"), &settings).is_eligible());

        settings.skip_named_files = true;
        assert_eq!(
            check_eligibility(Utf8Path::new("Groceries.md"), &settings),
            Eligibility::AlreadyNamed
        );
        assert!(check_eligibility(Utf8Path::new("Untitled 3.md"), &settings).is_eligible());

        settings.include_folders.insert("Journal".to_string());
        assert_eq!(
            check_eligibility(Utf8Path::new("Inbox/Untitled.md"), &settings),
            Eligibility::FolderExcluded
        );
        assert!(check_eligibility(Utf8Path::new("Journal/Untitled.md"), &settings).is_eligible());
    }

    #[tokio::test]
    async fn test_run_renames_to_heading() {
        let storage = Arc::new(MemoryStorage::with_documents([(
            "Inbox/Untitled.md",
            "# Weekly review\n- item",
        )]));
        let pipeline = pipeline(storage.clone());

        let outcome = pipeline
            .run(Utf8Path::new("Inbox/Untitled.md"), &RenameSettings::default(), None)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RenameOutcome::Renamed {
                from: "Inbox/Untitled.md".into(),
                to: "Inbox/Weekly review.md".into()
            }
        );
        assert!(storage.exists(Utf8Path::new("Inbox/Weekly review.md")).await);
        assert_eq!(pipeline.state().read(|s| s.rename_stats()), (1, 0, 0));
    }

    #[tokio::test]
    async fn test_second_run_is_unchanged() {
        let storage = Arc::new(MemoryStorage::with_documents([("draft.md", "Shopping list")]));
        let pipeline = pipeline(storage);
        let settings = RenameSettings::default();

        let first = pipeline.run(Utf8Path::new("draft.md"), &settings, None).await.unwrap();
        assert!(matches!(first, RenameOutcome::Renamed { .. }));

        let second = pipeline
            .run(Utf8Path::new("Shopping list.md"), &settings, None)
            .await
            .unwrap();
        assert_eq!(second, RenameOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_missing_document_propagates_error() {
        let storage = Arc::new(MemoryStorage::new());
        let pipeline = pipeline(storage);

        let err = pipeline
            .run(Utf8Path::new("gone.md"), &RenameSettings::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(pipeline.state().read(|s| s.failed), 1);
    }

    #[tokio::test]
    async fn test_batch_context_claims_target() {
        let storage = Arc::new(MemoryStorage::with_documents([("a.md", "Same")]));
        let pipeline = pipeline(storage);
        let ctx = BatchContext::new();
        ctx.reserved().await.insert("Same.md".into());

        let outcome = pipeline
            .run(Utf8Path::new("a.md"), &RenameSettings::default(), Some(&ctx))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RenameOutcome::Renamed {
                from: "a.md".into(),
                to: "Same (2).md".into()
            }
        );
        assert!(ctx.is_reserved(Utf8Path::new("Same (2).md")).await);
        assert_eq!(ctx.completed(), 1);
    }
}
