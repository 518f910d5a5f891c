use crate::models::{BatchContext, BatchReport, RenameSettings};
use crate::services::pipeline::{RenameOutcome, RenamePipeline};
use crate::services::storage::StorageError;
use std::sync::Arc;

/// Rename every eligible markdown document in the vault.
///
/// All pipeline runs are spawned at once and share one [`BatchContext`], so
/// documents deriving the same title claim `Title.md`, `Title (2).md`, ... in
/// turn even before any of the renames is visible in storage. One failing
/// document never stops the others; failures are collected in the report.
///
/// Only a failure to list the vault is returned as an error.
pub async fn rename_all(
    pipeline: Arc<RenamePipeline>,
    settings: &RenameSettings,
) -> Result<BatchReport, StorageError> {
    let documents = pipeline.storage().list_markdown_documents().await?;
    let total_documents = documents.len();

    let eligible: Vec<_> = documents
        .into_iter()
        .filter(|path| {
            let eligibility = pipeline.eligibility(path, settings);
            if !eligibility.is_eligible() {
                tracing::debug!("Skipping {}: {:?}", path, eligibility);
            }
            eligibility.is_eligible()
        })
        .collect();

    tracing::info!(
        "Renaming {} of {} documents",
        eligible.len(),
        total_documents
    );

    pipeline.metrics().record_batch();
    pipeline.state().start_batch(eligible.len());

    let ctx = Arc::new(BatchContext::new());
    let settings = Arc::new(settings.clone());
    let mut tasks = Vec::with_capacity(eligible.len());

    for path in eligible {
        let pipeline = Arc::clone(&pipeline);
        let ctx = Arc::clone(&ctx);
        let settings = Arc::clone(&settings);

        let task = tokio::spawn(async move {
            let result = pipeline.run(&path, &settings, Some(&ctx)).await;
            let completed = matches!(result, Ok(RenameOutcome::Renamed { .. }));
            pipeline.state().record_batch_attempt(completed);
            (path, result)
        });

        tasks.push(task);
    }

    let mut report = BatchReport::default();

    for task in tasks {
        match task.await {
            Ok((_, Ok(RenameOutcome::Renamed { .. }))) => {
                report.attempted += 1;
                report.completed += 1;
            }
            Ok((_, Ok(RenameOutcome::Unchanged))) => {
                report.attempted += 1;
                report.unchanged += 1;
            }
            Ok((path, Err(e))) => {
                report.attempted += 1;
                report.failed.push((path, e.to_string()));
            }
            Err(e) => {
                tracing::error!("Task join error: {}", e);
            }
        }
    }

    tracing::debug!(
        "Batch context recorded {} renames, {} paths reserved",
        ctx.completed(),
        ctx.reserved().await.len()
    );

    pipeline.state().finish_batch(&report);
    tracing::info!("{}", report.summary());

    Ok(report)
}
