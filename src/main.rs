//! autotitle - keep markdown note filenames in sync with their content.
//!
//! Main entry point for the command line application.
//!
//! # Overview
//!
//! This binary wires the library together. It initializes:
//! - Logging infrastructure (file rotation + console output)
//! - Tokio async runtime
//! - Settings loading ([`ConfigManager`])
//! - State and metrics ([`StateManager`], [`Metrics`])
//! - The rename pipeline over a vault on disk ([`FsStorage`])
//!
//! # Commands
//!
//! - `derive <FILE>`: print the name a note's content would get
//! - `rename <VAULT> <NOTE>`: rename one note now
//! - `rename-all <VAULT>`: rename every eligible note concurrently
//! - `watch <VAULT>`: follow edits and rename notes once they settle
//!
//! # Watch flow
//!
//! 1. `notify` reports filesystem events on a background thread
//! 2. Events are forwarded to the runtime over an unbounded channel
//! 3. Content modifications go to the debounced scheduler
//! 4. Created files are polled until content arrives, then renamed
//! 5. Ctrl-C cancels pending work and prints the metrics summary

use anyhow::{Context, Result};
use autotitle::logging::{LOG_PREFIX, LogOptions};
use autotitle::services::{NewDocumentHandle, RequestOutcome};
use autotitle::{
    APP_NAME, ConfigManager, FsStorage, Metrics, RenameMode, RenameOutcome, RenamePipeline,
    RenameScheduler, RenameSettings, Sanitizer, StateManager, VERSION, rename_all,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "autotitle", version, about = "Name markdown notes after their content")]
struct Cli {
    /// Directory holding autotitle.yaml
    #[arg(long, global = true, env = "AUTOTITLE_CONFIG_DIR", default_value = ".")]
    config_dir: Utf8PathBuf,

    /// Directory for rolling log files
    #[arg(long, global = true, env = "AUTOTITLE_LOG_DIR", default_value = "logs")]
    log_dir: Utf8PathBuf,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Only write the log file
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the name derived from a note's content
    Derive { file: Utf8PathBuf },
    /// Rename a single note now
    Rename {
        vault: Utf8PathBuf,
        /// Note path, absolute or relative to the vault
        note: Utf8PathBuf,
    },
    /// Rename every eligible note in the vault
    RenameAll { vault: Utf8PathBuf },
    /// Watch the vault and rename notes as they are edited
    Watch { vault: Utf8PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = autotitle::logging::setup_logging(
        &cli.log_dir,
        LOG_PREFIX,
        LogOptions {
            debug: cli.debug,
            quiet: cli.quiet,
        },
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let settings = config_manager.load_settings()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("autotitle-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run(cli.command, settings));

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    tracing::info!("Shutdown complete");
    result
}

async fn run(command: Command, settings: RenameSettings) -> Result<()> {
    match command {
        Command::Derive { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file))?;
            println!("{}", Sanitizer::new().derive(&content, &settings));
            Ok(())
        }
        Command::Rename { vault, note } => {
            let (storage, metrics) = open_vault(&vault)?;
            let scheduler = scheduler(&storage, &metrics);
            let note = vault_relative(&storage, &note)?;

            match scheduler
                .request(&note, &settings, RenameMode::Immediate)
                .await?
            {
                RequestOutcome::Completed(RenameOutcome::Renamed { from, to }) => {
                    println!("{} -> {}", from, to)
                }
                RequestOutcome::Completed(RenameOutcome::Unchanged) => {
                    println!("{} is already up to date", note)
                }
                RequestOutcome::Ineligible(reason) => println!("{} skipped: {:?}", note, reason),
                RequestOutcome::Armed | RequestOutcome::AwaitingContent => {}
            }
            metrics.log_summary();
            Ok(())
        }
        Command::RenameAll { vault } => {
            let (storage, metrics) = open_vault(&vault)?;
            let scheduler = scheduler(&storage, &metrics);

            let report = rename_all(Arc::clone(scheduler.pipeline()), &settings).await?;
            println!("attempted: {}", report.attempted);
            println!("completed: {}", report.completed);
            for (path, error) in &report.failed {
                eprintln!("failed: {}: {}", path, error);
            }
            metrics.log_summary();
            Ok(())
        }
        Command::Watch { vault } => {
            let (storage, metrics) = open_vault(&vault)?;
            let scheduler = scheduler(&storage, &metrics);
            watch(storage, scheduler, &settings).await?;
            metrics.log_summary();
            Ok(())
        }
    }
}

fn open_vault(vault: &Utf8Path) -> Result<(Arc<FsStorage>, Arc<Metrics>)> {
    let root = vault
        .canonicalize_utf8()
        .with_context(|| format!("Vault not found: {}", vault))?;
    tracing::info!("Using vault at {}", root);
    Ok((Arc::new(FsStorage::new(root)), Arc::new(Metrics::new())))
}

fn scheduler(storage: &Arc<FsStorage>, metrics: &Arc<Metrics>) -> RenameScheduler {
    let pipeline = RenamePipeline::new(
        storage.clone(),
        Arc::new(StateManager::new()),
        Arc::clone(metrics),
    );
    RenameScheduler::new(Arc::new(pipeline))
}

fn vault_relative(storage: &FsStorage, note: &Utf8Path) -> Result<Utf8PathBuf> {
    if note.is_relative() {
        return Ok(note.to_path_buf());
    }
    storage
        .relative(note.as_std_path())
        .with_context(|| format!("{} is outside the vault {}", note, storage.root()))
}

async fn watch(
    storage: Arc<FsStorage>,
    scheduler: RenameScheduler,
    settings: &RenameSettings,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let _ = tx.send(event);
    })
    .context("Failed to create filesystem watcher")?;
    watcher
        .watch(storage.root().as_std_path(), RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", storage.root()))?;

    tracing::info!("Watching {} (Ctrl-C to stop)", storage.root());

    let mut new_documents: Vec<NewDocumentHandle> = Vec::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("Watch error: {}", e);
                        continue;
                    }
                };

                // Our own renames show up as events too.
                if scheduler.is_executing() {
                    continue;
                }

                new_documents.retain(|handle| !handle.is_finished());

                for path in &event.paths {
                    let Some(relative) = storage.relative(path) else { continue };

                    match event.kind {
                        EventKind::Create(CreateKind::File | CreateKind::Any) => {
                            tracing::debug!("Created: {}", relative);
                            new_documents.push(scheduler.watch_new_document(&relative, settings));
                        }
                        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
                            if let Err(e) = scheduler
                                .request(&relative, settings, RenameMode::Debounced)
                                .await
                            {
                                tracing::error!("Failed to schedule {}: {}", relative, e);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping watcher");
                break;
            }
        }
    }

    scheduler.cancel_all();
    for handle in &new_documents {
        handle.cancel();
    }

    Ok(())
}
