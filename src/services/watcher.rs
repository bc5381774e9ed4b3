// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Watch the activity folder and ingest new files as they appear.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::services::ingest::{ActivityIngestor, IngestOutcome, SweepSummary};
use crate::tcx;

/// Wait between a create event and reading the file, so the writer can
/// finish.
const CREATE_SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Running folder watcher.
///
/// Dropping it without calling [`ActivityWatcher::stop`] ends the background
/// task without waiting for it.
pub struct ActivityWatcher {
    dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    initial_sweep: SweepSummary,
}

impl ActivityWatcher {
    /// Create the folder if needed, start watching it and sweep the files
    /// already there.
    ///
    /// The watch is registered before the sweep, so a file created while the
    /// sweep runs may be seen twice; ingestion skips the duplicate.
    pub async fn start(dir: &Path, ingestor: ActivityIngestor) -> Result<Self> {
        create_watch_dir(dir)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means we are shutting down.
            let _ = event_tx.send(res);
        })
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create watcher: {}", e)))?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "Failed to watch {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(watch_loop(ingestor.clone(), event_rx, shutdown_rx));

        tracing::info!(dir = %dir.display(), "Watching activity folder");

        let initial_sweep = ingestor.ingest_folder(dir).await?;

        Ok(Self {
            dir: dir.to_path_buf(),
            watcher: Some(watcher),
            shutdown_tx,
            handle: Some(handle),
            initial_sweep,
        })
    }

    /// Result of the sweep done by [`ActivityWatcher::start`].
    pub fn initial_sweep(&self) -> &SweepSummary {
        &self.initial_sweep
    }

    /// Stop watching and wait for the background task to finish.
    ///
    /// No ingestion triggered by the watcher runs after this returns.
    pub async fn stop(mut self) {
        // Dropping the OS watcher releases its event sender.
        self.watcher.take();
        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Watcher task failed to join");
            }
        }
        tracing::info!(dir = %self.dir.display(), "Stopped watching activity folder");
    }
}

async fn watch_loop(
    ingestor: ActivityIngestor,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Watcher error");
                continue;
            }
        };

        if !matches!(event.kind, EventKind::Create(_)) {
            continue;
        }

        for path in event.paths.iter().filter(|p| tcx::has_tcx_extension(p)) {
            tokio::select! {
                biased;
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(CREATE_SETTLE_DELAY) => {}
            }

            match ingestor.ingest_file(path).await {
                Ok(IngestOutcome::Stored(activity_id)) => {
                    tracing::info!(path = %path.display(), activity_id, "Ingested new file");
                }
                Ok(IngestOutcome::Skipped) => {
                    tracing::debug!(path = %path.display(), "New file already ingested");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to ingest new file");
                }
            }
        }
    }

    tracing::debug!("Watcher loop exiting");
}

fn create_watch_dir(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir).map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "Failed to create {}: {}",
            dir.display(),
            e
        ))
    })
}
