// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity ingestion service.
//!
//! Handles the core workflow:
//! 1. Parse the activity file
//! 2. Aggregate heart rate and settle the calorie value
//! 3. Store activity, track points and heart rate samples atomically
//!
//! Ingestion is idempotent: an activity whose start timestamp is already
//! stored is skipped, so the folder sweep, the watcher and the upload
//! endpoint can all see the same file safely.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::db::{SqliteDb, StoreOutcome};
use crate::error::{AppError, Result};
use crate::models::{Activity, HEART_RATE_UNAVAILABLE};
use crate::services::metrics;
use crate::tcx::{self, TcxActivity};

/// Result of ingesting one activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored under this activity ID
    Stored(i64),
    /// Already present, nothing written
    Skipped,
}

/// Summary of a folder sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Activity files found
    pub files: u32,
    pub stored: u32,
    pub skipped: u32,
    /// Files that failed to parse or store, plus unreadable subfolders
    pub failed: u32,
}

/// Turns parsed activity files into stored activities.
#[derive(Clone)]
pub struct ActivityIngestor {
    db: SqliteDb,
}

impl ActivityIngestor {
    pub fn new(db: SqliteDb) -> Self {
        Self { db }
    }

    /// Store a parsed activity unless it is already present.
    pub async fn ingest(&self, parsed: TcxActivity) -> Result<IngestOutcome> {
        let weight = self.db.get_settings().await?.map(|s| s.weight);
        let activity = build_activity(&parsed, weight);

        let outcome = self
            .db
            .insert_activity_atomic(&activity, &parsed.trackpoints, &parsed.heart_rate)
            .await?;

        match outcome {
            StoreOutcome::Inserted(activity_id) => {
                tracing::info!(
                    activity_id,
                    key = %activity.activity,
                    activity_type = %activity.activity_type,
                    distance = activity.distance,
                    track_points = parsed.trackpoints.len(),
                    "Activity stored"
                );
                Ok(IngestOutcome::Stored(activity_id))
            }
            StoreOutcome::AlreadyExists => {
                tracing::debug!(
                    key = %activity.activity,
                    "Activity already stored (idempotent skip)"
                );
                Ok(IngestOutcome::Skipped)
            }
        }
    }

    /// Parse and store one activity file.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestOutcome> {
        let owned = path.to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || tcx::parse_file(&owned))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Parser task failed: {}", e)))??;

        tracing::debug!(path = %path.display(), key = %parsed.id, "Parsed activity file");
        self.ingest(parsed).await
    }

    /// Parse and store an activity document received as raw bytes.
    ///
    /// The bytes go through a temporary file that is removed on every path
    /// out of this function.
    pub async fn ingest_bytes(&self, bytes: Vec<u8>) -> Result<IngestOutcome> {
        let parsed = tokio::task::spawn_blocking(move || -> Result<TcxActivity> {
            let mut file = tempfile::Builder::new()
                .prefix("runnerdash-upload-")
                .suffix(".tcx")
                .tempfile()
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Temp file failed: {}", e)))?;
            file.write_all(&bytes)
                .and_then(|_| file.flush())
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Temp file write failed: {}", e)))?;
            Ok(tcx::parse_file(file.path())?)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Parser task failed: {}", e)))??;

        self.ingest(parsed).await
    }

    /// Ingest every activity file below `dir`.
    ///
    /// A failing file is logged and counted; it does not stop the sweep.
    pub async fn ingest_folder(&self, dir: &Path) -> Result<SweepSummary> {
        let root = dir.to_path_buf();
        let scan = tokio::task::spawn_blocking(move || collect_activity_files(&root))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Folder scan failed: {}", e)))?
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "Failed to read folder {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        let files = scan.files;
        let mut summary = SweepSummary {
            files: files.len() as u32,
            failed: scan.unreadable,
            ..Default::default()
        };

        for file in &files {
            match self.ingest_file(file).await {
                Ok(IngestOutcome::Stored(_)) => summary.stored += 1,
                Ok(IngestOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(path = %file.display(), error = %e, "Failed to ingest file");
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            files = summary.files,
            stored = summary.stored,
            skipped = summary.skipped,
            failed = summary.failed,
            "Folder sweep complete"
        );

        Ok(summary)
    }
}

/// Build the activity row from a parsed file.
///
/// Calories from the file win when positive. Otherwise they are derived
/// from `weight_kg` when possible, else left for the query layer.
fn build_activity(parsed: &TcxActivity, weight_kg: Option<f64>) -> Activity {
    let (calories, calories_derived) = if parsed.calories > 0.0 {
        (Some(parsed.calories), false)
    } else {
        match weight_kg.map(|weight| {
            metrics::calories(
                weight,
                parsed.pace_hours,
                parsed.duration,
                &parsed.activity_type,
            )
        }) {
            Some(Ok(calories)) => (Some(calories), true),
            Some(Err(e)) => {
                tracing::debug!(key = %parsed.id, error = %e, "Calories not derivable at ingest");
                (None, false)
            }
            None => (None, false),
        }
    };

    Activity {
        id: 0,
        activity: parsed.id.clone(),
        activity_type: parsed.activity_type.clone(),
        started_at: parsed.started_at,
        completed_at: parsed.completed_at,
        distance: parsed.distance,
        duration: parsed.duration,
        pace: parsed.pace.clone(),
        pace_hours: parsed.pace_hours,
        altitude_avg: parsed.altitude_avg,
        altitude_max: parsed.altitude_max,
        altitude_min: parsed.altitude_min,
        ascent: parsed.ascent,
        descent: parsed.descent,
        calories,
        calories_derived,
        heart_rate_avg: parsed.hr_avg().unwrap_or(HEART_RATE_UNAVAILABLE),
        heart_rate_max: parsed.hr_max().unwrap_or(HEART_RATE_UNAVAILABLE),
        heart_rate_min: parsed.hr_min().unwrap_or(HEART_RATE_UNAVAILABLE),
        creator: parsed.creator.clone(),
        start_latitude: parsed.start_latitude,
        start_longitude: parsed.start_longitude,
    }
}

struct FolderScan {
    files: Vec<PathBuf>,
    /// Nested folders or entries that could not be read
    unreadable: u32,
}

/// Find activity files below `dir`, sorted by path.
///
/// Only an unreadable `dir` is an error; anything below it that cannot be
/// read is logged and counted.
fn collect_activity_files(dir: &Path) -> std::io::Result<FolderScan> {
    let mut scan = FolderScan {
        files: Vec::new(),
        unreadable: 0,
    };
    let mut pending = Vec::new();

    read_folder(dir, std::fs::read_dir(dir)?, &mut scan, &mut pending);
    while let Some(current) = pending.pop() {
        match std::fs::read_dir(&current) {
            Ok(entries) => read_folder(&current, entries, &mut scan, &mut pending),
            Err(e) => {
                scan.unreadable += 1;
                tracing::warn!(path = %current.display(), error = %e, "Skipping unreadable folder");
            }
        }
    }

    scan.files.sort();
    Ok(scan)
}

fn read_folder(
    current: &Path,
    entries: std::fs::ReadDir,
    scan: &mut FolderScan,
    pending: &mut Vec<PathBuf>,
) {
    for entry in entries {
        let entry = match entry.and_then(|e| e.file_type().map(|t| (e.path(), t))) {
            Ok(entry) => entry,
            Err(e) => {
                scan.unreadable += 1;
                tracing::warn!(path = %current.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        match entry {
            (path, file_type) if file_type.is_dir() => pending.push(path),
            (path, _) if tcx::has_tcx_extension(&path) => scan.files.push(path),
            _ => {}
        }
    }
}
