// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Folder watcher tests.
//!
//! Files are linked into the watched folder from a staging folder so that
//! the create event fires for a file that is already complete.

use runnerdash::db::SqliteDb;
use runnerdash::services::ActivityWatcher;
use std::path::Path;
use std::time::Duration;

mod common;

async fn wait_for_count(db: &SqliteDb, expected: u64) -> u64 {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let count = db.count_activities().await.unwrap();
        if count >= expected || tokio::time::Instant::now() >= deadline {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn stage(staging: &Path, name: &str, start: &str) -> std::path::PathBuf {
    let path = staging.join(name);
    std::fs::write(&path, common::tcx_document(start, 3, 0, true)).unwrap();
    path
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_creates_folder_and_sweeps() {
    let (_app, state, _dir) = common::create_test_app();
    let watch_dir = state.config.watch_dir();
    assert!(!watch_dir.exists());

    let watcher = ActivityWatcher::start(&watch_dir, state.ingestor.clone())
        .await
        .unwrap();
    assert!(watch_dir.is_dir());
    assert_eq!(watcher.initial_sweep().files, 0);
    watcher.stop().await;

    // Files present at start are ingested before start returns.
    let starts = [
        "2019-01-05T08:14:03.000Z",
        "2019-01-06T08:14:03.000Z",
        "2019-01-07T08:14:03.000Z",
    ];
    for (i, start) in starts.iter().enumerate() {
        std::fs::write(
            watch_dir.join(format!("run-{i}.tcx")),
            common::tcx_document(start, 3, 0, true),
        )
        .unwrap();
    }
    std::fs::write(watch_dir.join("readme.md"), "# runs").unwrap();
    std::fs::write(watch_dir.join("ride.fit"), [0u8, 1, 2]).unwrap();

    let watcher = ActivityWatcher::start(&watch_dir, state.ingestor.clone())
        .await
        .unwrap();
    assert_eq!(watcher.initial_sweep().stored, 3);
    assert_eq!(state.db.count_activities().await.unwrap(), 3);
    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_created_file_is_ingested() {
    let (_app, state, dir) = common::create_test_app();
    let staging = dir.path().join("staging");
    std::fs::create_dir_all(&staging).unwrap();
    let watch_dir = state.config.watch_dir();

    let watcher = ActivityWatcher::start(&watch_dir, state.ingestor.clone())
        .await
        .unwrap();

    let staged = stage(&staging, "morning.tcx", "2019-01-05T08:14:03.000Z");
    std::fs::hard_link(&staged, watch_dir.join("morning.tcx")).unwrap();

    assert_eq!(wait_for_count(&state.db, 1).await, 1);

    // Same activity under another name is skipped.
    std::fs::hard_link(&staged, watch_dir.join("morning-copy.tcx")).unwrap();
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(state.db.count_activities().await.unwrap(), 1);

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bad_file_does_not_stop_watching() {
    let (_app, state, dir) = common::create_test_app();
    let staging = dir.path().join("staging");
    std::fs::create_dir_all(&staging).unwrap();
    let watch_dir = state.config.watch_dir();

    let watcher = ActivityWatcher::start(&watch_dir, state.ingestor.clone())
        .await
        .unwrap();

    let broken = staging.join("broken.tcx");
    std::fs::write(&broken, "<TrainingCenterDatabase>").unwrap();
    std::fs::hard_link(&broken, watch_dir.join("broken.tcx")).unwrap();

    let good = stage(&staging, "evening.tcx", "2019-01-05T18:00:00.000Z");
    std::fs::hard_link(&good, watch_dir.join("evening.tcx")).unwrap();

    assert_eq!(wait_for_count(&state.db, 1).await, 1);
    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_ingestion_after_stop() {
    let (_app, state, dir) = common::create_test_app();
    let staging = dir.path().join("staging");
    std::fs::create_dir_all(&staging).unwrap();
    let watch_dir = state.config.watch_dir();

    let watcher = ActivityWatcher::start(&watch_dir, state.ingestor.clone())
        .await
        .unwrap();
    watcher.stop().await;

    let staged = stage(&staging, "late.tcx", "2019-01-05T08:14:03.000Z");
    std::fs::hard_link(&staged, watch_dir.join("late.tcx")).unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(state.db.count_activities().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rename_and_modify_are_ignored() {
    use std::io::Write;

    let (_app, state, dir) = common::create_test_app();
    let staging = dir.path().join("staging");
    std::fs::create_dir_all(&staging).unwrap();
    let watch_dir = state.config.watch_dir();
    std::fs::create_dir_all(&watch_dir).unwrap();

    // Present before start but not yet a complete document.
    let existing = watch_dir.join("existing.tcx");
    std::fs::write(&existing, "").unwrap();

    let watcher = ActivityWatcher::start(&watch_dir, state.ingestor.clone())
        .await
        .unwrap();
    assert_eq!(watcher.initial_sweep().failed, 1);

    // Moving a finished file in is a rename, not a create.
    let staged = stage(&staging, "moved.tcx", "2019-01-05T08:14:03.000Z");
    std::fs::rename(&staged, watch_dir.join("moved.tcx")).unwrap();

    // Completing the existing file only modifies it.
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&existing)
        .unwrap();
    file.write_all(common::tcx_document("2019-01-06T08:14:03.000Z", 3, 0, true).as_bytes())
        .unwrap();
    file.sync_all().unwrap();
    drop(file);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(state.db.count_activities().await.unwrap(), 0);

    watcher.stop().await;
}
