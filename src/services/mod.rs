// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod credentials;
pub mod dashboard;
pub mod ingest;
pub mod metrics;
pub mod watcher;

pub use ingest::{ActivityIngestor, IngestOutcome, SweepSummary};
pub use watcher::ActivityWatcher;
