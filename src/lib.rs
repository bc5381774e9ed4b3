// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runnerdash: a self-hosted dashboard for TCX running activities.
//!
//! This crate watches a folder for activity files, stores derived metrics in
//! SQLite and serves the JSON API behind the dashboard.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod tcx;
pub mod time_utils;

use config::Config;
use db::SqliteDb;
use services::ActivityIngestor;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SqliteDb,
    pub ingestor: ActivityIngestor,
}
