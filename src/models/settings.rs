// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User settings model (a single row).

use serde::{Deserialize, Serialize};

/// The settings row always has this ID.
pub const SETTINGS_ID: i64 = 0;

/// User profile and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub username: String,
    /// Birth date (YYYY-MM-DD)
    pub birth_date: String,
    pub gender: String,
    /// Body weight in kg, used for calorie estimates
    pub weight: f64,
    /// Key for the external map service
    pub map_key: Option<String>,
    /// PBKDF2 password hash
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Key accepted by the upload endpoint
    pub api_key: String,
}

/// Profile fields written by setup and settings updates.
#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub username: String,
    pub birth_date: String,
    pub gender: String,
    pub weight: f64,
    pub map_key: Option<String>,
    /// New password hash; `None` keeps the current one
    pub password_hash: Option<String>,
}
