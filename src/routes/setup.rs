// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! First-run setup wizard.
//!
//! Only available until a profile exists. Afterwards `POST /setup` answers
//! 409 and profile changes go through `/api/settings`.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::SettingsUpdate;
use crate::routes::settings::validate_birth_date;
use crate::services::credentials::{generate_api_key, hash_password};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/setup", get(setup_status).post(run_setup))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SetupStatus {
    pub first_run: bool,
}

async fn setup_status(State(state): State<Arc<AppState>>) -> Result<Json<SetupStatus>> {
    Ok(Json(SetupStatus {
        first_run: state.db.is_first_run().await?,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetupRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: String,
    #[validate(length(min = 1, max = 32))]
    pub gender: String,
    /// kg
    #[validate(range(min = 20.0, max = 400.0))]
    pub weight: f64,
    #[serde(default)]
    pub map_key: Option<String>,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SetupResponse {
    pub username: String,
    /// Key for device uploads; shown once here and in the settings page
    pub api_key: String,
}

/// Store the initial profile.
async fn run_setup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetupRequest>,
) -> Result<(StatusCode, Json<SetupResponse>)> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let password_hash = hash_password(&req.password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;
    let api_key = generate_api_key()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("API key generation failed: {}", e)))?;

    let update = SettingsUpdate {
        username: req.username,
        birth_date: req.birth_date,
        gender: req.gender,
        weight: req.weight,
        map_key: req.map_key.filter(|k| !k.trim().is_empty()),
        password_hash: Some(password_hash),
    };

    let settings = state
        .db
        .create_settings(&update, &api_key)
        .await?
        .ok_or_else(|| AppError::Conflict("Setup has already been completed".to_string()))?;

    tracing::info!(username = %settings.username, "Initial setup complete");

    Ok((
        StatusCode::CREATED,
        Json(SetupResponse {
            username: settings.username,
            api_key: settings.api_key,
        }),
    ))
}
