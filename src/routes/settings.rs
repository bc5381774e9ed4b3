// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile settings and API key management.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Settings, SettingsUpdate};
use crate::services::credentials::{generate_api_key, hash_password};
use crate::AppState;

/// Settings routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/settings/api-key", post(regenerate_api_key))
}

/// Birth dates are plain `YYYY-MM-DD`.
pub fn validate_birth_date(value: &str) -> std::result::Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new("birth_date"))
}

async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<Settings>> {
    let settings = state
        .db
        .get_settings()
        .await?
        .ok_or_else(|| AppError::NotFound("Settings".to_string()))?;
    Ok(Json(settings))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SettingsRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: String,
    #[validate(length(min = 1, max = 32))]
    pub gender: String,
    #[validate(range(min = 20.0, max = 400.0))]
    pub weight: f64,
    #[serde(default)]
    pub map_key: Option<String>,
    /// New password; omitted or empty keeps the current one
    #[serde(default)]
    #[validate(length(max = 256))]
    pub password: Option<String>,
}

/// Update the profile. A weight change recomputes derived calories.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<Settings>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let current = state
        .db
        .get_settings()
        .await?
        .ok_or_else(|| AppError::NotFound("Settings".to_string()))?;

    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) if password.len() < 8 => {
            return Err(AppError::BadRequest(
                "password: must be at least 8 characters".to_string(),
            ));
        }
        Some(password) => Some(hash_password(password).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e))
        })?),
        None => None,
    };

    let update = SettingsUpdate {
        username: req.username,
        birth_date: req.birth_date,
        gender: req.gender,
        weight: req.weight,
        map_key: req.map_key.filter(|k| !k.trim().is_empty()),
        password_hash,
    };
    let settings = state.db.upsert_settings(&update, &current.api_key).await?;

    if settings.weight != current.weight {
        let updated = state.db.recompute_derived_calories(settings.weight).await?;
        tracing::info!(
            user_id = user.user_id,
            old_weight = current.weight,
            new_weight = settings.weight,
            updated,
            "Recomputed derived calories"
        );
    }

    tracing::info!(user_id = user.user_id, "Settings updated");
    Ok(Json(settings))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

/// Replace the upload API key. The old key stops working immediately.
async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiKeyResponse>> {
    let api_key = generate_api_key()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("API key generation failed: {}", e)))?;

    if !state.db.set_api_key(&api_key).await? {
        return Err(AppError::NotFound("Settings".to_string()));
    }

    tracing::info!(user_id = user.user_id, "API key regenerated");
    Ok(Json(ApiKeyResponse { api_key }))
}
