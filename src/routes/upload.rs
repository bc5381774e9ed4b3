// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity upload endpoint for devices and sync scripts.
//!
//! The API key middleware is applied in routes/mod.rs.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::services::IngestOutcome;
use crate::AppState;

/// Largest accepted activity document.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/upload", post(upload_activity))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResponse {
    Stored {
        #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
        activity_id: i64,
    },
    Skipped,
}

/// Ingest a raw activity document.
async fn upload_activity(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    if body.is_empty() {
        return Err(AppError::BadRequest("Empty upload".to_string()));
    }

    let size = body.len();
    let outcome = state.ingestor.ingest_bytes(body.to_vec()).await.map_err(|e| {
        tracing::warn!(size, error = %e, "Upload rejected");
        e
    })?;

    let response = match outcome {
        IngestOutcome::Stored(activity_id) => UploadResponse::Stored { activity_id },
        IngestOutcome::Skipped => UploadResponse::Skipped,
    };
    tracing::info!(size, outcome = ?response, "Upload processed");

    Ok(Json(response))
}
