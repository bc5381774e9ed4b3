// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API key middleware for the upload endpoint.

use crate::services::credentials::api_key_matches;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Header carrying the upload API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Require an `x-api-key` header matching one of the stored keys.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .unwrap_or("");

    if presented.is_empty() {
        tracing::warn!("Blocked upload without API key");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let accepted = state.db.find_all_api_keys().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load API keys");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !api_key_matches(presented, &accepted) {
        tracing::warn!("Blocked upload with invalid API key");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
