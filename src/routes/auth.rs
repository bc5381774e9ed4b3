// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Username/password session routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, REMEMBER_SECONDS, SESSION_COOKIE, SESSION_SECONDS};
use crate::services::credentials::verify_password;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
    /// Keep the session for 30 days instead of the browser session
    #[serde(default)]
    remember: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub username: String,
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Check credentials and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let Some((user_id, hash)) = state.db.get_user_credentials(&req.username).await? else {
        tracing::warn!(username = %req.username, "Login for unknown user");
        return Err(AppError::Unauthorized);
    };

    let valid = verify_password(&req.password, &hash).map_err(|e| {
        tracing::error!(error = %e, "Stored password hash is unreadable");
        AppError::Internal(anyhow::anyhow!("Stored password hash is unreadable"))
    })?;
    if !valid {
        tracing::warn!(username = %req.username, "Login with wrong password");
        return Err(AppError::Unauthorized);
    }

    let lifetime = if req.remember {
        REMEMBER_SECONDS
    } else {
        SESSION_SECONDS
    };
    let jwt = create_jwt(user_id, &state.config.session_signing_key, lifetime)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let mut cookie = session_cookie(jwt);
    if req.remember {
        cookie.set_max_age(time::Duration::seconds(REMEMBER_SECONDS));
    }

    tracing::info!(username = %req.username, remember = req.remember, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            username: req.username,
        }),
    ))
}

/// End the session by clearing the cookie.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(session_cookie(String::new())),
        StatusCode::NO_CONTENT,
    )
}
