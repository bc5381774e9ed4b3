// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityStats};
use crate::services::dashboard::{
    self, ActivityRow, SpeedPoint, TrackMap, SPEED_CHART_GRANULARITY,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Default window for the recent activities list.
const DEFAULT_RECENT_DAYS: u32 = 7;

/// Largest accepted window, about 100 years.
const MAX_RECENT_DAYS: u32 = 36_500;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(get_activities))
        .route("/api/activities/recent", get(get_recent_activities))
        .route("/api/activities/{id}", get(get_activity_detail))
        .route("/api/map/latest", get(get_latest_map))
        .route("/api/stats", get(get_stats))
}

async fn current_weight(state: &AppState) -> Result<Option<f64>> {
    Ok(state.db.get_settings().await?.map(|s| s.weight))
}

fn to_rows(activities: &[Activity], weight: Option<f64>) -> Result<Vec<ActivityRow>> {
    activities
        .iter()
        .map(|a| dashboard::activity_row(a, weight).map_err(AppError::from))
        .collect()
}

// ─── Activities ──────────────────────────────────────────────

/// All activities as table rows, newest first.
async fn get_activities(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ActivityRow>>> {
    let activities = state.db.find_all_activities().await?;
    let weight = current_weight(&state).await?;
    Ok(Json(to_rows(&activities, weight)?))
}

#[derive(Deserialize)]
struct RecentQuery {
    days: Option<u32>,
}

/// Activities from the last N days (default 7).
async fn get_recent_activities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<ActivityRow>>> {
    let days = query.days.unwrap_or(DEFAULT_RECENT_DAYS);
    if days > MAX_RECENT_DAYS {
        return Err(AppError::BadRequest(format!(
            "days must be at most {}",
            MAX_RECENT_DAYS
        )));
    }

    let activities = state.db.find_past_activities(i64::from(days)).await?;
    let weight = current_weight(&state).await?;
    Ok(Json(to_rows(&activities, weight)?))
}

/// Everything the activity dashboard shows.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityDetailResponse {
    pub row: ActivityRow,
    /// Average/max/min heart rate; `None` when the file had no samples
    pub heart_rate: Option<HeartRateSummary>,
    pub altitude_avg: Option<f64>,
    pub altitude_max: Option<f64>,
    pub altitude_min: Option<f64>,
    pub ascent: Option<f64>,
    pub descent: Option<f64>,
    pub creator: Option<String>,
    pub map: Option<TrackMap>,
    pub speed_chart: Vec<SpeedPoint>,
    pub heart_rate_samples: Vec<u32>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HeartRateSummary {
    pub avg: f64,
    pub max: f64,
    pub min: f64,
}

async fn get_activity_detail(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
) -> Result<Json<ActivityDetailResponse>> {
    let activity = state
        .db
        .get_activity(activity_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;

    let weight = current_weight(&state).await?;
    let row = dashboard::activity_row(&activity, weight)?;
    let track_points = state.db.track_points(activity_id).await?;
    let heart_rate_samples = state.db.heart_rate_values(activity_id).await?;

    let heart_rate = activity.has_heart_rate().then(|| HeartRateSummary {
        avg: activity.heart_rate_avg,
        max: activity.heart_rate_max,
        min: activity.heart_rate_min,
    });

    Ok(Json(ActivityDetailResponse {
        row,
        heart_rate,
        altitude_avg: activity.altitude_avg,
        altitude_max: activity.altitude_max,
        altitude_min: activity.altitude_min,
        ascent: activity.ascent,
        descent: activity.descent,
        creator: activity.creator,
        map: dashboard::track_map(&track_points),
        speed_chart: dashboard::speed_chart(&track_points, SPEED_CHART_GRANULARITY),
        heart_rate_samples,
    }))
}

// ─── Overview Map ────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LatestMapResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub activity_id: i64,
    /// Key for the external map service, if configured
    pub map_key: Option<String>,
    pub map: Option<TrackMap>,
}

/// Map of the most recent activity.
async fn get_latest_map(State(state): State<Arc<AppState>>) -> Result<Json<LatestMapResponse>> {
    let activity = state
        .db
        .find_last_activity()
        .await?
        .ok_or_else(|| AppError::NotFound("No activities yet".to_string()))?;

    let track_points = state.db.track_points(activity.id).await?;

    Ok(Json(LatestMapResponse {
        activity_id: activity.id,
        map_key: state.db.get_map_key().await?,
        map: dashboard::track_map(&track_points),
    }))
}

// ─── Statistics ──────────────────────────────────────────────

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<ActivityStats>> {
    let activities = state.db.find_all_activities().await?;
    let weight = current_weight(&state).await?;
    Ok(Json(dashboard::activity_stats(&activities, weight)?))
}
