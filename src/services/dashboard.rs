// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View models for the dashboard: activity table rows, speed charts and
//! track maps.

use geo::{BoundingRect, Coord, LineString};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{Activity, ActivityStats, TrackPoint};
use crate::services::metrics::{self, MetricsError};
use crate::time_utils::{format_clock, format_table_date};

/// Default sampling step for speed charts.
pub const SPEED_CHART_GRANULARITY: usize = 10;

/// Polyline precision understood by common map services.
const POLYLINE_PRECISION: u32 = 5;

// ─── Activity Table ──────────────────────────────────────────

/// One row of the activity table, formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityRow {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub activity_id: i64,
    /// e.g. "Sat 05 Jan 2019"
    pub date: String,
    /// e.g. "08:14"
    pub start_time: String,
    /// e.g. "Running"
    #[serde(rename = "type")]
    pub activity_type: String,
    /// e.g. "5.00 km"
    pub distance: String,
    /// e.g. "25 min 0 sec"
    pub duration: String,
    /// e.g. "05:00 min/km"
    pub pace: String,
    /// Rounded kcal; `None` when no weight is known to derive them
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub calories: Option<i64>,
}

/// Format an activity for the table.
///
/// Stored calories are used when present. Otherwise they are derived from
/// `weight_kg`; an activity type without a MET table is an error.
pub fn activity_row(activity: &Activity, weight_kg: Option<f64>) -> Result<ActivityRow, MetricsError> {
    let calories = match (activity.calories, weight_kg) {
        (Some(calories), _) => Some(calories),
        (None, Some(weight)) => Some(metrics::calories(
            weight,
            activity.pace_hours,
            activity.duration,
            &activity.activity_type,
        )?),
        (None, None) => None,
    };

    Ok(ActivityRow {
        activity_id: activity.id,
        date: format_table_date(activity.started_at),
        start_time: format_clock(activity.started_at),
        activity_type: capitalize(&activity.activity_type),
        distance: format!("{:.2} km", activity.distance / 1000.0),
        duration: metrics::format_duration(activity.started_at, activity.completed_at),
        pace: format!("{} min/km", activity.pace),
        calories: calories.map(|c| c.round() as i64),
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ─── Speed Chart ─────────────────────────────────────────────

/// One sampled segment of the speed chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SpeedPoint {
    /// "HH:MM" of the segment start
    pub time: String,
    /// km/h, one decimal
    pub speed_kmh: f64,
}

/// Sample every `granularity`-th segment between consecutive track points.
///
/// Segments without a finite speed (no distance, zero duration) are
/// dropped together with their time label.
pub fn speed_chart(track_points: &[TrackPoint], granularity: usize) -> Vec<SpeedPoint> {
    let step = granularity.max(1);

    track_points
        .windows(2)
        .step_by(step)
        .filter_map(|pair| {
            let (from, to) = (&pair[0], &pair[1]);
            let meters = to.distance? - from.distance?;
            let seconds = (to.timestamp - from.timestamp).num_milliseconds() as f64 / 1000.0;
            let speed = meters / seconds * 3.6;
            speed.is_finite().then(|| SpeedPoint {
                time: format_clock(from.timestamp),
                speed_kmh: (speed * 10.0).round() / 10.0,
            })
        })
        .collect()
}

// ─── Track Map ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MapMarker {
    pub position: LatLng,
    pub color: String,
    pub label: String,
}

/// Map description for one activity track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrackMap {
    /// Middle point of the path
    pub center: LatLng,
    pub path: Vec<LatLng>,
    pub markers: Vec<MapMarker>,
    /// Encoded polyline of the path
    pub polyline: String,
    /// South-west and north-east corners
    pub bounds: [LatLng; 2],
}

/// Build the map for a track. `None` if no track point has a position.
pub fn track_map(track_points: &[TrackPoint]) -> Option<TrackMap> {
    let path: Vec<LatLng> = track_points
        .iter()
        .filter_map(|tp| match (tp.latitude, tp.longitude) {
            (Some(lat), Some(lng)) => Some(LatLng { lat, lng }),
            _ => None,
        })
        .collect();

    let start = *path.first()?;
    let end = *path.last()?;
    let center = path[path.len() / 2];

    let line: LineString<f64> = path
        .iter()
        .map(|p| Coord { x: p.lng, y: p.lat })
        .collect();
    let rect = line.bounding_rect()?;

    let polyline = match polyline::encode_coordinates(line.0.iter().copied(), POLYLINE_PRECISION) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode track polyline");
            String::new()
        }
    };

    Some(TrackMap {
        center,
        markers: vec![
            MapMarker {
                position: start,
                color: "green".to_string(),
                label: "Start!".to_string(),
            },
            MapMarker {
                position: end,
                color: "red".to_string(),
                label: "End!".to_string(),
            },
        ],
        path,
        polyline,
        bounds: [
            LatLng {
                lat: rect.min().y,
                lng: rect.min().x,
            },
            LatLng {
                lat: rect.max().y,
                lng: rect.max().x,
            },
        ],
    })
}

// ─── Statistics ──────────────────────────────────────────────

/// Aggregate statistics, filling in calories the way the table does.
pub fn activity_stats(
    activities: &[Activity],
    weight_kg: Option<f64>,
) -> Result<ActivityStats, MetricsError> {
    let mut stats = ActivityStats::default();
    for activity in activities {
        if activity.calories.is_none() {
            if let Some(weight) = weight_kg {
                let mut filled = activity.clone();
                filled.calories = Some(metrics::calories(
                    weight,
                    activity.pace_hours,
                    activity.duration,
                    &activity.activity_type,
                )?);
                stats.update_from_activity(&filled);
                continue;
            }
        }
        stats.update_from_activity(activity);
    }
    Ok(stats)
}
