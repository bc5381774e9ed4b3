// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Derived activity metrics: calories and human-readable durations.

use chrono::{DateTime, Utc};

/// MET factors for running, keyed by reference speed in km/h (ascending).
const RUNNING_MET: &[(f64, f64)] = &[
    (4.0, 3.0),
    (4.5, 3.5),
    (6.4, 6.0),
    (8.0, 8.3),
    (9.5, 9.8),
    (11.2, 11.0),
    (12.9, 11.8),
    (14.5, 12.8),
    (16.0, 14.5),
    (17.7, 16.0),
    (19.3, 19.0),
    (20.9, 19.8),
    (22.5, 23.0),
];

/// Errors from metric derivation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("no MET table for activity type {0:?}")]
    UnknownActivityType(String),

    #[error("pace must be positive, got {0} h/km")]
    InvalidPace(f64),
}

/// MET table for an activity type.
pub fn met_table(activity_type: &str) -> Option<&'static [(f64, f64)]> {
    match activity_type {
        "running" => Some(RUNNING_MET),
        _ => None,
    }
}

/// Pick the MET of the reference speed closest to `speed`.
///
/// Ties go to the first (slowest) entry.
pub fn nearest_met(table: &[(f64, f64)], speed: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for &(reference, met) in table {
        let distance = (reference - speed).abs();
        match best {
            Some((best_distance, _)) if distance >= best_distance => {}
            _ => best = Some((distance, met)),
        }
    }
    best.map(|(_, met)| met)
}

/// Estimate calories burned.
///
/// `pace_hours` is hours per km, so its inverse is the speed in km/h.
pub fn calories(
    weight_kg: f64,
    pace_hours: f64,
    duration_seconds: f64,
    activity_type: &str,
) -> Result<f64, MetricsError> {
    let table = met_table(activity_type)
        .ok_or_else(|| MetricsError::UnknownActivityType(activity_type.to_string()))?;
    if !pace_hours.is_finite() || pace_hours <= 0.0 {
        return Err(MetricsError::InvalidPace(pace_hours));
    }

    let speed = 1.0 / pace_hours;
    let met = nearest_met(table, speed)
        .ok_or_else(|| MetricsError::UnknownActivityType(activity_type.to_string()))?;
    Ok(met * weight_kg * duration_seconds / 3600.0)
}

/// Render the time between two instants as "N sec" or "M min S sec".
///
/// Hours are not rendered: 3725 seconds reads "2 min 5 sec".
pub fn format_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format_seconds((end - start).num_seconds())
}

fn format_seconds(duration: i64) -> String {
    if duration < 60 {
        format!("{} sec", duration)
    } else {
        format!("{} min {} sec", (duration % 3600) / 60, duration % 60)
    }
}
