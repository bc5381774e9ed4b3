// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored in the heart rate columns when the file had no heart rate data.
pub const HEART_RATE_UNAVAILABLE: f64 = -1.0;

/// Stored activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Row ID (0 until stored)
    pub id: i64,
    /// Natural key: the `Activity/Id` text of the source file
    pub activity: String,
    /// Lower-cased sport ("running", "biking", ...)
    pub activity_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Distance in meters
    pub distance: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Pace as "mm:ss" per km
    pub pace: String,
    /// Pace in hours per km
    pub pace_hours: f64,
    pub altitude_avg: Option<f64>,
    pub altitude_max: Option<f64>,
    pub altitude_min: Option<f64>,
    pub ascent: Option<f64>,
    pub descent: Option<f64>,
    /// Calories, `None` until they can be derived
    pub calories: Option<f64>,
    /// Whether `calories` was computed from the MET table rather than read
    pub calories_derived: bool,
    /// Heart rate stats, `HEART_RATE_UNAVAILABLE` when not recorded
    pub heart_rate_avg: f64,
    pub heart_rate_max: f64,
    pub heart_rate_min: f64,
    /// Recording device (e.g. "Forerunner 235")
    pub creator: Option<String>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
}

impl Activity {
    pub fn has_heart_rate(&self) -> bool {
        self.heart_rate_avg != HEART_RATE_UNAVAILABLE
    }
}

/// One sample of an activity's track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Meters
    pub altitude: Option<f64>,
    /// Cumulative meters since the start
    pub distance: Option<f64>,
}
