// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Training Center XML (TCX) activity parser.
//!
//! Only the first `Activities/Activity` of a document is read. Elements are
//! matched by local name in the TCX namespace (or no namespace), so vendor
//! extension elements such as `ns3:TPX/ns3:Speed` never shadow the core
//! ones.

use crate::models::TrackPoint;
use crate::time_utils::parse_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};
use roxmltree::{Document, Node};
use std::path::Path;

/// TCX v2 namespace.
pub const TCX_NAMESPACE: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";

/// File extension of ingestible activity files.
pub const TCX_EXTENSION: &str = "tcx";

/// One parsed activity file.
#[derive(Debug, Clone, PartialEq)]
pub struct TcxActivity {
    /// `Activity/Id` text, the natural key of the activity
    pub id: String,
    /// Lower-cased `Sport` attribute ("running", "biking", ...)
    pub activity_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Meters
    pub distance: f64,
    /// Seconds, summed over laps
    pub duration: f64,
    /// Summed over laps, 0 when the device did not record any
    pub calories: f64,
    /// "mm:ss" per km
    pub pace: String,
    pub pace_hours: f64,
    pub altitude_avg: Option<f64>,
    pub altitude_max: Option<f64>,
    pub altitude_min: Option<f64>,
    pub ascent: Option<f64>,
    pub descent: Option<f64>,
    pub creator: Option<String>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    /// Samples in document order
    pub trackpoints: Vec<TrackPoint>,
    /// Per-trackpoint heart rate readings in document order
    pub heart_rate: Vec<u32>,
}

impl TcxActivity {
    pub fn hr_avg(&self) -> Option<f64> {
        if self.heart_rate.is_empty() {
            return None;
        }
        let sum: u64 = self.heart_rate.iter().map(|&v| u64::from(v)).sum();
        Some(sum as f64 / self.heart_rate.len() as f64)
    }

    pub fn hr_max(&self) -> Option<f64> {
        self.heart_rate.iter().max().map(|&v| f64::from(v))
    }

    pub fn hr_min(&self) -> Option<f64> {
        self.heart_rate.iter().min().map(|&v| f64::from(v))
    }
}

/// Errors from parsing an activity file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("missing required element: {0}")]
    Missing(&'static str),

    #[error("invalid value for {field}: {value:?}")]
    Invalid { field: &'static str, value: String },

    #[error("activity has no distance")]
    ZeroDistance,

    #[error("activity has no duration")]
    ZeroDuration,
}

/// Parse an activity file from disk.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<TcxActivity, ParseError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&xml)
}

/// True if the path has the activity file extension (any case).
pub fn has_tcx_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TCX_EXTENSION))
}

/// Parse an activity document.
pub fn parse_str(xml: &str) -> Result<TcxActivity, ParseError> {
    let doc = Document::parse(xml)?;

    let activity = doc
        .descendants()
        .find(|n| is_tcx(n, "Activity") && n.parent().is_some_and(|p| is_tcx(&p, "Activities")))
        .ok_or(ParseError::Missing("Activities/Activity"))?;

    let id = child(activity, "Id")
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::Missing("Activity/Id"))?
        .to_string();
    let started_at = parse_utc_rfc3339(&id).ok_or_else(|| ParseError::Invalid {
        field: "Activity/Id",
        value: id.clone(),
    })?;

    let activity_type = activity
        .attribute("Sport")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::Missing("Activity@Sport"))?
        .to_lowercase();

    let laps: Vec<Node> = activity.children().filter(|n| is_tcx(n, "Lap")).collect();
    if laps.is_empty() {
        return Err(ParseError::Missing("Activity/Lap"));
    }

    let mut duration = 0.0;
    let mut calories = 0.0;
    let mut lap_distance = 0.0;
    for lap in &laps {
        duration += child_f64(*lap, "TotalTimeSeconds")?
            .ok_or(ParseError::Missing("Lap/TotalTimeSeconds"))?;
        calories += child_f64(*lap, "Calories")?.unwrap_or(0.0);
        lap_distance += child_f64(*lap, "DistanceMeters")?.unwrap_or(0.0);
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ParseError::ZeroDuration);
    }

    let mut trackpoints = Vec::new();
    let mut heart_rate = Vec::new();
    for node in activity.descendants().filter(|n| is_tcx(n, "Trackpoint")) {
        let (point, bpm) = parse_trackpoint(node)?;
        trackpoints.push(point);
        heart_rate.extend(bpm);
    }

    let distance = trackpoints
        .iter()
        .rev()
        .find_map(|tp| tp.distance)
        .unwrap_or(lap_distance);
    if !distance.is_finite() || distance <= 0.0 {
        return Err(ParseError::ZeroDistance);
    }

    let pace = format_pace(duration / (distance / 1000.0));
    let pace_hours = pace_hours(&pace)?;
    // Under a second per km truncates to "00:00".
    if pace_hours <= 0.0 {
        return Err(ParseError::Invalid {
            field: "pace",
            value: pace,
        });
    }

    let completed_at = trackpoints
        .last()
        .map(|tp| tp.timestamp)
        .unwrap_or_else(|| started_at + Duration::milliseconds((duration * 1000.0) as i64));

    let altitudes: Vec<f64> = trackpoints.iter().filter_map(|tp| tp.altitude).collect();
    let (ascent, descent) = climb(&altitudes);

    let start = trackpoints
        .iter()
        .find(|tp| tp.latitude.is_some() && tp.longitude.is_some());

    let creator = child(activity, "Creator")
        .and_then(|c| child(c, "Name"))
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(TcxActivity {
        id,
        activity_type,
        started_at,
        completed_at,
        distance,
        duration,
        calories,
        pace,
        pace_hours,
        altitude_avg: mean(&altitudes),
        altitude_max: altitudes.iter().copied().reduce(f64::max),
        altitude_min: altitudes.iter().copied().reduce(f64::min),
        ascent,
        descent,
        creator,
        start_latitude: start.and_then(|tp| tp.latitude),
        start_longitude: start.and_then(|tp| tp.longitude),
        trackpoints,
        heart_rate,
    })
}

/// Convert a colon-separated pace ("mm:ss", or "hh:mm:ss") to hours.
pub fn pace_hours(pace: &str) -> Result<f64, ParseError> {
    let mut seconds = 0.0;
    for (place, component) in pace.split(':').rev().enumerate() {
        let value: u64 = component.trim().parse().map_err(|_| ParseError::Invalid {
            field: "pace",
            value: pace.to_string(),
        })?;
        seconds += value as f64 * 60f64.powi(place as i32);
    }
    Ok(seconds / 3600.0)
}

/// Render seconds-per-km as "mm:ss", truncating fractional seconds.
fn format_pace(seconds_per_km: f64) -> String {
    let total = seconds_per_km.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn parse_trackpoint(node: Node) -> Result<(TrackPoint, Option<u32>), ParseError> {
    let time_text = child(node, "Time")
        .and_then(|n| n.text())
        .ok_or(ParseError::Missing("Trackpoint/Time"))?;
    let timestamp = parse_utc_rfc3339(time_text).ok_or_else(|| ParseError::Invalid {
        field: "Trackpoint/Time",
        value: time_text.to_string(),
    })?;

    let (latitude, longitude) = match child(node, "Position") {
        Some(pos) => (
            child_f64(pos, "LatitudeDegrees")?,
            child_f64(pos, "LongitudeDegrees")?,
        ),
        None => (None, None),
    };

    let bpm = match child(node, "HeartRateBpm").and_then(|hr| child(hr, "Value")) {
        Some(value) => {
            let text = value.text().unwrap_or("").trim();
            Some(text.parse::<u32>().map_err(|_| ParseError::Invalid {
                field: "HeartRateBpm/Value",
                value: text.to_string(),
            })?)
        }
        None => None,
    };

    Ok((
        TrackPoint {
            timestamp,
            latitude,
            longitude,
            altitude: child_f64(node, "AltitudeMeters")?,
            distance: child_f64(node, "DistanceMeters")?,
        },
        bpm,
    ))
}

/// Sum of positive and of negative altitude steps.
fn climb(altitudes: &[f64]) -> (Option<f64>, Option<f64>) {
    if altitudes.is_empty() {
        return (None, None);
    }
    let (mut up, mut down) = (0.0, 0.0);
    for pair in altitudes.windows(2) {
        let step = pair[1] - pair[0];
        if step > 0.0 {
            up += step;
        } else {
            down -= step;
        }
    }
    (Some(up), Some(down))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn is_tcx(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && matches!(node.tag_name().namespace(), None | Some(TCX_NAMESPACE))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_tcx(n, name))
}

fn child_f64(node: Node, name: &'static str) -> Result<Option<f64>, ParseError> {
    match child(node, name) {
        None => Ok(None),
        Some(n) => {
            let text = n.text().unwrap_or("").trim();
            text.parse::<f64>()
                .map(Some)
                .map_err(|_| ParseError::Invalid {
                    field: name,
                    value: text.to_string(),
                })
        }
    }
}
