//! Activity statistics aggregates for the statistics page.
//!
//! Computed on request from the stored activities; a personal archive is
//! small enough that no stored aggregate is needed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Activity;

/// Totals over a set of activities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    // ─── Totals ──────────────────────────────────────────────────
    pub total_activities: u32,
    /// Meters
    pub total_distance_meters: f64,
    /// Seconds
    pub total_duration_seconds: f64,
    /// Sum over activities with known calories
    pub total_calories: f64,
    /// Activities that have no calorie value yet
    pub activities_without_calories: u32,

    // ─── By Activity Type ────────────────────────────────────────
    pub activities_by_type: BTreeMap<String, u32>,
    /// Meters per activity type
    pub distance_by_type: BTreeMap<String, f64>,

    // ─── Time Series ─────────────────────────────────────────────
    /// Activity count per month ("YYYY-MM")
    pub activities_by_month: BTreeMap<String, u32>,
    /// Meters per month ("YYYY-MM")
    pub distance_by_month: BTreeMap<String, f64>,

    /// Longest distance of a single activity (meters)
    pub longest_distance_meters: f64,
}

impl ActivityStats {
    /// Build stats from a list of activities.
    pub fn from_activities<'a>(activities: impl IntoIterator<Item = &'a Activity>) -> Self {
        let mut stats = Self::default();
        for activity in activities {
            stats.update_from_activity(activity);
        }
        stats
    }

    /// Add one activity to the totals.
    pub fn update_from_activity(&mut self, activity: &Activity) {
        self.total_activities += 1;
        self.total_distance_meters += activity.distance;
        self.total_duration_seconds += activity.duration;
        match activity.calories {
            Some(calories) => self.total_calories += calories,
            None => self.activities_without_calories += 1,
        }

        *self
            .activities_by_type
            .entry(activity.activity_type.clone())
            .or_insert(0) += 1;
        *self
            .distance_by_type
            .entry(activity.activity_type.clone())
            .or_insert(0.0) += activity.distance;

        let month_key = activity.started_at.format("%Y-%m").to_string();
        *self.activities_by_month.entry(month_key.clone()).or_insert(0) += 1;
        *self.distance_by_month.entry(month_key).or_insert(0.0) += activity.distance;

        self.longest_distance_meters = self.longest_distance_meters.max(activity.distance);
    }
}
