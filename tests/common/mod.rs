// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use runnerdash::config::Config;
use runnerdash::db::SqliteDb;
use runnerdash::middleware::auth::{create_jwt, SESSION_SECONDS};
use runnerdash::models::{Settings, SettingsUpdate};
use runnerdash::routes::create_router;
use runnerdash::services::credentials::hash_password;
use runnerdash::services::ActivityIngestor;
use runnerdash::AppState;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_USERNAME: &str = "runner";
pub const TEST_PASSWORD: &str = "correct horse battery";
pub const TEST_API_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef";

/// Create a test app backed by a fresh database in a temp directory.
/// Returns the router, the shared state and the directory guard.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, TempDir) {
    create_test_app_with_frontend_url("http://localhost:5173")
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = Config::test_default(dir.path());
    config.frontend_url = frontend_url.to_string();

    let db = SqliteDb::open(&config.db_file).expect("Failed to open test database");
    let ingestor = ActivityIngestor::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        ingestor,
    });

    (create_router(state.clone()), state, dir)
}

/// Store a profile with the test credentials.
#[allow(dead_code)]
pub async fn configure_profile(state: &AppState, weight: f64) -> Settings {
    let update = SettingsUpdate {
        username: TEST_USERNAME.to_string(),
        birth_date: "1985-04-12".to_string(),
        gender: "female".to_string(),
        weight,
        map_key: Some("maps-key".to_string()),
        password_hash: Some(hash_password(TEST_PASSWORD).unwrap()),
    };
    state
        .db
        .create_settings(&update, TEST_API_KEY)
        .await
        .unwrap()
        .expect("profile already configured")
}

/// Session token for the configured profile.
#[allow(dead_code)]
pub fn session_token(state: &AppState) -> String {
    create_jwt(0, &state.config.session_signing_key, SESSION_SECONDS).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn json_body(value: serde_json::Value) -> Body {
    Body::from(serde_json::to_vec(&value).unwrap())
}

/// A running activity document: 5 km in 25 minutes over `points` track
/// points starting at `start`.
///
/// `calories` goes into the lap; 0 means the device did not record any.
/// Heart rate samples are 120, 121, ... when `heart_rate` is set.
#[allow(dead_code)]
pub fn tcx_document(start: &str, points: usize, calories: u32, heart_rate: bool) -> String {
    let start_time: DateTime<Utc> = DateTime::parse_from_rfc3339(start)
        .expect("fixture start must be RFC3339")
        .with_timezone(&Utc);
    let points = points.max(2);
    let step_secs = 1500 / (points as i64 - 1);
    let step_meters = 5000.0 / (points as f64 - 1.0);

    let mut track = String::new();
    for i in 0..points {
        let time = start_time + Duration::seconds(step_secs * i as i64);
        let hr = if heart_rate {
            format!("<HeartRateBpm><Value>{}</Value></HeartRateBpm>", 120 + i)
        } else {
            String::new()
        };
        track.push_str(&format!(
            "<Trackpoint>\
               <Time>{}</Time>\
               <Position>\
                 <LatitudeDegrees>{:.5}</LatitudeDegrees>\
                 <LongitudeDegrees>13.40500</LongitudeDegrees>\
               </Position>\
               <AltitudeMeters>{:.1}</AltitudeMeters>\
               <DistanceMeters>{:.1}</DistanceMeters>\
               {}\
             </Trackpoint>",
            time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            52.52 + i as f64 * 0.0005,
            30.0 + (i % 5) as f64,
            step_meters * i as f64,
            hr
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">
  <Activities>
    <Activity Sport="Running">
      <Id>{start}</Id>
      <Lap StartTime="{start}">
        <TotalTimeSeconds>1500.0</TotalTimeSeconds>
        <DistanceMeters>5000.0</DistanceMeters>
        <Calories>{calories}</Calories>
        <Track>{track}</Track>
      </Lap>
      <Creator><Name>Forerunner 235</Name></Creator>
    </Activity>
  </Activities>
</TrainingCenterDatabase>
"#
    )
}
