// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard API tests: activity table, detail view, overview map and
//! statistics.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, SecondsFormat, Utc};
use runnerdash::services::IngestOutcome;
use serde_json::Value;
use tower::ServiceExt;

mod common;

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn store(state: &runnerdash::AppState, doc: String) -> i64 {
    match state.ingestor.ingest_bytes(doc.into_bytes()).await.unwrap() {
        IngestOutcome::Stored(id) => id,
        IngestOutcome::Skipped => panic!("fixture activity was already stored"),
    }
}

async fn get_json(app: &axum::Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(get_with_bearer(uri, token))
        .await
        .unwrap();
    let status = response.status();
    (status, common::body_json(response).await)
}

#[tokio::test]
async fn test_activity_rows_are_formatted() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;
    let token = common::session_token(&state);

    let older = store(&state, common::tcx_document("2019-01-05T08:14:03.000Z", 3, 412, true)).await;
    let newer = store(&state, common::tcx_document("2019-01-06T18:30:00.000Z", 3, 0, true)).await;

    let (status, rows) = get_json(&app, "/api/activities", &token).await;
    assert_eq!(status, StatusCode::OK);

    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["activity_id"], newer);
    assert_eq!(rows[1]["activity_id"], older);

    let row = &rows[1];
    assert_eq!(row["date"], "Sat 05 Jan 2019");
    assert_eq!(row["start_time"], "08:14");
    assert_eq!(row["type"], "Running");
    assert_eq!(row["distance"], "5.00 km");
    assert_eq!(row["duration"], "25 min 0 sec");
    assert_eq!(row["pace"], "05:00 min/km");
    assert_eq!(row["calories"], 412);

    // Derived at 70 kg: 11.0 * 70 * 1500 / 3600
    assert_eq!(rows[0]["calories"], 321);
}

#[tokio::test]
async fn test_rows_derive_calories_after_setup() {
    let (app, state, _dir) = common::create_test_app();
    store(&state, common::tcx_document("2019-01-05T08:14:03.000Z", 3, 0, false)).await;

    // Profile appears after ingestion; the row derives calories on read.
    common::configure_profile(&state, 70.0).await;
    let token = common::session_token(&state);

    let (_, rows) = get_json(&app, "/api/activities", &token).await;
    assert_eq!(rows[0]["calories"], 321);
}

#[tokio::test]
async fn test_activity_detail() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;
    let token = common::session_token(&state);

    let id = store(&state, common::tcx_document("2019-01-05T08:14:03.000Z", 21, 0, true)).await;

    let (status, detail) = get_json(&app, &format!("/api/activities/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(detail["row"]["activity_id"], id);
    assert_eq!(detail["creator"], "Forerunner 235");
    assert_eq!(detail["heart_rate"]["min"], 120.0);
    assert_eq!(detail["heart_rate"]["max"], 140.0);
    assert_eq!(detail["heart_rate_samples"].as_array().unwrap().len(), 21);

    // 20 segments sampled every 10th: 250 m in 75 s each.
    let chart = detail["speed_chart"].as_array().unwrap();
    assert_eq!(chart.len(), 2);
    assert_eq!(chart[0]["time"], "08:14");
    assert_eq!(chart[0]["speed_kmh"], 12.0);

    let map = &detail["map"];
    assert_eq!(map["path"].as_array().unwrap().len(), 21);
    assert_eq!(map["markers"][0]["label"], "Start!");
    assert_eq!(map["markers"][0]["color"], "green");
    assert_eq!(map["markers"][1]["label"], "End!");
    assert_eq!(map["markers"][1]["color"], "red");
    assert_eq!(map["bounds"][0]["lat"], 52.52);
    assert!(!map["polyline"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_activity_detail_without_heart_rate() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;
    let token = common::session_token(&state);

    let id = store(&state, common::tcx_document("2019-01-05T08:14:03.000Z", 3, 0, false)).await;

    let (_, detail) = get_json(&app, &format!("/api/activities/{id}"), &token).await;
    assert!(detail["heart_rate"].is_null());
    assert_eq!(detail["heart_rate_samples"], serde_json::json!([]));
}

#[tokio::test]
async fn test_missing_activity_is_not_found() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;
    let token = common::session_token(&state);

    let (status, body) = get_json(&app, "/api/activities/999", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_latest_map() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;
    let token = common::session_token(&state);

    let (status, _) = get_json(&app, "/api/map/latest", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    store(&state, common::tcx_document("2019-01-05T08:14:03.000Z", 3, 0, false)).await;
    let latest = store(&state, common::tcx_document("2019-02-05T08:14:03.000Z", 3, 0, false)).await;

    let (status, body) = get_json(&app, "/api/map/latest", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activity_id"], latest);
    assert_eq!(body["map_key"], "maps-key");
    assert_eq!(body["map"]["path"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_recent_activities_window() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;
    let token = common::session_token(&state);

    let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let last_month = (Utc::now() - Duration::days(30)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let recent = store(&state, common::tcx_document(&yesterday, 3, 0, false)).await;
    store(&state, common::tcx_document(&last_month, 3, 0, false)).await;

    let (status, rows) = get_json(&app, "/api/activities/recent", &token).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["activity_id"], recent);

    let (_, rows) = get_json(&app, "/api/activities/recent?days=60", &token).await;
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let (status, _) = get_json(&app, "/api/activities/recent?days=100000", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;
    let token = common::session_token(&state);

    store(&state, common::tcx_document("2019-01-05T08:14:03.000Z", 3, 412, false)).await;
    store(&state, common::tcx_document("2019-02-05T08:14:03.000Z", 3, 0, false)).await;

    let (status, stats) = get_json(&app, "/api/stats", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_activities"], 2);
    assert_eq!(stats["total_distance_meters"], 10000.0);
    assert_eq!(stats["activities_by_type"]["running"], 2);
    assert_eq!(stats["activities_by_month"]["2019-01"], 1);
    assert_eq!(stats["activities_by_month"]["2019-02"], 1);
    assert_eq!(stats["activities_without_calories"], 0);
}
