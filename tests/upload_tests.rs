// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upload endpoint tests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

mod common;

fn upload(api_key: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("x-api-key", api_key)
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn test_upload_stores_then_skips() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;
    let doc = common::tcx_document("2019-01-05T08:14:03.000Z", 3, 0, true);

    let response = app
        .clone()
        .oneshot(upload(common::TEST_API_KEY, doc.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["status"], "stored");
    let id = body["activity_id"].as_i64().unwrap();

    let response = app
        .oneshot(upload(common::TEST_API_KEY, doc))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["status"], "skipped");

    assert_eq!(state.db.count_activities().await.unwrap(), 1);
    assert!(state.db.get_activity(id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_upload_rejects_malformed_document() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;

    let response = app
        .oneshot(upload(common::TEST_API_KEY, "<TrainingCenterDatabase>"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_json(response).await["error"], "invalid_activity");
    assert_eq!(state.db.count_activities().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upload_rejects_empty_body() {
    let (app, state, _dir) = common::create_test_app();
    common::configure_profile(&state, 70.0).await;

    let response = app
        .oneshot(upload(common::TEST_API_KEY, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_upload_before_setup_rejects_any_key() {
    let (app, state, _dir) = common::create_test_app();
    let doc = common::tcx_document("2019-01-05T08:14:03.000Z", 3, 0, true);

    let response = app
        .oneshot(upload(common::TEST_API_KEY, doc))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.db.count_activities().await.unwrap(), 0);
}
