// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use runnerdash::error::AppError;
use runnerdash::services::metrics::MetricsError;
use runnerdash::tcx;

async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_client_errors_carry_details() {
    let (status, body) = error_body(AppError::NotFound("Activity 7".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["details"], "Activity 7");

    let (status, body) = error_body(AppError::Conflict("Already set up".to_string())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = error_body(AppError::Unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_parse_error_is_bad_request() {
    let err = tcx::parse_str("<Activities>").unwrap_err();
    let (status, body) = error_body(AppError::from(err)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_activity");
}

#[tokio::test]
async fn test_metrics_error_is_unprocessable() {
    let err = runnerdash::services::metrics::calories(70.0, 0.1, 1800.0, "swimming").unwrap_err();
    assert!(matches!(err, MetricsError::UnknownActivityType(_)));

    let (status, body) = error_body(AppError::from(err)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "metrics_error");
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let (status, body) = error_body(AppError::Database("disk I/O error".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (status, body) = error_body(AppError::Internal(anyhow::anyhow!("boom"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("details").is_none());
}
