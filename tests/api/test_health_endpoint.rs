// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health endpoint tests for GET /health

use axum::http::StatusCode;
use std::sync::Arc;
use tower::ServiceExt;

use super::support::*;

#[tokio::test]
async fn test_health_ok_with_all_models() {
    let app = app_with(
        Some(MockDetector::new()),
        Some(MockPlateReader::new()),
        Arc::new(StubSources::default()),
    );

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["detector"], true);
    assert_eq!(json["plate_reader"], true);
    assert_eq!(json["frame_source"], "stub");
}

#[tokio::test]
async fn test_health_degraded_without_models() {
    let app = app_with(
        Some(MockDetector::new()),
        None,
        Arc::new(StubSources::default()),
    );

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["detector"], true);
    assert_eq!(json["plate_reader"], false);

    let models = json["models"].as_array().unwrap();
    assert_eq!(models.len(), 2);
    assert!(models
        .iter()
        .any(|m| m["model_type"] == "ocr" && m["available"] == false));
}

#[tokio::test]
async fn test_cors_headers_present() {
    use axum::{body::Body, http::Request};

    let app = app_with(None, None, Arc::new(StubSources::default()));

    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = app_with(None, None, Arc::new(StubSources::default()));

    let response = app.oneshot(get_request("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
