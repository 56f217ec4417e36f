// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Realtime endpoint tests for GET /realtime

use axum::http::StatusCode;
use std::sync::Arc;
use tower::ServiceExt;
use traffic_sentinel::create_app;

use super::support::*;

#[tokio::test]
async fn test_camera_unavailable_returns_500() {
    let app = app_with(
        Some(detector_returning(vec![])),
        Some(reader_returning(&[])),
        Arc::new(StubSources::default()),
    );

    let response = app.oneshot(get_request("/realtime")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "Unable to access the camera" })
    );
}

#[tokio::test]
async fn test_camera_checked_before_models() {
    let app = app_with(None, None, Arc::new(StubSources::default()));

    let response = app.oneshot(get_request("/realtime")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Unable to access the camera"
    );
}

#[tokio::test]
async fn test_models_missing_returns_503() {
    let app = app_with(None, None, Arc::new(StubSources::camera(3)));

    let response = app.oneshot(get_request("/realtime")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_stops_at_max_frames() {
    let app = app_with(
        Some(detector_returning(vec![helmet_box(), plate_box()])),
        Some(reader_returning(&["GJ05"])),
        Arc::new(StubSources::camera(10)),
    );

    let response = app
        .oneshot(get_request("/realtime?max_frames=3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["frames_processed"], 3);
    assert_eq!(json["stop_reason"], "frame_limit");
    assert_eq!(json["results"].as_array().unwrap().len(), 3);
    assert_eq!(json["results"][0]["plate_number"], "GJ05");
}

#[tokio::test]
async fn test_stream_end_stops_loop() {
    let app = app_with(
        Some(detector_returning(vec![])),
        Some(reader_returning(&[])),
        Arc::new(StubSources::camera(2)),
    );

    let response = app.oneshot(get_request("/realtime")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["frames_processed"], 2);
    assert_eq!(json["stop_reason"], "end_of_stream");
    assert_eq!(json["results"], serde_json::json!([]));
}

#[tokio::test]
async fn test_frames_resized_to_realtime_size() {
    let mut detector = MockDetector::new();
    detector
        .expect_detect()
        .withf(|frame| frame.width() == 640 && frame.height() == 480)
        .times(2)
        .returning(|_| Ok(vec![]));

    let app = app_with(
        Some(detector),
        Some(reader_returning(&[])),
        Arc::new(StubSources::camera(2)),
    );

    let response = app.oneshot(get_request("/realtime")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_server_shutdown_cancels_loop() {
    let state = state_with(
        Some(detector_returning(vec![])),
        Some(reader_returning(&[])),
        Arc::new(StubSources::camera(100)),
    );
    state.shutdown.cancel();
    let app = create_app(state);

    let response = app.oneshot(get_request("/realtime")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["frames_processed"], 0);
    assert_eq!(json["stop_reason"], "cancelled");
}

#[tokio::test]
async fn test_zero_max_frames_rejected() {
    let app = app_with(None, None, Arc::new(StubSources::camera(1)));

    let response = app
        .oneshot(get_request("/realtime?max_frames=0"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("max_frames"));
}

#[tokio::test]
async fn test_malformed_query_rejected() {
    let app = app_with(None, None, Arc::new(StubSources::camera(1)));

    let response = app
        .oneshot(get_request("/realtime?duration_secs=soon"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}
