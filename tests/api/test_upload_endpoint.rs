// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Upload endpoint tests for POST /upload and POST /process_video

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use std::sync::Arc;
use tower::ServiceExt;
use traffic_sentinel::{api::create_app, ServiceConfig};

use super::support::*;

#[tokio::test]
async fn test_missing_file_part() {
    let app = app_with(None, None, Arc::new(StubSources::files(1)));

    let request = multipart_request(
        "/upload",
        &[Part {
            name: "note",
            file_name: None,
            data: b"hello",
        }],
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No file part");
}

#[tokio::test]
async fn test_file_field_without_filename_is_not_a_file_part() {
    let app = app_with(None, None, Arc::new(StubSources::files(1)));

    let request = multipart_request(
        "/upload",
        &[Part {
            name: "file",
            file_name: None,
            data: b"not a file",
        }],
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No file part");
}

#[tokio::test]
async fn test_form_value_named_file_before_real_file_part() {
    let sources = Arc::new(StubSources::files(1));
    let app = app_with(
        Some(detector_returning(vec![plate_box()])),
        Some(reader_returning(&["MH12XY9876"])),
        sources.clone(),
    );

    let request = multipart_request(
        "/upload",
        &[
            Part {
                name: "file",
                file_name: None,
                data: b"caption",
            },
            Part {
                name: "file",
                file_name: Some("clip.mp4"),
                data: b"fake video",
            },
        ],
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["results"][0]["plate_number"], "MH12XY9876");
    assert_eq!(sources.opened_paths().len(), 1);
}

fn app_with_upload_limit(max_upload_bytes: usize) -> axum::Router {
    let mut config = ServiceConfig::default();
    config.server.max_upload_bytes = max_upload_bytes;
    create_app(state_with_config(
        config,
        Some(detector_returning(vec![])),
        Some(reader_returning(&[])),
        Arc::new(StubSources::files(1)),
    ))
}

#[tokio::test]
async fn test_file_just_under_upload_limit_accepted() {
    let app = app_with_upload_limit(1024);

    // The multipart body itself is larger than the limit
    let data = vec![7u8; 1024 - 10];
    let response = app
        .oneshot(upload_request("/upload", "clip.mp4", &data))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["results"], serde_json::json!([]));
}

#[tokio::test]
async fn test_file_at_upload_limit_accepted() {
    let app = app_with_upload_limit(1024);

    let data = vec![7u8; 1024];
    let response = app
        .oneshot(upload_request("/upload", "clip.mp4", &data))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_file_over_upload_limit_rejected() {
    let app = app_with_upload_limit(1024);

    let data = vec![7u8; 1025];
    let response = app
        .oneshot(upload_request("/upload", "clip.mp4", &data))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("1024 byte"));
}

#[tokio::test]
async fn test_empty_filename() {
    let app = app_with(None, None, Arc::new(StubSources::files(1)));

    let response = app
        .oneshot(upload_request("/upload", "", b""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No selected file");
}

#[tokio::test]
async fn test_non_multipart_body_rejected() {
    let app = app_with(None, None, Arc::new(StubSources::files(1)));

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file":"clip.mp4"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_results_one_record_per_plate_reading() {
    let sources = Arc::new(StubSources::files(3));
    let app = app_with(
        Some(detector_returning(vec![helmet_box(), plate_box(), plate_box()])),
        Some(reader_returning(&["KA01AB1234"])),
        sources.clone(),
    );

    let response = app
        .oneshot(upload_request("/upload", "dashcam.mp4", b"fake video"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let results = json["results"].as_array().unwrap();

    // 3 frames x 2 plate boxes x 1 reading
    assert_eq!(results.len(), 6);
    for record in results {
        assert_eq!(record["plate_number"], "KA01AB1234");
        assert_eq!(record["traffic_violation"], "");
    }
}

#[tokio::test]
async fn test_no_plates_gives_empty_results() {
    let app = app_with(
        Some(detector_returning(vec![])),
        Some(reader_returning(&[])),
        Arc::new(StubSources::files(4)),
    );

    let response = app
        .oneshot(upload_request("/upload", "empty_road.mp4", b"fake video"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "results": [] })
    );
}

#[tokio::test]
async fn test_missing_helmet_reported_per_plate() {
    let app = app_with(
        Some(detector_returning(vec![plate_box()])),
        Some(reader_returning(&["MH12", "DE1433"])),
        Arc::new(StubSources::files(1)),
    );

    let response = app
        .oneshot(upload_request("/upload", "rider.gif", b"fake"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["results"],
        serde_json::json!([
            { "plate_number": "MH12", "traffic_violation": "Helmet not worn" },
            { "plate_number": "DE1433", "traffic_violation": "Helmet not worn" }
        ])
    );
}

#[tokio::test]
async fn test_process_video_alias() {
    let app = app_with(
        Some(detector_returning(vec![helmet_box(), plate_box()])),
        Some(reader_returning(&["TN09"])),
        Arc::new(StubSources::files(2)),
    );

    let response = app
        .oneshot(upload_request("/process_video", "clip.avi", b"fake video"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_upload_is_temporary_and_keeps_only_extension() {
    let sources = Arc::new(StubSources::files(1));
    let app = app_with(
        Some(detector_returning(vec![])),
        Some(reader_returning(&[])),
        sources.clone(),
    );

    let response = app
        .oneshot(upload_request("/upload", "../../secret/Clip.MP4", b"fake"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let opened = sources.opened_paths();
    assert_eq!(opened.len(), 1);
    let path = &opened[0];
    assert_eq!(path.extension().unwrap(), "mp4");
    assert!(!path.to_string_lossy().contains("secret"));
    assert!(!path.exists(), "temporary upload must be removed");
}

#[tokio::test]
async fn test_models_missing_returns_503() {
    let app = app_with(None, None, Arc::new(StubSources::files(1)));

    let response = app
        .oneshot(upload_request("/upload", "clip.mp4", b"fake"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("not loaded"));
}

#[tokio::test]
async fn test_detector_failure_returns_500() {
    let mut detector = MockDetector::new();
    detector
        .expect_detect()
        .returning(|_| Err(anyhow::anyhow!("session crashed")));

    let app = app_with(
        Some(detector),
        Some(reader_returning(&[])),
        Arc::new(StubSources::files(2)),
    );

    let response = app
        .oneshot(upload_request("/upload", "clip.mp4", b"fake"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("session crashed"));
}

#[tokio::test]
async fn test_real_decoder_rejects_garbage() {
    use traffic_sentinel::source::ImageSequenceProvider;

    let state = state_with(
        Some(detector_returning(vec![])),
        Some(reader_returning(&[])),
        Arc::new(StubSources::default()),
    )
    .with_sources(Arc::new(ImageSequenceProvider));
    let app = create_app(state);

    let response = app
        .oneshot(upload_request("/upload", "clip.bin", b"definitely not media"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    let error = json["error"].as_str().unwrap();
    assert!(error.starts_with("Unsupported media format: .bin file"));
    assert!(error.contains("--features opencv"));
}
