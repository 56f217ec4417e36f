// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers for the HTTP endpoint tests

use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::Response,
    Router,
};
use image::RgbImage;
use mockall::mock;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use traffic_sentinel::{
    api::create_app,
    source::{FrameSource, SourceError, SourceProvider, VecSource},
    vision::{DetectionBox, Detector, Frame, PlateReader, VisionModelManager},
    AppState, ServiceConfig,
};

pub const BOUNDARY: &str = "sentinel-test-boundary";

mock! {
    pub Detector {}
    impl Detector for Detector {
        fn detect(&self, frame: &Frame) -> anyhow::Result<Vec<DetectionBox>>;
    }
}

mock! {
    pub PlateReader {}
    impl PlateReader for PlateReader {
        fn read(&self, crop: &RgbImage) -> anyhow::Result<Vec<String>>;
    }
}

/// Frame source stand-in: fixed-size files and an optional camera
#[derive(Debug, Default)]
pub struct StubSources {
    /// Frames decoded from every uploaded file
    pub file_frames: usize,
    /// Frames the camera yields before ending; `None` means no camera
    pub camera_frames: Option<usize>,
    /// Paths passed to `open_file`
    pub opened: Mutex<Vec<PathBuf>>,
}

impl StubSources {
    pub fn files(frames: usize) -> Self {
        Self {
            file_frames: frames,
            ..Default::default()
        }
    }

    pub fn camera(frames: usize) -> Self {
        Self {
            camera_frames: Some(frames),
            ..Default::default()
        }
    }

    pub fn opened_paths(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

fn blank_frames(n: usize) -> Box<dyn FrameSource> {
    Box::new(VecSource::new((0..n).map(|_| RgbImage::new(64, 48)).collect()))
}

impl SourceProvider for StubSources {
    fn open_file(&self, path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
        assert!(path.exists(), "upload must be on disk while decoding");
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(blank_frames(self.file_frames))
    }

    fn open_camera(&self, index: u32) -> Result<Box<dyn FrameSource>, SourceError> {
        match self.camera_frames {
            Some(n) => Ok(blank_frames(n)),
            None => Err(SourceError::CameraUnavailable(index)),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub fn plate_box() -> DetectionBox {
    DetectionBox {
        xmin: 10.0,
        ymin: 10.0,
        xmax: 50.0,
        ymax: 30.0,
        class_id: 1,
        confidence: 0.9,
    }
}

pub fn helmet_box() -> DetectionBox {
    DetectionBox {
        class_id: 0,
        ..plate_box()
    }
}

/// Detector returning the same boxes for every frame
pub fn detector_returning(boxes: Vec<DetectionBox>) -> MockDetector {
    let mut detector = MockDetector::new();
    detector
        .expect_detect()
        .returning(move |_| Ok(boxes.clone()));
    detector
}

/// Plate reader returning the same readings for every crop
pub fn reader_returning(readings: &[&str]) -> MockPlateReader {
    let readings: Vec<String> = readings.iter().map(|s| s.to_string()).collect();
    let mut reader = MockPlateReader::new();
    reader
        .expect_read()
        .returning(move |_| Ok(readings.clone()));
    reader
}

pub fn state_with(
    detector: Option<MockDetector>,
    reader: Option<MockPlateReader>,
    sources: Arc<StubSources>,
) -> AppState {
    state_with_config(ServiceConfig::default(), detector, reader, sources)
}

pub fn state_with_config(
    config: ServiceConfig,
    detector: Option<MockDetector>,
    reader: Option<MockPlateReader>,
    sources: Arc<StubSources>,
) -> AppState {
    let models = VisionModelManager::from_parts(
        detector.map(|d| Arc::new(d) as Arc<dyn Detector>),
        reader.map(|r| Arc::new(r) as Arc<dyn PlateReader>),
    );
    AppState::new(config, models).with_sources(sources)
}

pub fn app_with(
    detector: Option<MockDetector>,
    reader: Option<MockPlateReader>,
    sources: Arc<StubSources>,
) -> Router {
    create_app(state_with(detector, reader, sources))
}

/// One multipart part: field name, optional filename, contents
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Request with a single `file` part
pub fn upload_request(uri: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    multipart_request(
        uri,
        &[Part {
            name: "file",
            file_name: Some(file_name),
            data,
        }],
    )
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
