// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading the detector and plate reader

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::vision::detection::{Detector, YoloDetector, YoloParams};
use crate::vision::ocr::{OcrModelPaths, PaddleOcrModel, PlateReader};

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Path to the YOLO detection model (optional)
    pub detector_model: Option<PathBuf>,
    pub detector_params: YoloParams,
    /// OCR model files (optional)
    pub ocr_models: Option<OcrModelPaths>,
    /// Plate readings below this confidence are dropped
    pub ocr_min_confidence: f32,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            detector_model: Some(PathBuf::from("./models/yolov5s.onnx")),
            detector_params: YoloParams::default(),
            ocr_models: Some(OcrModelPaths::from_dir("./models/paddleocr-onnx")),
            ocr_min_confidence: 0.5,
        }
    }
}

/// Information about a loaded vision model
#[derive(Debug, Clone, Serialize)]
pub struct VisionModelInfo {
    /// Model name
    pub name: String,
    /// Model type (detection, ocr)
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Owner of the detector and plate reader shared by all requests
///
/// Missing or broken model files are logged and leave the slot empty; the
/// server still starts.
#[derive(Clone, Default)]
pub struct VisionModelManager {
    detector: Option<Arc<dyn Detector>>,
    plate_reader: Option<Arc<dyn PlateReader>>,
}

impl std::fmt::Debug for VisionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionModelManager")
            .field("detector", &self.detector.is_some())
            .field("plate_reader", &self.plate_reader.is_some())
            .finish()
    }
}

impl VisionModelManager {
    /// Load models from the given configuration
    pub async fn new(config: VisionModelConfig) -> Self {
        let detector: Option<Arc<dyn Detector>> = match config.detector_model {
            Some(ref path) => match YoloDetector::new(path, config.detector_params.clone()).await {
                Ok(model) => {
                    tracing::info!("Detection model loaded from {}", path.display());
                    Some(Arc::new(model))
                }
                Err(e) => {
                    tracing::warn!("Failed to load detection model from {}: {:#}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        let plate_reader: Option<Arc<dyn PlateReader>> = match config.ocr_models {
            Some(ref paths) => match PaddleOcrModel::new(paths, config.ocr_min_confidence).await {
                Ok(model) => {
                    tracing::info!("PaddleOCR model loaded from {}", paths.recognition.display());
                    Some(Arc::new(model))
                }
                Err(e) => {
                    tracing::warn!("Failed to load OCR model: {:#}", e);
                    None
                }
            },
            None => None,
        };

        Self {
            detector,
            plate_reader,
        }
    }

    /// Build a manager around already constructed models
    pub fn from_parts(
        detector: Option<Arc<dyn Detector>>,
        plate_reader: Option<Arc<dyn PlateReader>>,
    ) -> Self {
        Self {
            detector,
            plate_reader,
        }
    }

    pub fn detector(&self) -> Option<Arc<dyn Detector>> {
        self.detector.clone()
    }

    pub fn plate_reader(&self) -> Option<Arc<dyn PlateReader>> {
        self.plate_reader.clone()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn has_plate_reader(&self) -> bool {
        self.plate_reader.is_some()
    }

    /// List all vision models and whether they loaded
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            VisionModelInfo {
                name: "yolov5".to_string(),
                model_type: "detection".to_string(),
                available: self.has_detector(),
            },
            VisionModelInfo {
                name: "paddleocr".to_string(),
                model_type: "ocr".to_string(),
                available: self.has_plate_reader(),
            },
        ]
    }
}
