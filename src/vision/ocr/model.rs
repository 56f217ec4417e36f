// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR plate reader combining text detection and recognition

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::detection::TextDetectionModel;
use super::recognition::TextRecognitionModel;
use super::PlateReader;
use crate::vision::image_utils::crop_region;

/// File locations of the OCR models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrModelPaths {
    /// Text detection model; when absent the whole crop is one line
    pub detection: Option<PathBuf>,
    pub recognition: PathBuf,
    pub dictionary: PathBuf,
}

impl OcrModelPaths {
    /// Standard PaddleOCR file names inside `model_dir`
    ///
    /// Expected files:
    /// - det_model.onnx (text detection, optional)
    /// - rec_model.onnx (text recognition)
    /// - ppocr_keys_v1.txt (character dictionary)
    pub fn from_dir<P: AsRef<Path>>(model_dir: P) -> Self {
        let dir = model_dir.as_ref();
        let detection = dir.join("det_model.onnx");
        Self {
            detection: detection.exists().then_some(detection),
            recognition: dir.join("rec_model.onnx"),
            dictionary: dir.join("ppocr_keys_v1.txt"),
        }
    }
}

/// PaddleOCR model for reading license plates
///
/// Runs on CPU only.
#[derive(Debug, Clone)]
pub struct PaddleOcrModel {
    detector: Option<TextDetectionModel>,
    recognizer: TextRecognitionModel,
    /// Readings below this confidence are discarded
    min_confidence: f32,
}

impl PaddleOcrModel {
    /// Load the OCR models
    pub async fn new(paths: &OcrModelPaths, min_confidence: f32) -> Result<Self> {
        let detector = match &paths.detection {
            Some(path) => Some(TextDetectionModel::new(path).await?),
            None => None,
        };
        let recognizer = TextRecognitionModel::new(&paths.recognition, &paths.dictionary).await?;

        info!(
            "PaddleOCR plate reader ready (text detection: {})",
            if detector.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            detector,
            recognizer,
            min_confidence: min_confidence.clamp(0.0, 1.0),
        })
    }

    /// Split a plate crop into text lines
    fn text_lines(&self, crop: &RgbImage) -> Result<Vec<RgbImage>> {
        let Some(detector) = &self.detector else {
            return Ok(vec![crop.clone()]);
        };

        let lines: Vec<RgbImage> = detector
            .detect(crop)?
            .iter()
            .filter_map(|b| crop_region(crop, b.x, b.y, b.x + b.width, b.y + b.height))
            .collect();

        // A crop the detector finds nothing in may still be one tight line
        if lines.is_empty() {
            Ok(vec![crop.clone()])
        } else {
            Ok(lines)
        }
    }
}

impl PlateReader for PaddleOcrModel {
    fn read(&self, crop: &RgbImage) -> Result<Vec<String>> {
        let mut readings = Vec::new();

        for line in self.text_lines(crop)? {
            let recognized = self.recognizer.recognize(&line)?;
            if recognized.is_empty() || recognized.confidence < self.min_confidence {
                debug!(
                    "Dropping reading '{}' (confidence {:.3})",
                    recognized.text, recognized.confidence
                );
                continue;
            }
            readings.push(recognized.text.trim().to_string());
        }

        Ok(readings)
    }
}
