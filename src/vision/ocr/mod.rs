// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! License plate reading with PaddleOCR ONNX models
//!
//! Components:
//! - `detection` - Text line detection inside a plate crop
//! - `recognition` - CTC text recognition of one line
//! - `preprocessing` - Crop preprocessing for both models
//! - `model` - Combined plate reader

pub mod detection;
pub mod model;
pub mod preprocessing;
pub mod recognition;

use image::RgbImage;

pub use detection::{TextBox, TextDetectionModel};
pub use model::{OcrModelPaths, PaddleOcrModel};
pub use recognition::{RecognizedText, TextRecognitionModel};

/// Text reader for cropped license-plate regions
#[cfg_attr(test, mockall::automock)]
pub trait PlateReader: Send + Sync {
    /// Read a crop; zero or more non-empty strings
    fn read(&self, crop: &RgbImage) -> anyhow::Result<Vec<String>>;
}
