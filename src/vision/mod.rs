// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for traffic frames
//!
//! This module provides:
//! - Object detection (helmets, license plates) via a YOLO ONNX model
//! - License plate reading via PaddleOCR ONNX models
//!
//! Both run on CPU through ONNX Runtime.

pub mod detection;
pub mod frame;
pub mod image_utils;
pub mod model_manager;
pub mod ocr;
pub mod preprocessing;

pub use detection::{ClassMap, DetectionBox, DetectionClass, Detector, YoloDetector, YoloParams};
pub use frame::Frame;
pub use image_utils::{crop_region, decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use model_manager::{VisionModelConfig, VisionModelInfo, VisionModelManager};
pub use ocr::{OcrModelPaths, PaddleOcrModel, PlateReader};
