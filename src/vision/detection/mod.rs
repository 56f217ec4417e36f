// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection for traffic frames
//!
//! Components:
//! - `Detector` - the seam the pipeline calls per frame
//! - `yolo` - YOLOv5-layout ONNX model behind that seam
//! - `nms` - non-max suppression over raw model boxes

pub mod nms;
pub mod yolo;

use serde::{Deserialize, Serialize};

use crate::vision::Frame;

pub use nms::non_max_suppression;
pub use yolo::{YoloDetector, YoloParams};

/// Axis-aligned detection box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    /// Model class id
    pub class_id: usize,
    /// Detection confidence score (0.0-1.0)
    pub confidence: f32,
}

impl DetectionBox {
    pub fn width(&self) -> f32 {
        (self.xmax - self.xmin).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.ymax - self.ymin).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &DetectionBox) -> f32 {
        let ix = (self.xmax.min(other.xmax) - self.xmin.max(other.xmin)).max(0.0);
        let iy = (self.ymax.min(other.ymax) - self.ymin.max(other.ymin)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// What a detection means to the violation checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionClass {
    Helmet,
    LicensePlate,
    Other,
}

/// Model class ids for the classes the pipeline cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMap {
    pub helmet: usize,
    pub license_plate: usize,
}

impl Default for ClassMap {
    fn default() -> Self {
        Self {
            helmet: 0,
            license_plate: 1,
        }
    }
}

impl ClassMap {
    pub fn classify(&self, class_id: usize) -> DetectionClass {
        if class_id == self.helmet {
            DetectionClass::Helmet
        } else if class_id == self.license_plate {
            DetectionClass::LicensePlate
        } else {
            DetectionClass::Other
        }
    }
}

/// Object detector invoked once per frame
///
/// Implementations may hold model state internally but must be usable from
/// several requests at once.
#[cfg_attr(test, mockall::automock)]
pub trait Detector: Send + Sync {
    /// Detect objects in one frame; zero or more boxes
    fn detect(&self, frame: &Frame) -> anyhow::Result<Vec<DetectionBox>>;
}
