// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text detection model
//!
//! Locates text lines inside a license-plate crop. The model outputs a
//! per-pixel text probability map; connected regions above the threshold
//! become text boxes.

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{ArrayView2, Axis, Ix4};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_detection, DET_INPUT_SIZE};

/// Regions with fewer pixels are noise
const MIN_REGION_PIXELS: usize = 10;

/// A detected text box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    /// X coordinate of top-left corner
    pub x: f32,
    /// Y coordinate of top-left corner
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Mean probability over the region (0.0-1.0)
    pub confidence: f32,
}

impl TextBox {
    /// Check if this text box is valid (reasonable dimensions)
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.confidence > 0.0
    }
}

/// PaddleOCR text detection model (CPU)
#[derive(Clone)]
pub struct TextDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Probability threshold for text pixels
    confidence_threshold: f32,
}

impl std::fmt::Debug for TextDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDetectionModel")
            .field("input_name", &self.input_name)
            .field("confidence_threshold", &self.confidence_threshold)
            .finish_non_exhaustive()
    }
}

impl TextDetectionModel {
    /// Load the text detection model from a file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR detection model not found: {}", model_path.display());
        }

        info!("Loading OCR detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(2)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load OCR detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("OCR detection model input: {}", input_name);
        info!("OCR detection model loaded");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            confidence_threshold: 0.3,
        })
    }

    /// Find text lines in a crop
    ///
    /// Returned boxes are in the crop's own pixel coordinates, ordered top
    /// to bottom then left to right.
    pub fn detect(&self, crop: &RgbImage) -> Result<Vec<TextBox>> {
        let (input, info) = preprocess_for_detection(crop);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR detection session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("OCR detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // Expected [1, 1, H, W]
        let prob_map = output_tensor
            .view()
            .into_dimensionality::<Ix4>()
            .context("Unexpected OCR detection output rank")?;
        let prob_map = prob_map.index_axis(Axis(0), 0);
        let prob_map = prob_map.index_axis(Axis(0), 0);

        let (map_h, map_w) = prob_map.dim();
        let scale_x = DET_INPUT_SIZE as f32 / map_w.max(1) as f32;
        let scale_y = DET_INPUT_SIZE as f32 / map_h.max(1) as f32;

        let (crop_w, crop_h) = crop.dimensions();
        let boxes: Vec<TextBox> = extract_text_boxes(prob_map, self.confidence_threshold)
            .into_iter()
            .filter_map(|b| {
                let (x0, y0) = info.map_to_original(b.x * scale_x, b.y * scale_y);
                let (x1, y1) = info.map_to_original(
                    (b.x + b.width) * scale_x,
                    (b.y + b.height) * scale_y,
                );
                let x0 = x0.clamp(0.0, crop_w as f32);
                let y0 = y0.clamp(0.0, crop_h as f32);
                let mapped = TextBox {
                    x: x0,
                    y: y0,
                    width: x1.clamp(0.0, crop_w as f32) - x0,
                    height: y1.clamp(0.0, crop_h as f32) - y0,
                    confidence: b.confidence,
                };
                mapped.is_valid().then_some(mapped)
            })
            .collect();

        debug!("Detected {} text regions", boxes.len());
        Ok(boxes)
    }
}

/// Group probability-map pixels above `threshold` into 4-connected regions
///
/// Boxes are in probability-map coordinates, sorted by reading order.
pub fn extract_text_boxes(prob_map: ArrayView2<f32>, threshold: f32) -> Vec<TextBox> {
    let (height, width) = prob_map.dim();
    let mut visited = vec![vec![false; width]; height];
    let mut boxes = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y][x] || prob_map[[y, x]] < threshold {
                continue;
            }

            let region = flood_fill(&prob_map, &mut visited, x, y, threshold);
            if region.count >= MIN_REGION_PIXELS {
                boxes.push(TextBox {
                    x: region.min_x as f32,
                    y: region.min_y as f32,
                    width: (region.max_x - region.min_x + 1) as f32,
                    height: (region.max_y - region.min_y + 1) as f32,
                    confidence: region.sum / region.count as f32,
                });
            }
        }
    }

    boxes.sort_by(|a, b| match a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal),
        other => other,
    });

    boxes
}

struct Region {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
    count: usize,
    sum: f32,
}

fn flood_fill(
    prob_map: &ArrayView2<f32>,
    visited: &mut [Vec<bool>],
    start_x: usize,
    start_y: usize,
    threshold: f32,
) -> Region {
    let (height, width) = prob_map.dim();
    let mut stack = vec![(start_x, start_y)];
    let mut region = Region {
        min_x: start_x,
        max_x: start_x,
        min_y: start_y,
        max_y: start_y,
        count: 0,
        sum: 0.0,
    };

    while let Some((x, y)) = stack.pop() {
        if visited[y][x] {
            continue;
        }
        let prob = prob_map[[y, x]];
        if prob < threshold {
            continue;
        }

        visited[y][x] = true;
        region.count += 1;
        region.sum += prob;
        region.min_x = region.min_x.min(x);
        region.max_x = region.max_x.max(x);
        region.min_y = region.min_y.min(y);
        region.max_y = region.max_y.max(y);

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    const DETECTION_MODEL_PATH: &str = "models/paddleocr-onnx/det_model.onnx";

    fn fill(map: &mut Array2<f32>, x0: usize, y0: usize, x1: usize, y1: usize, v: f32) {
        for y in y0..y1 {
            for x in x0..x1 {
                map[[y, x]] = v;
            }
        }
    }

    #[test]
    fn test_text_box_validity() {
        let valid = TextBox {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 50.0,
            confidence: 0.95,
        };
        assert!(valid.is_valid());

        let invalid = TextBox { width: 0.0, ..valid };
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_extract_single_region() {
        let mut map = Array2::<f32>::zeros((20, 40));
        fill(&mut map, 5, 4, 25, 10, 0.8);

        let boxes = extract_text_boxes(map.view(), 0.3);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].x, 5.0);
        assert_eq!(boxes[0].y, 4.0);
        assert_eq!(boxes[0].width, 20.0);
        assert_eq!(boxes[0].height, 6.0);
        assert!((boxes[0].confidence - 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_extract_reading_order() {
        let mut map = Array2::<f32>::zeros((30, 40));
        fill(&mut map, 20, 2, 35, 8, 0.9);
        fill(&mut map, 2, 2, 15, 8, 0.9);
        fill(&mut map, 2, 18, 30, 25, 0.9);

        let boxes = extract_text_boxes(map.view(), 0.3);
        let origins: Vec<(f32, f32)> = boxes.iter().map(|b| (b.x, b.y)).collect();
        assert_eq!(origins, vec![(2.0, 2.0), (20.0, 2.0), (2.0, 18.0)]);
    }

    #[test]
    fn test_extract_ignores_noise() {
        let mut map = Array2::<f32>::zeros((20, 20));
        fill(&mut map, 3, 3, 5, 5, 0.9);
        fill(&mut map, 10, 10, 20, 12, 0.1);
        assert!(extract_text_boxes(map.view(), 0.3).is_empty());
    }

    #[tokio::test]
    async fn test_model_not_found_error() {
        let err = TextDetectionModel::new("/nonexistent/path/det_model.onnx")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_detection_on_blank_crop() {
        let model = match TextDetectionModel::new(DETECTION_MODEL_PATH).await {
            Ok(m) => m,
            Err(_) => return,
        };
        let boxes = model.detect(&RgbImage::new(200, 60)).unwrap();
        assert!(boxes.iter().all(|b| b.confidence < 0.5));
    }
}
