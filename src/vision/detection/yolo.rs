// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv5 object detection model
//!
//! Expects an ONNX export with a single `[1, 3, S, S]` input and a
//! `[1, N, 5 + classes]` output laid out as
//! `cx, cy, w, h, objectness, class scores...` in input pixel space.

use anyhow::{Context, Result};
use image::Rgb;
use ndarray::{Array4, ArrayViewD, Axis, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{non_max_suppression, DetectionBox, Detector};
use crate::vision::preprocessing::{resize_with_padding, to_nchw_tensor, PreprocessInfo};
use crate::vision::Frame;

/// Letterbox padding color used by YOLOv5
const LETTERBOX_COLOR: Rgb<u8> = Rgb([114, 114, 114]);

/// Inference and post-processing parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct YoloParams {
    /// Square model input size (640 typical)
    pub input_size: u32,
    /// Minimum objectness x class score
    pub conf_threshold: f32,
    /// IoU above which same-class boxes are suppressed
    pub iou_threshold: f32,
    /// Upper bound on boxes returned per frame
    pub max_detections: usize,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 1000,
            intra_threads: 4,
        }
    }
}

/// YOLO detector running on ONNX Runtime (CPU)
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    params: YoloParams,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(model_path: P, params: YoloParams) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(params.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detection model input: {} {:?}", input.name, input.input_type);
        }

        info!("Detection model loaded (input size {})", params.input_size);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            params,
        })
    }

    /// Letterbox a frame into the model's input tensor
    fn preprocess(&self, frame: &Frame) -> (Array4<f32>, PreprocessInfo) {
        let size = self.params.input_size;
        let info = PreprocessInfo::new(&frame.image, size);
        let letterboxed = resize_with_padding(&frame.image, size, LETTERBOX_COLOR);
        let tensor = to_nchw_tensor(&letterboxed, |_, v| v as f32 / 255.0);
        (tensor, info)
    }
}

impl Detector for YoloDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<DetectionBox>> {
        let (input, info) = self.preprocess(frame);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Detection session lock poisoned"))?;

        let input_value =
            Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let boxes = decode_predictions(output_tensor.view(), &info, &self.params)?;
        debug!("Frame {}: {} detections", frame.index, boxes.len());
        Ok(boxes)
    }
}

/// Turn raw `[1, N, 5 + classes]` predictions into frame-space boxes
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    info: &PreprocessInfo,
    params: &YoloParams,
) -> Result<Vec<DetectionBox>> {
    let shape = output.shape().to_vec();
    let output = match shape.as_slice() {
        [1, _, cols] if *cols > 5 => output
            .into_dimensionality::<Ix3>()
            .context("Detection output is not 3-dimensional")?,
        _ => anyhow::bail!("Unexpected detection output shape: {:?}", shape),
    };
    let rows = output.index_axis(Axis(0), 0);

    let max_x = info.original_width as f32;
    let max_y = info.original_height as f32;
    let mut candidates = Vec::new();

    for row in rows.outer_iter() {
        let objectness = row[4];
        if objectness < params.conf_threshold {
            continue;
        }

        let (class_id, class_score) = row
            .iter()
            .skip(5)
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, &s)| if s > best.1 { (i, s) } else { best });

        let confidence = objectness * class_score;
        if confidence < params.conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let (xmin, ymin) = info.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (xmax, ymax) = info.map_to_original(cx + w / 2.0, cy + h / 2.0);

        candidates.push(DetectionBox {
            xmin: xmin.clamp(0.0, max_x),
            ymin: ymin.clamp(0.0, max_y),
            xmax: xmax.clamp(0.0, max_x),
            ymax: ymax.clamp(0.0, max_y),
            class_id,
            confidence,
        });
    }

    Ok(non_max_suppression(
        candidates,
        params.iou_threshold,
        params.max_detections,
    ))
}
