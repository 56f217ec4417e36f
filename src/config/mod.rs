// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Layered as defaults, then an optional TOML file, then `SENTINEL_*`
//! environment variables, then command-line flags.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::ChecklistPolicy;
use crate::vision::{ClassMap, OcrModelPaths, VisionModelConfig, YoloParams};

/// Prefix of every environment variable the service reads
pub const ENV_PREFIX: &str = "SENTINEL_";

/// Upload and request body limit (100 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub detector: DetectorConfig,
    pub ocr: OcrConfig,
    pub policy: PolicyConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Model file locations; `None` disables the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub detector_path: Option<PathBuf>,
    /// Directory holding the PaddleOCR ONNX files and dictionary
    pub ocr_dir: Option<PathBuf>,
    /// Use the text detection model when present in `ocr_dir`
    pub ocr_text_detection: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            detector_path: Some(PathBuf::from("models/yolov5s.onnx")),
            ocr_dir: Some(PathBuf::from("models/paddleocr-onnx")),
            ocr_text_detection: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub intra_threads: usize,
    pub helmet_class_id: usize,
    pub plate_class_id: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let params = YoloParams::default();
        let classes = ClassMap::default();
        Self {
            input_size: params.input_size,
            conf_threshold: params.conf_threshold,
            iou_threshold: params.iou_threshold,
            max_detections: params.max_detections,
            intra_threads: params.intra_threads,
            helmet_class_id: classes.helmet,
            plate_class_id: classes.license_plate,
        }
    }
}

impl DetectorConfig {
    pub fn params(&self) -> YoloParams {
        YoloParams {
            input_size: self.input_size,
            conf_threshold: self.conf_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
            intra_threads: self.intra_threads,
        }
    }

    pub fn class_map(&self) -> ClassMap {
        ClassMap {
            helmet: self.helmet_class_id,
            license_plate: self.plate_class_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Readings below this confidence are dropped
    pub min_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub speed_limit_kmh: f32,
    /// Replace missing sensors with random signals (demo only)
    pub simulate_signals: bool,
    /// Seed for simulated signals
    pub seed: Option<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            speed_limit_kmh: ChecklistPolicy::default().speed_limit_kmh,
            simulate_signals: false,
            seed: None,
        }
    }
}

impl PolicyConfig {
    pub fn checklist(&self) -> ChecklistPolicy {
        ChecklistPolicy {
            speed_limit_kmh: self.speed_limit_kmh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub camera_index: u32,
    /// Default frame cap when the request gives none
    pub max_frames: Option<u64>,
    /// Default time cap when the request gives none
    pub duration_secs: Option<u64>,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Record annotated frames here (needs the `opencv` feature)
    pub record_path: Option<PathBuf>,
    pub record_fps: f64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            max_frames: Some(900),
            duration_secs: Some(60),
            frame_width: crate::vision::frame::REALTIME_FRAME_WIDTH,
            frame_height: crate::vision::frame::REALTIME_FRAME_HEIGHT,
            record_path: None,
            record_fps: 20.0,
        }
    }
}

impl RealtimeConfig {
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }
}

impl ServiceConfig {
    /// Parse a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from `SENTINEL_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| env::var(key).ok());
    }

    /// Override fields from any key/value lookup
    ///
    /// Unparseable values are ignored. An empty path variable disables
    /// that model.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let path = |name: &str| var(name).map(|v| (!v.is_empty()).then(|| PathBuf::from(v)));

        if let Some(v) = var("HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("PORT").and_then(parse_value) {
            self.server.port = v;
        }
        if let Some(v) = var("MAX_UPLOAD_BYTES").and_then(parse_value) {
            self.server.max_upload_bytes = v;
        }

        if let Some(v) = path("DETECTOR_MODEL") {
            self.models.detector_path = v;
        }
        if let Some(v) = path("OCR_MODEL_DIR") {
            self.models.ocr_dir = v;
        }
        if let Some(v) = var("OCR_TEXT_DETECTION") {
            self.models.ocr_text_detection = parse_flag(&v);
        }

        if let Some(v) = var("INPUT_SIZE").and_then(parse_value) {
            self.detector.input_size = v;
        }
        if let Some(v) = var("CONF_THRESHOLD").and_then(parse_value) {
            self.detector.conf_threshold = v;
        }
        if let Some(v) = var("IOU_THRESHOLD").and_then(parse_value) {
            self.detector.iou_threshold = v;
        }
        if let Some(v) = var("HELMET_CLASS_ID").and_then(parse_value) {
            self.detector.helmet_class_id = v;
        }
        if let Some(v) = var("PLATE_CLASS_ID").and_then(parse_value) {
            self.detector.plate_class_id = v;
        }

        if let Some(v) = var("OCR_MIN_CONFIDENCE").and_then(parse_value) {
            self.ocr.min_confidence = v;
        }

        if let Some(v) = var("SPEED_LIMIT_KMH").and_then(parse_value) {
            self.policy.speed_limit_kmh = v;
        }
        if let Some(v) = var("SIMULATE_SIGNALS") {
            self.policy.simulate_signals = parse_flag(&v);
        }
        if let Some(v) = var("SIGNAL_SEED").and_then(parse_value) {
            self.policy.seed = Some(v);
        }

        if let Some(v) = var("CAMERA_INDEX").and_then(parse_value) {
            self.realtime.camera_index = v;
        }
        if let Some(v) = var("REALTIME_MAX_FRAMES").and_then(parse_value) {
            self.realtime.max_frames = Some(v);
        }
        if let Some(v) = var("REALTIME_DURATION_SECS").and_then(parse_value) {
            self.realtime.duration_secs = Some(v);
        }
        if let Some(v) = path("RECORD_PATH") {
            self.realtime.record_path = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.server.max_upload_bytes == 0 {
            return invalid("max_upload_bytes must be greater than 0".to_string());
        }
        if self.detector.input_size == 0 || self.detector.input_size % 32 != 0 {
            return invalid(format!(
                "detector input_size must be a positive multiple of 32, got {}",
                self.detector.input_size
            ));
        }
        for (name, value) in [
            ("conf_threshold", self.detector.conf_threshold),
            ("iou_threshold", self.detector.iou_threshold),
            ("ocr min_confidence", self.ocr.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{} must be within 0.0-1.0, got {}", name, value));
            }
        }
        if self.detector.max_detections == 0 {
            return invalid("max_detections must be greater than 0".to_string());
        }
        if self.detector.helmet_class_id == self.detector.plate_class_id {
            return invalid(format!(
                "helmet and plate class ids must differ (both {})",
                self.detector.plate_class_id
            ));
        }
        if !(self.policy.speed_limit_kmh > 0.0) {
            return invalid("speed_limit_kmh must be positive".to_string());
        }
        if self.realtime.max_frames == Some(0) {
            return invalid("realtime max_frames must be greater than 0".to_string());
        }
        if self.realtime.duration_secs == Some(0) {
            return invalid("realtime duration_secs must be greater than 0".to_string());
        }
        if self.realtime.frame_width == 0 || self.realtime.frame_height == 0 {
            return invalid("realtime frame size must be non-zero".to_string());
        }
        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Model loading settings derived from this configuration
    pub fn vision_model_config(&self) -> VisionModelConfig {
        let ocr_models = self.models.ocr_dir.as_ref().map(|dir| {
            let mut paths = OcrModelPaths::from_dir(dir);
            if !self.models.ocr_text_detection {
                paths.detection = None;
            }
            paths
        });

        VisionModelConfig {
            detector_model: self.models.detector_path.clone(),
            detector_params: self.detector.params(),
            ocr_models,
            ocr_min_confidence: self.ocr.min_confidence,
        }
    }
}

fn parse_value<T: FromStr>(value: String) -> Option<T> {
    value.trim().parse().ok()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
