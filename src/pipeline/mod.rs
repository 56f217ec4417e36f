// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame-by-frame violation pipeline
//!
//! For each frame: detect objects, read every license plate, gather frame
//! signals, evaluate the violation policy, and emit one record per plate
//! reading.

pub mod overlay;
#[cfg(feature = "opencv")]
pub mod recorder;
pub mod signals;
pub mod violation;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::FrameSource;
use crate::vision::{crop_region, ClassMap, DetectionClass, Detector, Frame, PlateReader};

pub use overlay::{FrameSink, Overlay, OverlayLine, TracingSink};
#[cfg(feature = "opencv")]
pub use recorder::VideoRecorderSink;
pub use signals::{NoSignals, SignalSource, SimulatedSignals};
pub use violation::{
    join_labels, ChecklistPolicy, FrameObservation, FrameSignals, Violation, ViolationPolicy,
};

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Detection failed on frame {frame}: {reason}")]
    Detection { frame: u64, reason: String },

    #[error("Plate reading failed on frame {frame}: {reason}")]
    PlateReading { frame: u64, reason: String },
}

/// One result entry: a plate and the violations of its frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub plate_number: String,
    /// Frame violation labels joined with ", "
    pub traffic_violation: String,
}

/// Outcome of processing a single frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub helmet_count: usize,
    /// Plate readings in detection order
    pub plates: Vec<String>,
    pub violations: Vec<Violation>,
}

impl FrameReport {
    /// One record per plate reading
    pub fn records(&self) -> Vec<ViolationRecord> {
        let traffic_violation = join_labels(&self.violations);
        self.plates
            .iter()
            .map(|plate| ViolationRecord {
                plate_number: plate.clone(),
                traffic_violation: traffic_violation.clone(),
            })
            .collect()
    }
}

/// Stop conditions and frame shaping for one run
#[derive(Debug, Clone, Default)]
pub struct RunLimits {
    /// Stop after this many processed frames
    pub max_frames: Option<u64>,
    /// Stop once this much wall time has passed
    pub max_duration: Option<Duration>,
    /// Resize every frame to `(width, height)` before processing
    pub resize: Option<(u32, u32)>,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfStream,
    ReadFailed,
    FrameLimit,
    TimeLimit,
    Cancelled,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Records in frame order, then plate order; never deduplicated
    pub records: Vec<ViolationRecord>,
    pub frames_processed: u64,
    pub stop_reason: StopReason,
}

/// The detector, plate reader and policy wired together
#[derive(Clone)]
pub struct Pipeline {
    detector: Arc<dyn Detector>,
    plate_reader: Arc<dyn PlateReader>,
    policy: Arc<dyn ViolationPolicy>,
    signals: Arc<dyn SignalSource>,
    classes: ClassMap,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("classes", &self.classes)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline with the checklist policy and no external signals
    pub fn new(detector: Arc<dyn Detector>, plate_reader: Arc<dyn PlateReader>) -> Self {
        Self {
            detector,
            plate_reader,
            policy: Arc::new(ChecklistPolicy::default()),
            signals: Arc::new(NoSignals),
            classes: ClassMap::default(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ViolationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_classes(mut self, classes: ClassMap) -> Self {
        self.classes = classes;
        self
    }

    /// Detect, read plates and evaluate violations for one frame
    pub fn process_frame(&self, frame: &Frame) -> Result<FrameReport, PipelineError> {
        let boxes = self
            .detector
            .detect(frame)
            .map_err(|e| PipelineError::Detection {
                frame: frame.index,
                reason: format!("{:#}", e),
            })?;

        let mut helmet_count = 0;
        let mut plates = Vec::new();

        for bbox in &boxes {
            match self.classes.classify(bbox.class_id) {
                DetectionClass::Helmet => helmet_count += 1,
                DetectionClass::LicensePlate => {
                    let Some(crop) =
                        crop_region(&frame.image, bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax)
                    else {
                        debug!("Frame {}: skipping degenerate plate box", frame.index);
                        continue;
                    };

                    let readings =
                        self.plate_reader
                            .read(&crop)
                            .map_err(|e| PipelineError::PlateReading {
                                frame: frame.index,
                                reason: format!("{:#}", e),
                            })?;

                    plates.extend(
                        readings
                            .into_iter()
                            .map(|r| r.trim().to_string())
                            .filter(|r| !r.is_empty()),
                    );
                }
                DetectionClass::Other => {}
            }
        }

        let signals = self.signals.next_signals(frame);
        let violations = self.policy.evaluate(&FrameObservation {
            helmet_count,
            plate_readings: &plates,
            signals,
        });

        debug!(
            "Frame {}: {} boxes, {} helmets, {} plates, {} violations",
            frame.index,
            boxes.len(),
            helmet_count,
            plates.len(),
            violations.len()
        );

        Ok(FrameReport {
            frame_index: frame.index,
            helmet_count,
            plates,
            violations,
        })
    }

    /// Process frames until the source ends or a stop condition hits
    ///
    /// A failed read ends the run like end of stream. `stop` is checked
    /// before every frame. When a sink is given, every processed frame is
    /// presented to it with its overlay; sink failures are logged and
    /// otherwise ignored.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        limits: &RunLimits,
        stop: &CancellationToken,
        mut sink: Option<&mut dyn FrameSink>,
    ) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let mut records = Vec::new();
        let mut frames_processed = 0u64;

        let stop_reason = loop {
            if stop.is_cancelled() {
                break StopReason::Cancelled;
            }
            if limits.max_frames.is_some_and(|max| frames_processed >= max) {
                break StopReason::FrameLimit;
            }
            if limits
                .max_duration
                .is_some_and(|max| started.elapsed() >= max)
            {
                break StopReason::TimeLimit;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    warn!("Frame read failed, ending run: {}", e);
                    break StopReason::ReadFailed;
                }
            };

            let frame = match limits.resize {
                Some((width, height)) => frame.resized(width, height),
                None => frame,
            };

            let report = self.process_frame(&frame)?;
            records.extend(report.records());
            frames_processed += 1;

            if let Some(sink) = sink.as_deref_mut() {
                if let Err(e) = sink.present(&frame, &Overlay::for_report(&report)) {
                    warn!("Frame sink failed on frame {}: {:#}", frame.index, e);
                }
            }
        };

        if let Some(sink) = sink.as_deref_mut() {
            if let Err(e) = sink.finish() {
                warn!("Frame sink failed to finish: {:#}", e);
            }
        }

        info!(
            "Run finished ({:?}): {} frames, {} records in {:.1?}",
            stop_reason,
            frames_processed,
            records.len(),
            started.elapsed()
        );

        Ok(RunSummary {
            records,
            frames_processed,
            stop_reason,
        })
    }
}
