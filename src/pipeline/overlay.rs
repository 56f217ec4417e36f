// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-frame text overlay for the realtime stream and where it goes

use tracing::debug;

use super::violation::{join_labels, Violation};
use super::FrameReport;
use crate::vision::Frame;

pub const PLATE_COLOR: [u8; 3] = [0, 255, 0];
pub const VIOLATION_COLOR: [u8; 3] = [255, 0, 0];

/// Vertical distance between overlay lines, in pixels
const LINE_SPACING: i32 = 30;

/// One line of text drawn at `origin` (left, baseline) in RGB `color`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLine {
    pub text: String,
    pub origin: (i32, i32),
    pub color: [u8; 3],
}

/// Text annotations for one frame: plate lines, then a violations line
/// when the frame has any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub lines: Vec<OverlayLine>,
}

impl Overlay {
    pub fn new(plates: &[String], violations: &[Violation]) -> Self {
        let mut lines: Vec<OverlayLine> = plates
            .iter()
            .enumerate()
            .map(|(i, plate)| OverlayLine {
                text: format!("Plate: {}", plate),
                origin: (10, LINE_SPACING * (i as i32 + 1)),
                color: PLATE_COLOR,
            })
            .collect();

        if !violations.is_empty() {
            let violations_row = plates.len().max(1) as i32 + 1;
            lines.push(OverlayLine {
                text: format!("Violations: {}", join_labels(violations)),
                origin: (10, LINE_SPACING * violations_row),
                color: VIOLATION_COLOR,
            });
        }

        Self { lines }
    }

    pub fn for_report(report: &FrameReport) -> Self {
        Self::new(&report.plates, &report.violations)
    }
}

/// Receives each realtime frame together with its overlay
pub trait FrameSink: Send {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> anyhow::Result<()>;

    /// Flush and release; called once after the last frame
    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Logs overlay text instead of drawing it
#[derive(Debug, Default)]
pub struct TracingSink;

impl FrameSink for TracingSink {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> anyhow::Result<()> {
        for line in &overlay.lines {
            debug!("Frame {}: {}", frame.index, line.text);
        }
        Ok(())
    }
}
